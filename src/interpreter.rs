//! Tree‑walking evaluator.
//!
//! Statements execute to a [`Flow`]: `Normal` or `Return(value)`.  A `return`
//! deep inside nested blocks and loops travels back up as an ordinary value,
//! checked at every level and collapsed into the call result only at the
//! function‑call boundary.  Runtime errors travel the same way as `Err`.
//!
//! Every environment swap goes through [`Interpreter::execute_block`], which
//! restores the previous environment after the inner result is computed, on
//! every path.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, LiteralValue, Stmt, VarDecl};
use crate::class::{LoxClass, LoxInstance};
use crate::environment::{EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::function::{Callable, LoxFunction, NativeFunction};
use crate::resolver::Locals;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Nested calls allowed before a runtime `Stack overflow.` error.  Each Lox
/// call costs several host frames, so the binary runs the interpreter on a
/// thread with a large stack.
pub const MAX_CALL_DEPTH: usize = 1024;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

/// Evaluation state: the fixed global frame, the current frame, and the
/// resolver's side table.  `print` writes to `out`.
pub struct Interpreter<W: Write = io::Stdout> {
    globals: EnvRef,
    environment: EnvRef,
    locals: Locals,
    out: W,
    /// Calls currently in progress.
    depth: usize,
}

impl Interpreter<io::Stdout> {
    /// Creates an interpreter printing to standard output.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// Creates an interpreter writing `print` output to `out` and defines the
    /// native `clock` function.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Rc::new(RefCell::new(Environment::new()));

        let clock: NativeFunction = NativeFunction::clock();
        globals
            .borrow_mut()
            .define(clock.name, Value::Native(Rc::new(clock)));

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            depth: 0,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Runs one top‑level batch.
    ///
    /// `locals` is merged into the table kept from earlier batches (ids are
    /// unique, so entries never collide).  The first runtime error stops the
    /// batch; globals defined before it stay defined.
    pub fn interpret(&mut self, statements: &[Stmt], locals: Locals) -> Result<()> {
        debug!(
            "Interpreting {} statements with {} resolved locals",
            statements.len(),
            locals.len()
        );

        self.locals.extend(locals);

        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!("Runtime debug: {}", e);
                self.out.flush()?;

                return Err(e);
            }
        }

        self.out.flush()?;

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Block(statements) => {
                let environment: EnvRef = Environment::child_of(&self.environment);

                self.execute_block(statements, environment)
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                debug!("Defining class '{}'", name.lexeme);

                // Declared first so method bodies can name the class.
                self.environment.borrow_mut().define(&name.lexeme, Value::Nil);

                let superclass: Option<Rc<LoxClass>> = match superclass {
                    Some(variable) => {
                        match self.look_up_variable(&variable.name, variable.id)? {
                            Value::Class(class) => Some(class),
                            _ => {
                                return Err(LoxError::runtime(
                                    &variable.name,
                                    "Superclass must be a class.",
                                ))
                            }
                        }
                    }
                    None => None,
                };

                let defining: EnvRef = Rc::clone(&self.environment);

                let closure: EnvRef = match &superclass {
                    Some(class) => {
                        let scope: EnvRef = Environment::child_of(&defining);
                        scope
                            .borrow_mut()
                            .define("super", Value::Class(Rc::clone(class)));
                        scope
                    }
                    None => Rc::clone(&defining),
                };

                let methods: HashMap<String, Rc<LoxFunction>> = methods
                    .iter()
                    .map(|method| {
                        let function = LoxFunction::new(
                            Rc::clone(method),
                            Rc::clone(&closure),
                            method.name.lexeme == "init",
                        );

                        (method.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();

                let class = LoxClass::new(name.lexeme.clone(), superclass, methods);

                defining
                    .borrow_mut()
                    .assign(name, Value::Class(Rc::new(class)))?;

                info!("Class '{}' defined", name.lexeme);

                Ok(Flow::Normal)
            }

            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function =
                    LoxFunction::new(Rc::clone(declaration), Rc::clone(&self.environment), false);

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                Ok(Flow::Normal)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;

                writeln!(self.out, "{}", value)?;
                debug!("Printed value: {}", value);

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Var(var) => {
                self.define_var(var)?;

                Ok(Flow::Normal)
            }

            Stmt::VarList(vars) => {
                for var in vars {
                    self.define_var(var)?;
                }

                Ok(Flow::Normal)
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }
        }
    }

    fn define_var(&mut self, var: &VarDecl) -> Result<()> {
        let value: Value = match &var.initializer {
            Some(expr) => self.evaluate(expr)?,
            None => Value::Nil,
        };

        debug!("Variable '{}' defined with value: {}", var.name.lexeme, value);

        self.environment.borrow_mut().define(&var.name.lexeme, value);

        Ok(())
    }

    /// Runs `statements` in `environment`, then reinstates the caller's
    /// environment whatever the outcome.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], environment: EnvRef) -> Result<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, environment);

        let result: Result<Flow> = self.execute_all(statements);

        self.environment = previous;

        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::CommaSeparated(expressions) => {
                let mut last: Value = Value::Nil;

                for expression in expressions {
                    last = self.evaluate(expression)?;
                }

                Ok(last)
            }

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(operator, left, right)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument)?);
                }

                match callee {
                    Value::Native(native) => self.call(&*native, paren, values),
                    Value::Function(function) => self.call(&*function, paren, values),
                    Value::Class(class) => self.call(&class, paren, values),
                    _ => Err(LoxError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    )),
                }
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::string(s),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value)?;
                instance.borrow_mut().set(name, value.clone());

                Ok(value)
            }

            Expr::Super {
                id,
                keyword,
                method,
            } => self.evaluate_super(*id, keyword, method),

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
                    },
                    TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
                    _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
                }
            }

            Expr::Variable(variable) => self.look_up_variable(&variable.name, variable.id),
        }
    }

    /// Arity check, then dispatch.
    fn call<C: Callable>(&mut self, callee: &C, paren: &Token, arguments: Vec<Value>) -> Result<Value> {
        if arguments.len() != callee.arity() {
            return Err(LoxError::runtime(
                paren,
                format!(
                    "Expected {} arguments but got {}.",
                    callee.arity(),
                    arguments.len()
                ),
            ));
        }

        if self.depth >= MAX_CALL_DEPTH {
            debug!("Call depth limit {} reached at line {}", MAX_CALL_DEPTH, paren.line);

            return Err(LoxError::runtime(paren, "Stack overflow."));
        }

        self.depth += 1;
        let result: Result<Value> = callee.call(self, arguments);
        self.depth -= 1;

        result
    }

    /// `super.method`: look the method up on the superclass bound where the
    /// class was declared, and bind it to the `this` one frame below.
    fn evaluate_super(&mut self, id: ExprId, keyword: &Token, method: &Token) -> Result<Value> {
        let distance: usize = *self
            .locals
            .get(&id)
            .ok_or_else(|| LoxError::runtime(keyword, "Unresolved 'super'."))?;

        let superclass: Rc<LoxClass> =
            match Environment::get_at_str(&self.environment, distance, "super") {
                Some(Value::Class(class)) => class,
                _ => return Err(LoxError::runtime(keyword, "Unresolved 'super'.")),
            };

        let instance = match distance
            .checked_sub(1)
            .and_then(|d| Environment::get_at_str(&self.environment, d, "this"))
        {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(LoxError::runtime(keyword, "Unresolved 'this'.")),
        };

        match superclass.find_method(&method.lexeme) {
            Some(function) => Ok(Value::Function(Rc::new(function.bind(instance)))),
            None => Err(LoxError::runtime(
                method,
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }

    /// Resolved ⇒ jump straight to the frame; unresolved ⇒ global.
    fn look_up_variable(&self, name: &Token, id: ExprId) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    use Value::{Bool, Number};

    match (operator.token_type, left, right) {
        (TokenType::PLUS, Number(a), Number(b)) => Ok(Number(a + b)),
        (TokenType::PLUS, Value::String(a), Value::String(b)) => {
            Ok(Value::string(format!("{}{}", a, b)))
        }
        (TokenType::PLUS, _, _) => Err(LoxError::runtime(
            operator,
            "Operands must be two numbers or two strings.",
        )),

        (TokenType::MINUS, Number(a), Number(b)) => Ok(Number(a - b)),
        (TokenType::STAR, Number(a), Number(b)) => Ok(Number(a * b)),
        (TokenType::SLASH, Number(a), Number(b)) => Ok(Number(a / b)),
        (TokenType::GREATER, Number(a), Number(b)) => Ok(Bool(a > b)),
        (TokenType::GREATER_EQUAL, Number(a), Number(b)) => Ok(Bool(a >= b)),
        (TokenType::LESS, Number(a), Number(b)) => Ok(Bool(a < b)),
        (TokenType::LESS_EQUAL, Number(a), Number(b)) => Ok(Bool(a <= b)),

        (TokenType::EQUAL_EQUAL, a, b) => Ok(Bool(a == b)),
        (TokenType::BANG_EQUAL, a, b) => Ok(Bool(a != b)),

        (
            TokenType::MINUS
            | TokenType::STAR
            | TokenType::SLASH
            | TokenType::GREATER
            | TokenType::GREATER_EQUAL
            | TokenType::LESS
            | TokenType::LESS_EQUAL,
            _,
            _,
        ) => Err(LoxError::runtime(operator, "Operands must be numbers.")),

        _ => Err(LoxError::runtime(operator, "Invalid binary operator.")),
    }
}
