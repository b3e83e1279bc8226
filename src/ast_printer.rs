use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt, VarDecl};

/// Converts the AST to the Crafting‑Interpreters parenthesized prefix form.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print(expr: &Expr) -> String {
        match expr {
            // ── literals ────────────────────────────────────────────────
            Expr::Literal(lit) => match lit {
                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),

                LiteralValue::Str(s) => s.clone(),

                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        // 3 → 3.0
                        format!("{:.1}", n)
                    } else {
                        n.to_string()
                    }
                }
            },

            Expr::Grouping(inner) => format!("(group {})", Self::print(inner)),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, Self::print(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                Self::print(left),
                Self::print(right)
            ),

            Expr::CommaSeparated(expressions) => parenthesize(",", expressions.iter().map(Self::print)),

            Expr::Variable(variable) => variable.name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::print(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => parenthesize(
                "call",
                std::iter::once(Self::print(callee)).chain(arguments.iter().map(Self::print)),
            ),

            Expr::Get { object, name } => format!("(. {} {})", Self::print(object), name.lexeme),

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(= (. {} {}) {})",
                Self::print(object),
                name.lexeme,
                Self::print(value)
            ),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),

            Expr::This { .. } => "this".into(),
        }
    }

    pub fn print_stmt(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Block(statements) => parenthesize("block", statements.iter().map(Self::print_stmt)),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut head: String = format!("class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    head.push_str(" < ");
                    head.push_str(&superclass.name.lexeme);
                }

                parenthesize(&head, methods.iter().map(|m| print_function(m)))
            }

            Stmt::Expression(expr) => format!("(; {})", Self::print(expr)),

            Stmt::Function(function) => print_function(function),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch),
                    Self::print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    Self::print(condition),
                    Self::print_stmt(then_branch)
                ),
            },

            Stmt::Print(expr) => format!("(print {})", Self::print(expr)),

            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", Self::print(value)),
                None => "(return)".into(),
            },

            Stmt::Var(var) => print_var(var),

            Stmt::VarList(vars) => parenthesize("var-list", vars.iter().map(print_var)),

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                Self::print(condition),
                Self::print_stmt(body)
            ),
        }
    }
}

fn print_function(function: &FunctionDecl) -> String {
    let params: Vec<&str> = function.params.iter().map(|p| p.lexeme.as_str()).collect();
    let head: String = format!("fun {} ({})", function.name.lexeme, params.join(" "));

    parenthesize(&head, function.body.iter().map(AstPrinter::print_stmt))
}

fn print_var(var: &VarDecl) -> String {
    match &var.initializer {
        Some(init) => format!("(var {} = {})", var.name.lexeme, AstPrinter::print(init)),
        None => format!("(var {})", var.name.lexeme),
    }
}

fn parenthesize<I: Iterator<Item = String>>(name: &str, parts: I) -> String {
    let mut s: String = format!("({}", name);
    for part in parts {
        s.push(' ');
        s.push_str(&part);
    }
    s.push(')');
    s
}
