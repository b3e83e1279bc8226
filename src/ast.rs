//! **Abstract‑Syntax‑Tree** for Lox programs.
//!
//! Nodes own their tokens, so a parsed program is independent of the source
//! buffer.  Function declarations are `Rc`‑shared: the tree keeps one handle
//! and every runtime function value built from the declaration keeps another.
//!
//! Every node that names a variable (`Variable`, `Assign`, `This`, `Super`)
//! carries an [`ExprId`].  The resolver keys its side table on that id rather
//! than on node contents, since two identical references at different
//! program points resolve to different scopes.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::token::Token;

/// Stable identity of a variable‑referencing expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExprId(usize);

impl ExprId {
    /// Allocate a new id, unique for the life of the process so resolution
    /// tables from separate REPL lines can be merged without collisions.
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);

        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A **literal constant** that appears directly in the source code.
///
/// These variants are the *terminal leaves* of the expression tree; the
/// parser copies the value out of the token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

/// A resolvable reference to a named variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub id: ExprId,
    pub name: Token,
}

impl Variable {
    pub fn new(name: Token) -> Self {
        Self {
            id: ExprId::fresh(),
            name,
        }
    }
}

/// Every kind of *expression* in Lox.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// `a, b, c` ‑ evaluates every operand, yields the last.
    CommaSeparated(Vec<Expr>),

    /// Assignment expression: `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },

    /// Infix binary operator expression
    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// Function‑, method‑ or constructor‑call expression.
    Call {
        callee: Box<Expr>,
        /// The closing `)` token ‑ retained for error reporting.
        paren: Token,
        arguments: Vec<Expr>,
    },

    /// object.property
    Get { object: Box<Expr>, name: Token },

    /// Parenthesised sub‑expression: `"(" expression ")"`.
    Grouping(Box<Expr>),

    Literal(LiteralValue),

    /// Short‑circuiting logical operators `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Token,
        method: Token,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Token },

    /// Prefix unary operator expression
    /// *Example:* `!isReady` or `-42`
    Unary { operator: Token, right: Box<Expr> },

    Variable(Variable),
}

/// `fun name(params) { body }`, also used for class methods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDecl {
    pub name: Token,

    /// Parameter name tokens (arity ≤ 255).
    pub params: Vec<Token>,

    /// Executed in the call's parameter scope; no extra block scope.
    pub body: Vec<Stmt>,
}

/// One `name = initializer` item of a `var` declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarDecl {
    pub name: Token,
    pub initializer: Option<Expr>,
}

/// **Abstract‑Syntax‑Tree node** for *statements*.  A program is a sequence
/// of these nodes returned by [`crate::parser::Parser::parse`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    /// Braced scope containing zero or more declarations/statements.
    Block(Vec<Stmt>),

    Class {
        name: Token,
        superclass: Option<Variable>,
        methods: Vec<Rc<FunctionDecl>>,
    },

    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Function(Rc<FunctionDecl>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    Print(Expr),

    /// `return` statement inside a function body.
    Return {
        /// The `return` keyword token (for error locations).
        keyword: Token,

        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Var(VarDecl),

    /// `var a = 1, b, c = a;` ‑ items are declared left to right.
    VarList(Vec<VarDecl>),

    /// `while` loop; `for` loops are desugared into this.
    While { condition: Expr, body: Box<Stmt> },
}
