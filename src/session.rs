//! Front‑end pipeline: scan → parse → resolve → interpret.
//!
//! A [`Session`] owns one interpreter, so globals persist from one
//! [`Session::run`] call to the next (one call per REPL line or per file).
//! Static errors from any stage stop the batch before it executes.

use std::io::{self, Write};

use log::{debug, info};

use crate::ast::Stmt;
use crate::error::{LoxError, RunError};
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Locals, Resolver};
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Session<W: Write = io::Stdout> {
    interpreter: Interpreter<W>,
}

impl Session<io::Stdout> {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }
}

impl Default for Session<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Session<W> {
    pub fn with_output(out: W) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
        }
    }

    pub fn into_output(self) -> W {
        self.interpreter.into_output()
    }

    /// Run one batch of source text.
    pub fn run(&mut self, source: &[u8]) -> Result<(), RunError> {
        let (statements, locals) = compile(source)?;

        info!("Executing {} statement(s)", statements.len());

        self.interpreter
            .interpret(&statements, locals)
            .map_err(RunError::Runtime)
    }
}

/// Scan, parse and resolve without executing.
///
/// Lexical and syntax errors are reported together; resolution only runs on
/// a tree that parsed cleanly.
pub fn compile(source: &[u8]) -> Result<(Vec<Stmt>, Locals), RunError> {
    let (tokens, mut errors): (Vec<Token>, Vec<LoxError>) = Scanner::new(source).scan_all();

    debug!("Scanned {} token(s), {} lexical error(s)", tokens.len(), errors.len());

    let parsed = Parser::new(tokens).parse();

    let statements: Vec<Stmt> = match parsed {
        Ok(statements) if errors.is_empty() => statements,
        Ok(_) => return Err(RunError::Static(errors)),
        Err(parse_errors) => {
            errors.extend(parse_errors);
            return Err(RunError::Static(errors));
        }
    };

    let locals: Locals = Resolver::new()
        .resolve(&statements)
        .map_err(RunError::Static)?;

    Ok((statements, locals))
}
