//! Centralised error hierarchy for the **Lox interpreter**.
//!
//! All subsystems (scanner, parser, resolver, runtime) convert their
//! internal failure modes into one of the variants defined here.  This enables a
//! uniform `Result<T>` alias throughout the crate and ergonomic inter‑operation
//! with `anyhow`, while still preserving rich diagnostic detail.
//!
//! The two core families, [`ResolveError`] and [`RuntimeError`], are typed so
//! callers (and tests) can match on the exact failure; both render as a single
//! line carrying the offending source line and lexeme.
//!
//! The module **does not** print diagnostics itself.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis failure reported by the resolver.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        LoxError::Parse { message, line }
    }

    /// Process exit code conventionally associated with this error
    /// (65 = bad input program, 70 = failure while running it).
    pub fn exit_code(&self) -> i32 {
        match self {
            LoxError::Runtime(_) => 70,
            _ => 65,
        }
    }
}

/// Failures detected by the static resolver pass.  Any of these aborts
/// resolution; the program is never executed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("[line {line}] Error at '{name}': Already a variable with this name in this scope.")]
    DuplicateDeclaration { name: String, line: usize },

    #[error("[line {line}] Error at '{name}': Can't read local variable in its own initializer.")]
    SelfReferentialInitializer { name: String, line: usize },

    #[error("[line {line}] Error at 'return': Can't return from top-level code.")]
    ReturnOutsideFunction { line: usize },

    #[error("[line {line}] Error at 'return': Can't return a value from an initializer.")]
    ReturnValueFromInitializer { line: usize },

    #[error("[line {line}] Error at '{name}': A class can't inherit from itself.")]
    SelfInheritance { name: String, line: usize },

    #[error("[line {line}] Error at 'super': Can't use 'super' outside of a class.")]
    SuperOutsideClass { line: usize },

    #[error("[line {line}] Error at 'super': Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass { line: usize },

    #[error("[line {line}] Error at 'this': Can't use 'this' outside of a class.")]
    ThisOutsideClass { line: usize },
}

/// Failures raised while evaluating a program.  Each one aborts the whole
/// `interpret` call; the language has no way to catch them.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {line}] Error at '{name}': Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: usize },

    #[error("[line {line}] Error at '{lexeme}': Can only call functions and classes: {kind} is not a function.")]
    NotCallable {
        kind: &'static str,
        lexeme: String,
        line: usize,
    },

    #[error("[line {line}] Error at '{lexeme}': Expected {expected} arguments but got {got}.")]
    ArityMismatch {
        expected: usize,
        got: usize,
        lexeme: String,
        line: usize,
    },

    #[error("[line {line}] Error at '{name}': Only instances have {what}.")]
    NotAnInstance {
        what: &'static str,
        name: String,
        line: usize,
    },

    #[error("[line {line}] Error at '{name}': Undefined property '{name}'.")]
    UndefinedProperty { name: String, line: usize },

    #[error("[line {line}] Error at '/': Division by zero.")]
    DivisionByZero { line: usize },

    /// Operand coercion failure, e.g. `string is not a number`.
    #[error("[line {line}] Error at '{lexeme}': {message}.")]
    TypeMismatch {
        message: String,
        lexeme: String,
        line: usize,
    },

    #[error("[line {line}] Error at '{name}': Superclass must be a class.")]
    SuperclassNotAClass { name: String, line: usize },

    /// The injected output sink refused a `print`.
    #[error("Failed to write program output: {0}")]
    Output(#[from] io::Error),
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
