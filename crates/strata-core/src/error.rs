//! Structured errors shared by every Strata crate.
//!
//! All fallible operations in the core return an [`Error`] carrying a
//! machine-readable [`ErrorKind`] plus a human-readable message. Invalid
//! input never panics; it surfaces as a value of the appropriate kind.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifies a failure independently of its rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed textual input (schemas, commands, values).
    Syntax,
    /// A symbolic name did not resolve against the active symbol table.
    UnknownSymbol,
    /// A spawn invocation named a component nobody can construct.
    InvalidSpawn,
    /// An operation required a component that is not registered.
    MissingComponent,
    /// A singleton component was spawned a second time.
    AlreadyExists,
    /// A command received arguments it does not understand.
    UnexpectedArguments,
    /// A request did not complete within its deadline.
    Timeout,
    /// A value, layout, or index did not match the declared schema.
    InconsistentSchema,
    /// An underlying I/O or codec operation failed.
    Io,
    /// Anything without a more precise classification.
    Unspecified,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "syntax_error",
            ErrorKind::UnknownSymbol => "unknown_symbol",
            ErrorKind::InvalidSpawn => "invalid_spawn",
            ErrorKind::MissingComponent => "missing_component",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::UnexpectedArguments => "unexpected_arguments",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InconsistentSchema => "inconsistent_schema",
            ErrorKind::Io => "io_error",
            ErrorKind::Unspecified => "unspecified",
        };
        f.write_str(name)
    }
}

/// A failure with a kind and a rendered message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn unknown_symbol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownSymbol, message)
    }

    pub fn invalid_spawn(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSpawn, message)
    }

    pub fn missing_component(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingComponent, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    pub fn unexpected_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnexpectedArguments, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn inconsistent_schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InconsistentSchema, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn unspecified(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unspecified, message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, err.to_string())
    }
}

/// Result alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;
