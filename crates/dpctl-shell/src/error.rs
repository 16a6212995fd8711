//! Error taxonomy for the console.
//!
//! Four classes are recoverable: they are reported for the current line and the
//! session carries on (or, in batch mode, stops after reporting). `Internal` is
//! a configuration defect and always escapes the per-line error handling.

use std::fmt::Write as _;

use thiserror::Error;

/// A misconfigured grammar table or type resolver.
///
/// Raised when a resolver names a type the splitter/binder does not know, when
/// a structurally malformed syntax string is registered, or when the matcher
/// and binder disagree about a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal error: {0}")]
pub struct InternalError(pub String);

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// A splitter or binder was asked about a type it does not declare.
    pub fn undefined_type(type_name: &str) -> Self {
        Self(format!("type \"{type_name}\" is undefined"))
    }
}

/// The text for a variable token failed its type's validation.
///
/// Displays as `<subject>: <message>`, where the subject is the token's
/// description once the binder has attached one, else the type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", bind_subject(.type_name, .description))]
pub struct BindError {
    pub type_name: String,
    pub description: String,
    pub message: String,
}

impl BindError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: String::new(),
            message: message.into(),
        }
    }

    /// Attach the description of the token that failed to bind.
    pub fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

fn bind_subject<'a>(type_name: &'a str, description: &'a str) -> &'a str {
    if description.is_empty() {
        type_name
    } else {
        description
    }
}

/// One row of a candidate listing attached to an [`InvalidCommandError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCommand {
    pub syntax: String,
    pub description: String,
}

/// The line could not be resolved to exactly one registered command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCommandError {
    #[error("Ambiguous command \"{line}\". Candidates:{}", format_candidates(.candidates))]
    Ambiguous {
        line: String,
        candidates: Vec<CandidateCommand>,
    },
    #[error("Incomplete command \"{line}\". Candidates:{}", format_candidates(.candidates))]
    Incomplete {
        line: String,
        candidates: Vec<CandidateCommand>,
    },
    #[error("Unknown command \"{line}\".")]
    Unknown { line: String },
}

impl InvalidCommandError {
    /// Candidates in listing order: equally scored first, lower scored after.
    pub fn candidates(&self) -> &[CandidateCommand] {
        match self {
            Self::Ambiguous { candidates, .. } | Self::Incomplete { candidates, .. } => candidates,
            Self::Unknown { .. } => &[],
        }
    }
}

fn format_candidates(candidates: &[CandidateCommand]) -> String {
    let mut out = String::new();
    for c in candidates {
        let _ = write!(out, "\n  {:<50}{}", c.syntax, c.description);
    }
    out
}

/// Everything a line can fail with.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A handler rejected the request (domain failure).
    #[error("{0}")]
    Command(String),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    InvalidCommand(#[from] InvalidCommandError),
    /// The handler already told the user what went wrong.
    #[error("error already reported")]
    Handled,
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ShellError {
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command(message.into())
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

pub type ShellResult<T> = Result<T, ShellError>;
