//! The type-resolver contract between the engine and the embedding application.
//!
//! The engine knows a single type, [`KEYWORD`]. Everything else (integers,
//! names, id lists, `key=value` maps, ...) is declared by the application
//! through [`TypeResolver`]: `resolve` decides whether a grammar token is a
//! variable and describes it, `split` carves one token's worth of text off the
//! input, and `bind` converts that text into a [`Value`].

use std::collections::BTreeMap;

use crate::error::{InternalError, ShellResult};
use crate::token::SyntaxToken;

/// Type name of literal keywords.
pub const KEYWORD: &str = "keyword";

/// What the resolver knows about a variable token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_name: String,
    pub description: String,
    /// Completion candidates, possibly computed from live state.
    pub candidates: Vec<String>,
}

impl TypeDescriptor {
    pub fn new(type_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: description.into(),
            candidates: Vec::new(),
        }
    }

    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }
}

/// A grammar token as seen against a particular input word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Variable(TypeDescriptor),
}

impl TokenKind {
    pub fn classify(resolver: &dyn TypeResolver, token: &SyntaxToken, partial_word: &str) -> Self {
        match resolver.resolve(token, partial_word) {
            Some(desc) => Self::Variable(desc),
            None => Self::Keyword,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Keyword => KEYWORD,
            Self::Variable(desc) => &desc.type_name,
        }
    }
}

/// A typed argument handed to a command handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An optional token the user left out.
    Absent,
    Int(i64),
    Str(String),
    List(Vec<String>),
    IntList(Vec<i64>),
    Map(BTreeMap<String, serde_json::Value>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_list(&self) -> Option<&[i64]> {
        match self {
            Self::IntList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, serde_json::Value>> {
        match self {
            Self::Map(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }
}

pub trait TypeResolver {
    /// `None` means `token` is a literal keyword.
    ///
    /// `partial_word` is the input word currently lined up with the token, so
    /// candidate lists can be narrowed (file names, live object names, ...).
    fn resolve(&self, token: &SyntaxToken, partial_word: &str) -> Option<TypeDescriptor>;

    /// Return `(head, tail)` with `head + tail == text`; `head` is the text
    /// consumed by one token of `type_name`.
    fn split<'a>(&self, type_name: &str, text: &'a str) -> Result<(&'a str, &'a str), InternalError> {
        if type_name == KEYWORD {
            Ok(split_word(text))
        } else {
            Err(InternalError::undefined_type(type_name))
        }
    }

    /// Convert the text consumed by `split` into a value.
    ///
    /// Malformed input is a `ShellError::Bind`; an undeclared type is a
    /// `ShellError::Internal`.
    fn bind(&self, type_name: &str, text: &str) -> ShellResult<Value> {
        let _ = text;
        if type_name == KEYWORD {
            Ok(Value::Absent)
        } else {
            Err(InternalError::undefined_type(type_name).into())
        }
    }
}

/// A resolver with no types: every token is a keyword.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordsOnly;

impl TypeResolver for KeywordsOnly {
    fn resolve(&self, _token: &SyntaxToken, _partial_word: &str) -> Option<TypeDescriptor> {
        None
    }
}

/// Split at the first whitespace; the tail keeps its leading separator.
pub fn split_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(pos) => text.split_at(pos),
        None => (text, ""),
    }
}
