//! Grammar token model.
//!
//! A command's syntax string is a whitespace-separated template:
//!
//! - `show`: a word matched verbatim, unless the resolver claims it as a type;
//! - `[TOK]`: the token may be left out at the end of a line;
//! - `TOK...`: the token swallows the rest of the line;
//! - `[TOK...]`: both.

use crate::error::InternalError;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxToken {
    raw: String,
    name: String,
    optional: bool,
    repeatable: bool,
}

impl SyntaxToken {
    pub fn parse(raw: &str) -> Result<Self, InternalError> {
        let malformed = |why: &str| InternalError::new(format!("malformed token \"{raw}\": {why}"));

        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(malformed("expected a single word"));
        }

        let (inner, optional) = match raw.strip_prefix('[') {
            Some(rest) => match rest.strip_suffix(']') {
                Some(inner) => (inner, true),
                None => return Err(malformed("unterminated `[`")),
            },
            None => (raw, false),
        };
        if inner.contains(['[', ']']) {
            return Err(malformed("stray bracket"));
        }

        let (name, repeatable) = match inner.strip_suffix(ELLIPSIS) {
            Some(name) => (name, true),
            None => (inner, false),
        };
        if name.is_empty() {
            return Err(malformed("empty name"));
        }

        Ok(Self {
            raw: raw.to_string(),
            name: name.to_string(),
            optional,
            repeatable,
        })
    }

    /// The token exactly as written in the syntax string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The token with brackets and ellipsis stripped; this is what the
    /// resolver looks up and what a keyword is compared against.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }
}

/// Split a syntax string into tokens, rejecting anything structurally broken.
pub fn parse_syntax(syntax: &str) -> Result<Vec<SyntaxToken>, InternalError> {
    let tokens = syntax
        .split_whitespace()
        .map(SyntaxToken::parse)
        .collect::<Result<Vec<_>, _>>()?;
    if tokens.is_empty() {
        return Err(InternalError::new("empty command syntax"));
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_token_shapes() {
        let tokens = parse_syntax("add port DRIVER [NEW_PORT] WORKER_ID... [PORT_ARGS...]")
            .expect("parse");
        let shapes: Vec<_> = tokens
            .iter()
            .map(|t| (t.name(), t.is_optional(), t.is_repeatable()))
            .collect();
        assert_eq!(
            shapes,
            vec![
                ("add", false, false),
                ("port", false, false),
                ("DRIVER", false, false),
                ("NEW_PORT", true, false),
                ("WORKER_ID", false, true),
                ("PORT_ARGS", true, true),
            ]
        );
        assert_eq!(tokens[3].raw(), "[NEW_PORT]");
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["[HOST", "HOST]", "[]", "...", "[...]", "[A]...", "A[B]"] {
            assert!(SyntaxToken::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn rejects_empty_syntax() {
        assert!(parse_syntax("   ").is_err());
    }
}
