//! Classify one input line against one command grammar.
//!
//! The walk is left to right: each grammar token lines up with the next piece
//! of input, carved off by the token's splitter. A keyword matches its exact
//! text or any abbreviation of it, but only exact matches add to the score.
//! Variable tokens accept whatever their splitter hands them; validation is
//! the binder's job.

use crate::error::InternalError;
use crate::resolver::{TokenKind, TypeResolver};
use crate::token::{parse_syntax, SyntaxToken};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    /// Every required token is satisfied and no input is left over.
    Full,
    /// The line is a valid prefix of the grammar.
    Partial,
    Nonmatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub kind: MatchKind,
    /// Sorted and deduplicated completion candidates for the current word.
    pub candidates: Vec<String>,
    /// The grammar token the cursor is on, if any.
    pub current_token: Option<SyntaxToken>,
    /// Number of keywords matched exactly. Only ranks competing `Full` matches.
    pub score: usize,
}

impl MatchResult {
    fn new(
        kind: MatchKind,
        mut candidates: Vec<String>,
        current_token: Option<&SyntaxToken>,
        score: usize,
    ) -> Self {
        candidates.sort();
        candidates.dedup();
        Self {
            kind,
            candidates,
            current_token: current_token.cloned(),
            score,
        }
    }

    fn nonmatch(score: usize) -> Self {
        Self::new(MatchKind::Nonmatch, Vec::new(), None, score)
    }

    pub fn is_match(&self) -> bool {
        self.kind != MatchKind::Nonmatch
    }
}

/// Match `line` against pre-parsed grammar `tokens`.
///
/// Pure: the only state consulted is `resolver`. Fails only when the resolver
/// names a type its own splitter does not know.
pub fn match_line(
    resolver: &dyn TypeResolver,
    tokens: &[SyntaxToken],
    line: &str,
) -> Result<MatchResult, InternalError> {
    let new_token = line.ends_with(char::is_whitespace);
    let mut remainder = line.trim_start();
    let mut candidates: Vec<String> = Vec::new();
    let mut score = 0;

    for (i, token) in tokens.iter().enumerate() {
        let word = remainder.split_whitespace().next().unwrap_or("");
        let kind = TokenKind::classify(resolver, token, word);

        if remainder.is_empty() {
            if !new_token {
                // Still inside the previous word.
                let previous = &tokens[i.saturating_sub(1)];
                return Ok(MatchResult::new(
                    MatchKind::Partial,
                    candidates,
                    Some(previous),
                    score,
                ));
            }

            if i == 0 || !tokens[i - 1].is_repeatable() {
                candidates.clear();
            }
            match kind {
                TokenKind::Keyword => candidates.push(token.name().to_string()),
                TokenKind::Variable(desc) => candidates.extend(desc.candidates),
            }

            // The first skippable token ends the walk, whatever follows it.
            let kind = if token.is_optional() {
                MatchKind::Full
            } else {
                MatchKind::Partial
            };
            return Ok(MatchResult::new(kind, candidates, Some(token), score));
        }

        let (head, tail) = match &kind {
            TokenKind::Variable(_) if token.is_repeatable() => (remainder, ""),
            _ => resolver.split(kind.type_name(), remainder)?,
        };
        remainder = tail.trim_start();

        match kind {
            TokenKind::Keyword => {
                if head == token.name() {
                    score += 1;
                    candidates = if new_token {
                        Vec::new()
                    } else {
                        vec![token.name().to_string()]
                    };
                } else if !head.is_empty() && token.name().starts_with(head) {
                    if !new_token && remainder.is_empty() {
                        return Ok(MatchResult::new(
                            MatchKind::Partial,
                            vec![token.name().to_string()],
                            Some(token),
                            score,
                        ));
                    }
                    // Abbreviated keyword: accepted, but never scored.
                    candidates = vec![token.name().to_string()];
                } else {
                    return Ok(MatchResult::nonmatch(score));
                }
            }
            TokenKind::Variable(desc) => {
                candidates = if new_token {
                    desc.candidates
                } else {
                    let typed = head.split_whitespace().last().unwrap_or("");
                    desc.candidates
                        .into_iter()
                        .filter(|c| c.starts_with(typed))
                        .collect()
                };
            }
        }
    }

    let Some(last) = tokens.last() else {
        return Ok(MatchResult::nonmatch(score));
    };
    if !remainder.is_empty() {
        return Ok(MatchResult::nonmatch(score));
    }
    if last.is_repeatable() {
        return Ok(MatchResult::new(MatchKind::Full, candidates, Some(last), score));
    }
    if new_token {
        return Ok(MatchResult::new(MatchKind::Full, Vec::new(), None, score));
    }
    Ok(MatchResult::new(MatchKind::Full, candidates, Some(last), score))
}

/// Parse `syntax` and match `line` against it.
pub fn match_syntax(
    resolver: &dyn TypeResolver,
    syntax: &str,
    line: &str,
) -> Result<MatchResult, InternalError> {
    let tokens = parse_syntax(syntax)?;
    match_line(resolver, &tokens, line)
}
