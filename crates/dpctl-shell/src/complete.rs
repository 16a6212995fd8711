//! Tab completion over the command table.
//!
//! Only the end of the line can be completed. Every command that still
//! matches contributes candidates for the word under the cursor; when they
//! share a prefix longer than that word the prefix is filled in, otherwise a
//! help block for the remaining commands is produced instead.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::dispatch::Dispatcher;
use crate::error::InternalError;
use crate::matcher::MatchKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Replace the current word with this text.
    Extend(String),
    /// Nothing to fill in; show this text and redraw the unchanged line.
    Listing(String),
    Nothing,
}

/// The word being typed: empty after a separator, else the trailing run of
/// non-whitespace characters.
pub fn current_word(line: &str) -> &str {
    match line.rfind(char::is_whitespace) {
        Some(pos) => {
            let sep_len = line[pos..].chars().next().map_or(1, char::len_utf8);
            &line[pos + sep_len..]
        }
        None => line,
    }
}

pub fn longest_common_prefix<'s, I>(items: I) -> String
where
    I: IntoIterator<Item = &'s str>,
{
    let mut iter = items.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut prefix = first;
    for item in iter {
        let shared = prefix
            .char_indices()
            .zip(item.chars())
            .find(|((_, a), b)| a != b)
            .map_or_else(|| prefix.len().min(item.len()), |((i, _), _)| i);
        prefix = &prefix[..shared];
        if prefix.is_empty() {
            break;
        }
    }
    prefix.to_string()
}

impl<C> Dispatcher<'_, C> {
    /// Complete `line` with the cursor at byte offset `cursor`.
    pub fn complete(&self, line: &str, cursor: usize) -> Result<Completion, InternalError> {
        if cursor != line.len() {
            return Ok(Completion::Nothing);
        }

        let word = current_word(line);
        let mut candidates = BTreeSet::new();
        let mut possible = Vec::new();
        let mut full_matches = 0usize;

        for (cmd, result) in self.match_all(line)? {
            if !result.is_match() {
                continue;
            }
            if result.kind == MatchKind::Full {
                full_matches += 1;
            }
            for candidate in result.candidates.iter().filter(|c| c.starts_with(word)) {
                let mut candidate = candidate.clone();
                if !candidate.ends_with('/') {
                    candidate.push(' ');
                }
                candidates.insert(candidate);
            }
            possible.push((cmd, result));
        }

        let prefix = longest_common_prefix(
            candidates
                .iter()
                .map(String::as_str)
                .filter(|c| !c.trim().is_empty()),
        );
        if prefix.len() > word.len() && prefix.starts_with(word) {
            return Ok(Completion::Extend(prefix));
        }

        if possible.is_empty() {
            return Ok(Completion::Nothing);
        }

        let mut buf = String::from("\n");
        for (cmd, result) in &possible {
            let syntax = if result.kind == MatchKind::Full && full_matches == 1 {
                format!("{} <enter>", cmd.syntax())
            } else {
                cmd.syntax().to_string()
            };
            let _ = writeln!(buf, "  {syntax:<50} {}", cmd.description());

            let Some(token) = &result.current_token else {
                continue;
            };
            if let Some(desc) = self.resolver().resolve(token, word) {
                let _ = writeln!(
                    buf,
                    "    {} ({}): {}",
                    token.raw(),
                    desc.type_name,
                    desc.description
                );
                for candidate in desc.candidates.iter().filter(|c| c.starts_with(word)) {
                    let _ = writeln!(buf, "      {candidate}");
                }
            }
        }
        Ok(Completion::Listing(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_word_tracks_trailing_run() {
        assert_eq!(current_word("show po"), "po");
        assert_eq!(current_word("show "), "");
        assert_eq!(current_word("show"), "show");
        assert_eq!(current_word(""), "");
    }

    #[test]
    fn lcp_of_candidates() {
        assert_eq!(longest_common_prefix(["port ", "pipeline "]), "p");
        assert_eq!(longest_common_prefix(["port "]), "port ");
        assert_eq!(longest_common_prefix(["abc", "ab"]), "ab");
        assert_eq!(longest_common_prefix(["x", "y"]), "");
        assert_eq!(longest_common_prefix(Vec::<&str>::new()), "");
        assert_eq!(longest_common_prefix(["héllo", "hélp"]), "hél");
    }
}
