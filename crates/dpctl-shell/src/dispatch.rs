//! Pick the one command a line means, then bind its arguments.

use tracing::{debug, trace};

use crate::command::{Command, CommandTable};
use crate::error::{InternalError, InvalidCommandError, ShellError, ShellResult};
use crate::matcher::{match_line, MatchKind, MatchResult};
use crate::resolver::{TokenKind, TypeResolver, Value};

/// Commands split by score: those at the best score, then the rest.
pub type Ranked<'a, C> = (Vec<&'a Command<C>>, Vec<&'a Command<C>>);

pub struct Dispatcher<'a, C> {
    table: &'a CommandTable<C>,
    resolver: &'a dyn TypeResolver,
}

impl<C> Clone for Dispatcher<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Dispatcher<'_, C> {}

impl<'a, C> Dispatcher<'a, C> {
    pub fn new(table: &'a CommandTable<C>, resolver: &'a dyn TypeResolver) -> Self {
        Self { table, resolver }
    }

    pub fn table(&self) -> &'a CommandTable<C> {
        self.table
    }

    pub fn resolver(&self) -> &'a dyn TypeResolver {
        self.resolver
    }

    /// Match `line` against every command, in registration order.
    pub fn match_all(
        &self,
        line: &str,
    ) -> Result<Vec<(&'a Command<C>, MatchResult)>, InternalError> {
        self.table
            .iter()
            .map(|cmd| {
                let result = match_line(self.resolver, cmd.tokens(), line)?;
                trace!(syntax = cmd.syntax(), kind = ?result.kind, score = result.score, "match");
                Ok((cmd, result))
            })
            .collect()
    }

    /// Commands whose match kind is in `kinds`, partitioned by whether their
    /// score equals the best score among them.
    pub fn list_matched(&self, line: &str, kinds: &[MatchKind]) -> Result<Ranked<'a, C>, InternalError> {
        let hits: Vec<_> = self
            .match_all(line)?
            .into_iter()
            .filter(|(_, result)| kinds.contains(&result.kind))
            .collect();

        let Some(best) = hits.iter().map(|(_, r)| r.score).max() else {
            return Ok((Vec::new(), Vec::new()));
        };

        let (top, low): (Vec<_>, Vec<_>) = hits.into_iter().partition(|(_, r)| r.score == best);
        Ok((
            top.into_iter().map(|(cmd, _)| cmd).collect(),
            low.into_iter().map(|(cmd, _)| cmd).collect(),
        ))
    }

    /// Resolve a complete input line to exactly one command.
    pub fn find_command(&self, line: &str) -> ShellResult<&'a Command<C>> {
        let shown = line.trim();
        let finished = format!("{shown} ");

        let (top, low) = self.list_matched(&finished, &[MatchKind::Full])?;
        match top.len() {
            1 => {
                debug!(syntax = top[0].syntax(), "selected command");
                return Ok(top[0]);
            }
            0 => {}
            _ => {
                return Err(InvalidCommandError::Ambiguous {
                    line: shown.to_string(),
                    candidates: top.iter().chain(&low).map(|c| c.listing_entry()).collect(),
                }
                .into())
            }
        }

        let (top, low) = self.list_matched(&finished, &[MatchKind::Partial])?;
        if top.is_empty() {
            return Err(InvalidCommandError::Unknown {
                line: shown.to_string(),
            }
            .into());
        }
        Err(InvalidCommandError::Incomplete {
            line: shown.to_string(),
            candidates: top.iter().chain(&low).map(|c| c.listing_entry()).collect(),
        }
        .into())
    }

    /// Walk `command`'s grammar over `line` again and convert every variable
    /// token into a value. The result is `defaults` followed by the bound
    /// values in token order.
    pub fn bind_args(
        &self,
        command: &Command<C>,
        line: &str,
        defaults: &[Value],
    ) -> ShellResult<Vec<Value>> {
        let mut remainder = line.trim_start();
        let mut args = defaults.to_vec();

        for token in command.tokens() {
            if remainder.is_empty() {
                if token.is_optional() {
                    args.push(Value::Absent);
                    continue;
                }
                return Err(InternalError::new(format!(
                    "partial match on \"{}\"? line: \"{line}\"",
                    command.syntax()
                ))
                .into());
            }

            let word = remainder.split_whitespace().next().unwrap_or("");
            let kind = TokenKind::classify(self.resolver, token, word);
            let (head, tail) = match &kind {
                TokenKind::Variable(_) if token.is_repeatable() => (remainder, ""),
                _ => self.resolver.split(kind.type_name(), remainder)?,
            };

            if let TokenKind::Variable(desc) = &kind {
                let value = self
                    .resolver
                    .bind(&desc.type_name, head.trim_end())
                    .map_err(|err| match err {
                        ShellError::Bind(bind) => ShellError::Bind(bind.described(&desc.description)),
                        other => other,
                    })?;
                args.push(value);
            }
            remainder = tail.trim_start();
        }

        Ok(args)
    }

    /// `find_command` followed by `bind_args`.
    pub fn resolve_line(
        &self,
        line: &str,
        defaults: &[Value],
    ) -> ShellResult<(&'a Command<C>, Vec<Value>)> {
        let command = self.find_command(line)?;
        let args = self.bind_args(command, line, defaults)?;
        Ok((command, args))
    }
}
