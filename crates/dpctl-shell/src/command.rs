//! Registered commands and the table that holds them.

use std::collections::HashSet;
use std::fmt;

use crate::error::{CandidateCommand, InternalError, ShellResult};
use crate::repl::Session;
use crate::resolver::Value;
use crate::token::{parse_syntax, SyntaxToken};

/// Called with the session and the positional arguments: the configured
/// default arguments followed by one value per variable token.
pub type Handler<C> = Box<dyn Fn(&mut Session<C>, &[Value]) -> ShellResult<()>>;

pub struct Command<C> {
    syntax: String,
    description: String,
    tokens: Vec<SyntaxToken>,
    handler: Handler<C>,
}

impl<C> Command<C> {
    pub fn syntax(&self) -> &str {
        &self.syntax
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn tokens(&self) -> &[SyntaxToken] {
        &self.tokens
    }

    pub fn invoke(&self, session: &mut Session<C>, args: &[Value]) -> ShellResult<()> {
        (self.handler)(session, args)
    }

    pub fn listing_entry(&self) -> CandidateCommand {
        CandidateCommand {
            syntax: self.syntax.clone(),
            description: self.description.clone(),
        }
    }
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("syntax", &self.syntax)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Immutable, registration-ordered command table.
#[derive(Debug)]
pub struct CommandTable<C> {
    commands: Vec<Command<C>>,
}

impl<C> CommandTable<C> {
    pub fn builder() -> CommandTableBuilder<C> {
        CommandTableBuilder::default()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command<C>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// `(syntax, description)` for every command, in registration order.
    pub fn listing(&self) -> Vec<CandidateCommand> {
        self.commands.iter().map(Command::listing_entry).collect()
    }
}

impl<'a, C> IntoIterator for &'a CommandTable<C> {
    type Item = &'a Command<C>;
    type IntoIter = std::slice::Iter<'a, Command<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

pub struct CommandTableBuilder<C> {
    entries: Vec<(String, String, Handler<C>)>,
}

impl<C> Default for CommandTableBuilder<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> CommandTableBuilder<C> {
    pub fn command<F>(mut self, syntax: &str, description: &str, handler: F) -> Self
    where
        F: Fn(&mut Session<C>, &[Value]) -> ShellResult<()> + 'static,
    {
        self.entries
            .push((syntax.to_string(), description.to_string(), Box::new(handler)));
        self
    }

    /// Validate every syntax string and freeze the table.
    pub fn build(self) -> Result<CommandTable<C>, InternalError> {
        let mut seen = HashSet::new();
        let mut commands = Vec::with_capacity(self.entries.len());

        for (syntax, description, handler) in self.entries {
            let tokens = parse_syntax(&syntax)
                .map_err(|e| InternalError::new(format!("command \"{syntax}\": {}", e.0)))?;
            let canonical = tokens
                .iter()
                .map(SyntaxToken::raw)
                .collect::<Vec<_>>()
                .join(" ");
            if !seen.insert(canonical.clone()) {
                return Err(InternalError::new(format!(
                    "command \"{canonical}\" registered twice"
                )));
            }
            commands.push(Command {
                syntax: canonical,
                description,
                tokens,
                handler,
            });
        }

        Ok(CommandTable { commands })
    }
}
