//! Grammar-driven command console engine.
//!
//! Commands are registered as syntax templates (`show port PORT...`,
//! `daemon connect [HOST] [TCP_PORT]`) with a handler each. Free-text lines
//! are matched against every template, the single best match is selected,
//! its variable tokens are converted into typed [`Value`]s through an
//! application-supplied [`TypeResolver`], and the handler runs. The same
//! matcher drives tab completion.
//!
//! ```ignore
//! let table = CommandTable::builder()
//!     .command("show port", "Show all ports", show_ports)
//!     .build()?;
//! let dispatcher = Dispatcher::new(&table, &types);
//! Repl::new(dispatcher, ctx).run(&mut BatchReader::new(stdin.lock()))?;
//! ```

pub mod command;
pub mod complete;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod matcher;
pub mod repl;
pub mod resolver;
pub mod token;

pub use command::{Command, CommandTable, CommandTableBuilder, Handler};
pub use complete::{current_word, longest_common_prefix, Completion};
pub use dispatch::Dispatcher;
pub use error::{
    BindError, CandidateCommand, InternalError, InvalidCommandError, ShellError, ShellResult,
};
pub use matcher::{match_line, match_syntax, MatchKind, MatchResult};
pub use repl::{BatchReader, LineReader, ReadOutcome, Repl, RunReport, Session};
pub use resolver::{split_word, KeywordsOnly, TokenKind, TypeDescriptor, TypeResolver, Value, KEYWORD};
pub use token::{parse_syntax, SyntaxToken};
