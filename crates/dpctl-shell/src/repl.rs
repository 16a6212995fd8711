//! The read → dispatch → bind → invoke loop.
//!
//! One line at a time, never concurrently. Recoverable errors are reported and
//! the loop carries on, except in batch mode where the first failing line ends
//! the run. An [`InternalError`] ends the run immediately, from any mode.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::{debug, error, warn};

use crate::dispatch::Dispatcher;
use crate::error::{CandidateCommand, InternalError, ShellError, ShellResult};
use crate::history::{load_history, save_history};
use crate::resolver::Value;

/// State that outlives a single line. Handlers get it mutably.
pub struct Session<C> {
    interactive: bool,
    last_command: String,
    history_path: Option<PathBuf>,
    stop_requested: bool,
    history: Vec<String>,
    commands: Vec<CandidateCommand>,
    out: Box<dyn Write>,
    ctx: C,
}

impl<C> Session<C> {
    pub fn new(ctx: C) -> Self {
        Self {
            interactive: false,
            last_command: String::new(),
            history_path: None,
            stop_requested: false,
            history: Vec::new(),
            commands: Vec::new(),
            out: Box::new(io::stdout()),
            ctx,
        }
    }

    pub fn interactive(&self) -> bool {
        self.interactive
    }

    pub fn last_command(&self) -> &str {
        &self.last_command
    }

    /// Lines accepted so far, oldest first, including the one running now.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn history_path(&self) -> Option<&Path> {
        self.history_path.as_deref()
    }

    /// Leave the loop once the current line is done.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Every registered command, in registration order.
    pub fn commands(&self) -> &[CandidateCommand] {
        &self.commands
    }

    pub fn out(&mut self) -> &mut dyn Write {
        self.out.as_mut()
    }

    pub fn ctx(&self) -> &C {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut C {
        &mut self.ctx
    }

    /// Borrow the application context and the output stream together.
    pub fn split(&mut self) -> (&mut C, &mut dyn Write) {
        (&mut self.ctx, self.out.as_mut())
    }

    pub fn into_ctx(self) -> C {
        self.ctx
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// The user interrupted the prompt; only this line is abandoned.
    Interrupted,
    Eof,
}

/// Where lines come from: a terminal line editor or a finite stream.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome>;

    /// Offer an accepted line to the editor's own recall buffer.
    fn add_history(&mut self, _line: &str) {}
}

/// Reads one command per line from any buffered stream.
pub struct BatchReader<R> {
    input: R,
}

impl<R: BufRead> BatchReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> LineReader for BatchReader<R> {
    fn read_line(&mut self, _prompt: &str) -> io::Result<ReadOutcome> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        Ok(ReadOutcome::Line(line))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Non-empty lines handed to the dispatcher.
    pub executed: usize,
    pub failures: usize,
    /// Batch mode gave up after a failing line.
    pub stopped_on_error: bool,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failures == 0
    }
}

type Prompt<'a, C> = Box<dyn Fn(&C) -> String + 'a>;

pub struct Repl<'a, C> {
    dispatcher: Dispatcher<'a, C>,
    session: Session<C>,
    defaults: Vec<Value>,
    prompt: Prompt<'a, C>,
    banner: Option<String>,
    errors: Box<dyn Write>,
    colorize: bool,
    echo: bool,
}

impl<'a, C> Repl<'a, C> {
    pub fn new(dispatcher: Dispatcher<'a, C>, ctx: C) -> Self {
        let mut session = Session::new(ctx);
        session.commands = dispatcher.table().listing();
        Self {
            dispatcher,
            session,
            defaults: Vec::new(),
            prompt: Box::new(|_: &C| "> ".to_string()),
            banner: None,
            errors: Box::new(io::stderr()),
            colorize: false,
            echo: false,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.session.interactive = interactive;
        self
    }

    /// History file used in interactive mode.
    pub fn history_path(mut self, path: Option<PathBuf>) -> Self {
        self.session.history_path = path;
        self
    }

    /// Arguments placed in front of the bound values on every handler call.
    pub fn default_args(mut self, args: Vec<Value>) -> Self {
        self.defaults = args;
        self
    }

    pub fn prompt<F>(mut self, prompt: F) -> Self
    where
        F: Fn(&C) -> String + 'a,
    {
        self.prompt = Box::new(prompt);
        self
    }

    /// Printed once before the first prompt, interactive mode only.
    pub fn banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    pub fn output<W: Write + 'static>(mut self, out: W) -> Self {
        self.session.out = Box::new(out);
        self
    }

    pub fn errors<W: Write + 'static>(mut self, errors: W) -> Self {
        self.errors = Box::new(errors);
        self
    }

    /// Print error reports in red.
    pub fn colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    /// In batch mode, print each line after the prompt before running it.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    pub fn into_session(self) -> Session<C> {
        self.session
    }

    /// Dispatch, bind and invoke one line without touching history.
    pub fn execute(&mut self, line: &str) -> ShellResult<()> {
        execute_line(self.dispatcher, &self.defaults, &mut self.session, line)
    }

    /// Run until end of input, a stop request, a batch-mode failure, or an
    /// internal error. History is written back on every way out.
    pub fn run(&mut self, reader: &mut dyn LineReader) -> Result<RunReport, InternalError> {
        let dispatcher = self.dispatcher;
        let Self {
            session,
            defaults,
            prompt,
            banner,
            errors,
            colorize,
            echo,
            ..
        } = self;

        session.stop_requested = false;
        if session.interactive {
            if let Some(path) = session.history_path.clone() {
                match load_history(&path) {
                    Ok(entries) => {
                        for entry in &entries {
                            reader.add_history(entry);
                        }
                        session.history = entries;
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "history load failed");
                        report(
                            errors.as_mut(),
                            *colorize,
                            &format!("Cannot read from history file \"{}\"", path.display()),
                        );
                    }
                }
            }
            if let Some(banner) = banner {
                let _ = writeln!(session.out, "{banner}");
                let _ = session.out.flush();
            }
        }

        let mut guard = HistoryGuard {
            session,
            errors: errors.as_mut(),
            colorize: *colorize,
        };
        let session = &mut *guard.session;
        let errors = &mut *guard.errors;
        let mut summary = RunReport::default();

        while !session.stop_requested {
            let prompt_text = (**prompt)(&session.ctx);
            let line = match reader.read_line(&prompt_text) {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::Interrupted) => {
                    let _ = writeln!(session.out);
                    continue;
                }
                Ok(ReadOutcome::Eof) => {
                    if session.interactive {
                        let _ = writeln!(session.out);
                    }
                    break;
                }
                Err(e) => {
                    if let Some(internal) = e
                        .get_ref()
                        .and_then(|inner| inner.downcast_ref::<InternalError>())
                    {
                        error!(error = %internal, "internal error while reading input");
                        return Err(internal.clone());
                    }
                    report(errors, *colorize, &format!("Cannot read input: {e}"));
                    summary.failures += 1;
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            session.last_command = line.to_string();
            if session.interactive {
                session.history.push(line.to_string());
                reader.add_history(line);
            } else if *echo {
                let _ = writeln!(session.out, "{prompt_text}{line}");
            }

            summary.executed += 1;
            match execute_line(dispatcher, defaults, session, line) {
                Ok(()) => {}
                Err(ShellError::Internal(e)) => {
                    error!(error = %e, line, "internal error");
                    return Err(e);
                }
                Err(err) => {
                    summary.failures += 1;
                    if !matches!(err, ShellError::Handled) {
                        report(errors, *colorize, &err.to_string());
                    }
                    if !session.interactive {
                        session.stop_requested = true;
                        summary.stopped_on_error = true;
                    }
                }
            }
            let _ = session.out.flush();
        }

        Ok(summary)
    }
}

fn execute_line<C>(
    dispatcher: Dispatcher<'_, C>,
    defaults: &[Value],
    session: &mut Session<C>,
    line: &str,
) -> ShellResult<()> {
    let (command, args) = dispatcher.resolve_line(line, defaults)?;
    debug!(syntax = command.syntax(), args = args.len(), "invoking handler");
    command.invoke(session, &args)
}

fn report(errors: &mut dyn Write, colorize: bool, message: &str) {
    let text = format!("*** Error: {message}");
    let _ = if colorize {
        writeln!(errors, "{}", text.red())
    } else {
        writeln!(errors, "{text}")
    };
    let _ = errors.flush();
}

/// Writes the session history back when dropped, so early returns and
/// unwinding still persist it.
struct HistoryGuard<'s, C> {
    session: &'s mut Session<C>,
    errors: &'s mut dyn Write,
    colorize: bool,
}

impl<C> Drop for HistoryGuard<'_, C> {
    fn drop(&mut self) {
        if !self.session.interactive {
            return;
        }
        let Some(path) = self.session.history_path.as_deref() else {
            return;
        };
        if let Err(e) = save_history(path, &self.session.history) {
            warn!(path = %path.display(), error = %e, "history save failed");
            report(
                &mut *self.errors,
                self.colorize,
                &format!("Cannot write to history file \"{}\"", path.display()),
            );
        }
    }
}
