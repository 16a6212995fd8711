//! Line readers for the interactive console.
//!
//! By default we use `rustyline` for line editing and tab completion.
//! A minimal prompt-and-read fallback exists for builds without it.

use std::io::{self, BufRead, Write};

use dpctl_shell::{LineReader, ReadOutcome};

/// Prints the prompt, then reads one line. No editing, no completion.
pub struct PromptingReader<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptingReader<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> LineReader for PromptingReader<R, W> {
    fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        Ok(ReadOutcome::Line(line))
    }
}

#[cfg(feature = "repl-rustyline")]
pub use editor::{CompletionHelper, RustylineReader};

#[cfg(feature = "repl-rustyline")]
mod editor {
    use std::cell::RefCell;
    use std::io::{self, Write};

    use dpctl_shell::{current_word, Completion, Dispatcher, LineReader, ReadOutcome};
    use rustyline::completion::{Completer, Pair};
    use rustyline::error::ReadlineError;
    use rustyline::history::DefaultHistory;
    use rustyline::{Context, Editor};

    /// Tab completion backed by the console's own grammar.
    pub struct CompletionHelper<'a, C> {
        dispatcher: Dispatcher<'a, C>,
        prompt: RefCell<String>,
    }

    impl<'a, C> CompletionHelper<'a, C> {
        pub fn new(dispatcher: Dispatcher<'a, C>) -> Self {
            Self {
                dispatcher,
                prompt: RefCell::new(String::new()),
            }
        }

        fn set_prompt(&self, prompt: &str) {
            let mut current = self.prompt.borrow_mut();
            current.clear();
            current.push_str(prompt);
        }
    }

    impl<C> rustyline::Helper for CompletionHelper<'_, C> {}

    impl<C> rustyline::highlight::Highlighter for CompletionHelper<'_, C> {}

    impl<C> rustyline::hint::Hinter for CompletionHelper<'_, C> {
        type Hint = String;
        fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
            None
        }
    }

    impl<C> rustyline::validate::Validator for CompletionHelper<'_, C> {}

    impl<C> Completer for CompletionHelper<'_, C> {
        type Candidate = Pair;

        fn complete(
            &self,
            line: &str,
            pos: usize,
            _ctx: &Context<'_>,
        ) -> rustyline::Result<(usize, Vec<Pair>)> {
            let completion = self
                .dispatcher
                .complete(line, pos)
                .map_err(|e| ReadlineError::Io(io::Error::other(e)))?;

            match completion {
                Completion::Extend(text) => {
                    let start = pos - current_word(&line[..pos]).len();
                    Ok((
                        start,
                        vec![Pair {
                            display: text.clone(),
                            replacement: text,
                        }],
                    ))
                }
                Completion::Listing(text) => {
                    // Show the help block, then put the untouched line back.
                    let mut stdout = io::stdout().lock();
                    write!(stdout, "{text}{}{line}", self.prompt.borrow())?;
                    stdout.flush()?;
                    Ok((pos, Vec::new()))
                }
                Completion::Nothing => Ok((pos, Vec::new())),
            }
        }
    }

    pub struct RustylineReader<'a, C> {
        editor: Editor<CompletionHelper<'a, C>, DefaultHistory>,
    }

    impl<'a, C> RustylineReader<'a, C> {
        pub fn new(dispatcher: Dispatcher<'a, C>) -> rustyline::Result<Self> {
            let mut editor: Editor<CompletionHelper<'a, C>, DefaultHistory> = Editor::new()?;
            editor.set_helper(Some(CompletionHelper::new(dispatcher)));
            Ok(Self { editor })
        }
    }

    impl<C> LineReader for RustylineReader<'_, C> {
        fn read_line(&mut self, prompt: &str) -> io::Result<ReadOutcome> {
            if let Some(helper) = self.editor.helper() {
                helper.set_prompt(prompt);
            }
            match self.editor.readline(prompt) {
                Ok(line) => Ok(ReadOutcome::Line(line)),
                Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
                Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
                Err(ReadlineError::Io(e)) => Err(e),
                Err(e) => Err(io::Error::other(e.to_string())),
            }
        }

        fn add_history(&mut self, line: &str) {
            if let Err(e) = self.editor.add_history_entry(line) {
                tracing::warn!(error = %e, "line editor rejected history entry");
            }
        }
    }
}
