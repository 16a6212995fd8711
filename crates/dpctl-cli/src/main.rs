//! dpctl command-line entry point.

use std::fs::File;
use std::io::{self, BufReader, Cursor, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dpctl_cli::terminal::EchoCtlGuard;
use dpctl_cli::{command_table, prompt, Console, ControlPlane, OfflineControlPlane, StandardTypes, BANNER};
use dpctl_shell::{BatchReader, Dispatcher, LineReader, Repl, RunReport};
use tracing_subscriber::EnvFilter;

const HISTORY_FILE: &str = ".dpctl_history";

#[derive(Parser)]
#[command(name = "dpctl")]
#[command(author, version, about = "Control console for the dataplane daemon")]
struct Cli {
    /// Run commands from FILE, one per line ("-" reads stdin)
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// History file for interactive sessions [default: ~/.dpctl_history]
    #[arg(long, value_name = "PATH")]
    history: Option<PathBuf>,

    /// Do not load or save command history
    #[arg(long)]
    no_history: bool,

    /// Force interactive mode
    #[arg(long, conflicts_with = "batch")]
    interactive: bool,

    /// Force batch mode, reading commands from stdin
    #[arg(long)]
    batch: bool,

    /// Print each batch line after the prompt before running it
    #[arg(long)]
    echo: bool,

    /// Log filter, e.g. "debug" or "dpctl_shell=trace" [default: $RUST_LOG or "warn"]
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,

    /// A command to run; separate several with "--"
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    words: Vec<String>,
}

impl Cli {
    /// Commands given on the command line, split at each "--".
    fn inline_commands(&self) -> Vec<String> {
        self.words
            .split(|w| w == "--")
            .map(|words| words.join(" "))
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    fn is_interactive(&self) -> bool {
        if self.interactive {
            return true;
        }
        if self.batch || self.script.is_some() || !self.words.is_empty() {
            return false;
        }
        io::stdin().is_terminal() && io::stdout().is_terminal()
    }

    fn history_path(&self) -> Option<PathBuf> {
        if self.no_history {
            return None;
        }
        self.history
            .clone()
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(HISTORY_FILE)))
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn batch_source(cli: &Cli) -> Result<Box<dyn LineReader>> {
    if let Some(path) = &cli.script {
        if path.as_os_str() == "-" {
            return Ok(Box::new(BatchReader::new(io::stdin().lock())));
        }
        let file = File::open(path).with_context(|| format!("cannot open script {}", path.display()))?;
        return Ok(Box::new(BatchReader::new(BufReader::new(file))));
    }
    let inline = cli.inline_commands();
    if !inline.is_empty() {
        let text = inline.join("\n") + "\n";
        return Ok(Box::new(BatchReader::new(Cursor::new(text.into_bytes()))));
    }
    Ok(Box::new(BatchReader::new(io::stdin().lock())))
}

#[cfg(feature = "repl-rustyline")]
fn interactive_source<'a, C: 'a>(dispatcher: Dispatcher<'a, C>) -> Result<Box<dyn LineReader + 'a>> {
    let reader = dpctl_cli::line_editor::RustylineReader::new(dispatcher)
        .map_err(|e| anyhow::anyhow!("failed to init rustyline: {e}"))?;
    Ok(Box::new(reader))
}

#[cfg(not(feature = "repl-rustyline"))]
fn interactive_source<'a, C: 'a>(_dispatcher: Dispatcher<'a, C>) -> Result<Box<dyn LineReader + 'a>> {
    Ok(Box::new(dpctl_cli::line_editor::PromptingReader::new(
        io::stdin().lock(),
        io::stdout(),
    )))
}

fn run(cli: &Cli) -> Result<RunReport> {
    let control: Rc<dyn ControlPlane> = Rc::new(OfflineControlPlane::new());
    let types = StandardTypes::new(control.clone())?;
    let table = command_table()?;
    let dispatcher = Dispatcher::new(&table, &types);

    let interactive = cli.is_interactive();
    let colorize = io::stderr().is_terminal();
    let mut repl = Repl::new(dispatcher, Console::new(control))
        .interactive(interactive)
        .prompt(prompt)
        .banner(BANNER.green().to_string())
        .colorize(colorize)
        .echo(cli.echo);

    let report = if interactive {
        repl = repl.history_path(cli.history_path());
        let _echoctl = EchoCtlGuard::new();
        let mut reader = interactive_source(dispatcher)?;
        repl.run(reader.as_mut())?
    } else {
        let mut reader = batch_source(cli)?;
        repl.run(reader.as_mut())?
    };
    Ok(report)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(&cli) {
        Ok(report) if report.success() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            eprintln!("{} {e:#}", "*** Fatal:".red().bold());
            ExitCode::from(2)
        }
    }
}
