mod common;

use common::TestTypes;
use dpctl_shell::{
    match_syntax, CommandTable, Dispatcher, InvalidCommandError, MatchKind, Session, ShellError,
    ShellResult, Value,
};

fn noop(_: &mut Session<()>, _: &[Value]) -> ShellResult<()> {
    Ok(())
}

fn console_table() -> CommandTable<()> {
    CommandTable::builder()
        .command("help", "List available commands", noop)
        .command("show tc", "Show the list of traffic classes", noop)
        .command("show tc worker WORKER_ID...", "Show traffic classes of workers", noop)
        .command("show port", "Show the status of all ports", noop)
        .command("show port PORT...", "Show the status of selected ports", noop)
        .command("show pipeline", "Show the current datapath pipeline", noop)
        .command("show worker", "Show the status of all worker threads", noop)
        .command("delete worker WORKER_ID...", "Delete worker threads", noop)
        .command("add connection PORT PORT [OGATE]", "Connect two ports", noop)
        .command("daemon connect [HOST] [TCP_PORT]", "Connect to the daemon", noop)
        .build()
        .expect("table")
}

#[test]
fn exact_keywords_select_a_unique_command() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let cmd = dispatcher.find_command("show tc").expect("dispatch");
    assert_eq!(cmd.syntax(), "show tc");

    let cmd = dispatcher.find_command("  show tc worker 1  ").expect("dispatch");
    assert_eq!(cmd.syntax(), "show tc worker WORKER_ID...");
}

#[test]
fn prefixes_of_two_keywords_are_partial_with_equal_score() {
    let types = TestTypes::new();
    let port = match_syntax(&types, "show port", "show p").expect("match");
    let pipeline = match_syntax(&types, "show pipeline", "show p").expect("match");

    assert_eq!(port.kind, MatchKind::Partial);
    assert_eq!(pipeline.kind, MatchKind::Partial);
    assert_eq!(port.score, 1);
    assert_eq!(pipeline.score, 1);

    let mut offered: Vec<String> = port.candidates.into_iter().chain(pipeline.candidates).collect();
    offered.sort();
    assert_eq!(offered, vec!["pipeline", "port"]);
}

#[test]
fn unfinished_grammar_is_incomplete() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let err = dispatcher.find_command("show tc worker").expect_err("incomplete");
    let ShellError::InvalidCommand(InvalidCommandError::Incomplete { line, candidates }) = &err else {
        panic!("expected an incomplete command, got {err:?}");
    };
    assert_eq!(line, "show tc worker");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].syntax, "show tc worker WORKER_ID...");
    assert!(err.to_string().starts_with("Incomplete command \"show tc worker\". Candidates:"));
    assert!(err.to_string().contains("Show traffic classes of workers"));
}

#[test]
fn unmatched_line_is_unknown() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    for line in ["bogus", "sx tc", "show tc extra", "sh tc extra"] {
        let err = dispatcher.find_command(line).expect_err(line);
        assert!(
            matches!(err, ShellError::InvalidCommand(InvalidCommandError::Unknown { .. })),
            "{line}: unexpected {err:?}"
        );
    }

    let err = dispatcher.find_command("bogus").expect_err("unknown");
    assert_eq!(err.to_string(), "Unknown command \"bogus\".");
}

#[test]
fn abbreviated_keywords_dispatch() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let cmd = dispatcher.find_command("sh port").expect("dispatch");
    assert_eq!(cmd.syntax(), "show port");

    let cmd = dispatcher.find_command("sh tc").expect("dispatch");
    assert_eq!(cmd.syntax(), "show tc");

    let (cmd, args) = dispatcher.resolve_line("sh tc w 3 1", &[]).expect("resolve");
    assert_eq!(cmd.syntax(), "show tc worker WORKER_ID...");
    assert_eq!(args, vec![Value::IntList(vec![1, 3])]);
}

#[test]
fn abbreviation_shared_by_two_keywords_is_ambiguous() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let err = dispatcher.find_command("show p ").expect_err("ambiguous");
    let ShellError::InvalidCommand(InvalidCommandError::Ambiguous { line, candidates }) = &err else {
        panic!("expected an ambiguous command, got {err:?}");
    };
    assert_eq!(line, "show p");
    let syntaxes: Vec<_> = candidates.iter().map(|c| c.syntax.as_str()).collect();
    assert_eq!(syntaxes, vec!["show port", "show pipeline"]);
}

#[test]
fn exact_keyword_outscores_an_abbreviation() {
    let table = CommandTable::<()>::builder()
        .command("show portal", "", noop)
        .command("show port", "", noop)
        .build()
        .expect("table");
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let cmd = dispatcher.find_command("show port").expect("dispatch");
    assert_eq!(cmd.syntax(), "show port");

    let (top, low) = dispatcher
        .list_matched("show port ", &[MatchKind::Full])
        .expect("rank");
    assert_eq!(top.len(), 1);
    assert_eq!(low.len(), 1);
}

#[test]
fn equally_scored_full_matches_are_ambiguous() {
    let table = CommandTable::<()>::builder()
        .command("show thing WORKER_ID", "by worker", noop)
        .command("show thing PORT", "by port", noop)
        .command("show WORKER_ID PORT", "loosely", noop)
        .build()
        .expect("table");
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let err = dispatcher.find_command("show thing 3").expect_err("ambiguous");
    let ShellError::InvalidCommand(InvalidCommandError::Ambiguous { candidates, .. }) = &err else {
        panic!("expected an ambiguous command, got {err:?}");
    };
    let syntaxes: Vec<_> = candidates.iter().map(|c| c.syntax.as_str()).collect();
    // Best-scored first, lower-scored after for context.
    assert_eq!(
        syntaxes,
        vec!["show thing WORKER_ID", "show thing PORT", "show WORKER_ID PORT"]
    );

    let (top, low) = dispatcher
        .list_matched("show thing 3 ", &[MatchKind::Full])
        .expect("rank");
    assert_eq!(top.len(), 2);
    assert_eq!(low.len(), 1);
}

#[test]
fn repeated_worker_ids_bind_sorted_and_unique() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let (cmd, args) = dispatcher
        .resolve_line("delete worker 3 3 1", &[])
        .expect("resolve");
    assert_eq!(cmd.syntax(), "delete worker WORKER_ID...");
    assert_eq!(args, vec![Value::IntList(vec![1, 3])]);
}

#[test]
fn malformed_variable_is_a_bind_error() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let err = dispatcher
        .resolve_line("add connection pmd0 pmd1 abc", &[])
        .expect_err("bind");
    let ShellError::Bind(bind) = &err else {
        panic!("expected a bind error, got {err:?}");
    };
    assert_eq!(bind.type_name, "gate");
    assert_eq!(bind.description, "gate index of a module");
    assert_eq!(
        err.to_string(),
        "gate index of a module: \"gate\" must be a positive number"
    );
    assert!(err.is_recoverable());
}

#[test]
fn missing_optionals_bind_absent() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    let (_, args) = dispatcher.resolve_line("daemon connect", &[]).expect("resolve");
    assert_eq!(args, vec![Value::Absent, Value::Absent]);

    let (_, args) = dispatcher
        .resolve_line("daemon connect localhost", &[])
        .expect("resolve");
    assert_eq!(args, vec![Value::Str("localhost".into()), Value::Absent]);

    let (_, args) = dispatcher
        .resolve_line("daemon connect localhost 10514", &[])
        .expect("resolve");
    assert_eq!(args, vec![Value::Str("localhost".into()), Value::Int(10514)]);

    let (_, args) = dispatcher
        .resolve_line("add connection pmd0 pmd1", &[])
        .expect("resolve");
    assert_eq!(
        args,
        vec![Value::Str("pmd0".into()), Value::Str("pmd1".into()), Value::Absent]
    );
}

#[test]
fn default_arguments_come_first() {
    let table = console_table();
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);
    let defaults = [Value::Str("ctx".into())];

    let (_, args) = dispatcher.resolve_line("show port pmd1 pmd0", &defaults).expect("resolve");
    assert_eq!(
        args,
        vec![
            Value::Str("ctx".into()),
            Value::List(vec!["pmd0".into(), "pmd1".into()]),
        ]
    );

    let (_, args) = dispatcher.resolve_line("show worker", &defaults).expect("resolve");
    assert_eq!(args, vec![Value::Str("ctx".into())]);
}

#[test]
fn undeclared_type_is_internal() {
    let table = CommandTable::<()>::builder()
        .command("help", "", noop)
        .command("show mystery MYSTERY", "", noop)
        .build()
        .expect("table");
    let types = TestTypes::new();
    let dispatcher = Dispatcher::new(&table, &types);

    // Lines that never reach the bad token are unaffected.
    assert!(dispatcher.find_command("help").is_ok());

    let err = dispatcher.find_command("show mystery x").expect_err("internal");
    assert!(matches!(err, ShellError::Internal(_)));
    assert!(!err.is_recoverable());
}
