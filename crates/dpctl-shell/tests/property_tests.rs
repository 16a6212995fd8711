mod common;

use common::TestTypes;
use dpctl_shell::{
    longest_common_prefix, match_syntax, CommandTable, Completion, Dispatcher, MatchKind, Session,
    ShellResult, Value,
};
use proptest::prelude::*;

fn noop(_: &mut Session<()>, _: &[Value]) -> ShellResult<()> {
    Ok(())
}

const GRAMMARS: &[&str] = &[
    "show port",
    "show port PORT...",
    "show pipeline",
    "show worker WORKER_ID...",
    "add worker WORKER_ID",
    "daemon connect [HOST] [TCP_PORT]",
];

fn table() -> CommandTable<()> {
    GRAMMARS
        .iter()
        .fold(CommandTable::builder(), |b, syntax| b.command(syntax, "", noop))
        .build()
        .expect("table")
}

fn input_line() -> impl Strategy<Value = String> {
    let word = prop_oneof![
        Just("show".to_string()),
        Just("port".to_string()),
        Just("pipeline".to_string()),
        Just("worker".to_string()),
        Just("add".to_string()),
        Just("daemon".to_string()),
        Just("connect".to_string()),
        "[a-z0-9]{1,6}",
    ];
    (prop::collection::vec(word, 0..5), " {0,2}").prop_map(|(words, tail)| words.join(" ") + &tail)
}

proptest! {
    #[test]
    fn matching_is_deterministic(line in input_line()) {
        let types = TestTypes::new();
        for syntax in GRAMMARS {
            let first = match_syntax(&types, syntax, &line).expect("match");
            let second = match_syntax(&types, syntax, &line).expect("match");
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn nonmatch_offers_nothing(line in input_line()) {
        let types = TestTypes::new();
        for syntax in GRAMMARS {
            let result = match_syntax(&types, syntax, &line).expect("match");
            if result.kind == MatchKind::Nonmatch {
                prop_assert!(result.candidates.is_empty());
                prop_assert!(result.current_token.is_none());
            }
        }
    }

    #[test]
    fn candidates_are_sorted_and_unique(line in input_line()) {
        let types = TestTypes::new();
        for syntax in GRAMMARS {
            let result = match_syntax(&types, syntax, &line).expect("match");
            prop_assert!(result.candidates.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn dispatched_lines_are_full_matches(line in input_line()) {
        let table = table();
        let types = TestTypes::new();
        let dispatcher = Dispatcher::new(&table, &types);
        if let Ok(cmd) = dispatcher.find_command(&line) {
            let finished = format!("{} ", line.trim());
            let result = match_syntax(&types, cmd.syntax(), &finished).expect("match");
            prop_assert_eq!(result.kind, MatchKind::Full);
        }
    }

    #[test]
    fn completion_only_extends_the_current_word(line in input_line()) {
        let table = table();
        let types = TestTypes::new();
        let dispatcher = Dispatcher::new(&table, &types);
        if let Completion::Extend(text) = dispatcher.complete(&line, line.len()).expect("complete") {
            let word = dpctl_shell::current_word(&line);
            prop_assert!(text.starts_with(word));
            prop_assert!(text.len() > word.len());
        }
    }

    #[test]
    fn lcp_is_a_prefix_of_every_item(items in prop::collection::vec("[a-cé]{0,6}", 1..6)) {
        let prefix = longest_common_prefix(items.iter().map(String::as_str));
        for item in &items {
            prop_assert!(item.starts_with(&prefix));
        }
        let longer_still_shared = items
            .iter()
            .all(|item| item.len() > prefix.len() && item[prefix.len()..].chars().next() == items[0][prefix.len()..].chars().next());
        prop_assert!(!longer_still_shared);
    }
}
