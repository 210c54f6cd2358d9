use srpatch::{
    find_similar_lines, format_failure, format_failure_report, FailedEdit, FailureReason, Fence,
    FileEdit, SIMILAR_LINES_THRESHOLD, SUGGESTION_MARGIN,
};

fn numbered_lines(count: usize) -> String {
    (0..count).map(|i| format!("line {i}\n")).collect()
}

#[test]
fn test_similar_lines_anchored_window_is_shown_exactly() {
    let content = "fn a() {\n    one();\n}\n\nfn b() {\n    two();\n}\n";
    let suggestion = find_similar_lines("fn b() {\n    tw0();\n}\n", content).unwrap();
    assert_eq!(suggestion.start_index, 4);
    assert_eq!(suggestion.lines, vec!["fn b() {", "    two();", "}"]);
    assert!(suggestion.score >= 0.6);
}

#[test]
fn test_similar_lines_unanchored_window_gets_margin() {
    let content = numbered_lines(20);
    let search = "line 10 changed\nline 11\nline 12\nline 13\n";
    let suggestion = find_similar_lines(search, &content).unwrap();
    assert_eq!(suggestion.start_index, 10 - SUGGESTION_MARGIN);
    let expected: Vec<String> = (5..19).map(|i| format!("line {i}")).collect();
    assert_eq!(suggestion.lines, expected);
}

#[test]
fn test_similar_lines_margin_is_clamped_to_file() {
    let content = "alpha\nbeta\ngamma\ndelta\n";
    let suggestion = find_similar_lines("alpha\nbeta\ngamma\ndelta changed\n", content).unwrap();
    assert_eq!(suggestion.start_index, 0);
    assert_eq!(suggestion.lines, vec!["alpha", "beta", "gamma", "delta"]);
}

#[test]
fn test_similar_lines_prefers_first_of_equal_windows() {
    let content = "x = 1\ny = 2\nz = 3\nx = 1\ny = 2\nz = 3\n";
    let suggestion = find_similar_lines("x = 1\ny = 3\nz = 3\n", content).unwrap();
    assert_eq!(suggestion.start_index, 0);
    assert_eq!(suggestion.lines, vec!["x = 1", "y = 2", "z = 3"]);
}

#[test]
fn test_similar_lines_in_large_file() {
    let content: String = (0..3000)
        .map(|i| format!("let value_{i} = compute({i});\n"))
        .collect();
    let search: String = (1500..1540)
        .map(|i| {
            if i % 4 == 1 {
                format!("let value_{i} = compute({i} + 1);\n")
            } else {
                format!("let value_{i} = compute({i});\n")
            }
        })
        .collect();

    let suggestion = find_similar_lines(&search, &content).unwrap();
    assert_eq!(suggestion.start_index, 1500);
    assert_eq!(suggestion.lines.len(), 40);
    assert!(suggestion
        .lines
        .contains(&"let value_1520 = compute(1520);".to_string()));
    assert!(suggestion.score >= SIMILAR_LINES_THRESHOLD);

    let unrelated = "fn main() {\n    println!(\"hi\");\n}\n";
    assert!(find_similar_lines(unrelated, &content).is_none());
}

#[test]
fn test_similar_lines_below_threshold_is_none() {
    assert!(find_similar_lines("completely unrelated\n", "abc\nxyz\n").is_none());
}

#[test]
fn test_similar_lines_longer_than_file_is_none() {
    assert!(find_similar_lines("a\nb\nc\n", "a\nb\n").is_none());
    assert!(find_similar_lines("", "a\nb\n").is_none());
}

#[test]
fn test_failure_report_for_single_edit() {
    let edit = FileEdit::new(
        "src/app.py",
        "def run():\n    retrun 1\n",
        "def run():\n    return 2\n",
    );
    let content = "import os\n\ndef run():\n    return 1\n";
    let failure = FailedEdit {
        edit: &edit,
        reason: FailureReason::NoMatch,
        content: Some(content),
    };
    let report = format_failure(&failure, &Fence::default());

    assert!(report.starts_with(
        "## SearchReplaceNoExactMatch: This SEARCH block failed to exactly match lines in src/app.py\n"
    ));
    assert!(report.contains(
        "<<<<<<< SEARCH\ndef run():\n    retrun 1\n=======\ndef run():\n    return 2\n>>>>>>> REPLACE\n"
    ));
    assert!(report.contains("Did you mean to match some of these actual lines from src/app.py?"));
    // The first line matches but the last does not, so the whole (short) file
    // is shown as context.
    assert!(report.contains("```\nimport os\n\ndef run():\n    return 1\n```"));
    assert!(!report.contains("already in"));
}

#[test]
fn test_failure_report_notes_replace_text_already_present() {
    let edit = FileEdit::new("notes.txt", "draft\n", "final\n");
    let failure = FailedEdit {
        edit: &edit,
        reason: FailureReason::NoMatch,
        content: Some("final\n"),
    };
    let report = format_failure(&failure, &Fence::default());
    assert!(report.contains("Are you sure you need this SEARCH/REPLACE block?"));
    assert!(report.contains("The REPLACE lines are already in notes.txt!"));
}

#[test]
fn test_failure_report_for_missing_file() {
    let edit = FileEdit::new("ghost.rs", "fn ghost() {}\n", "");
    let failure = FailedEdit {
        edit: &edit,
        reason: FailureReason::MissingFile,
        content: None,
    };
    let report = format_failure(&failure, &Fence::default());
    assert!(report.contains("ghost.rs, which does not exist"));
    assert!(!report.contains("Did you mean"));
}

#[test]
fn test_aggregated_report_counts_and_footer() {
    let first = FileEdit::new("a.txt", "x\n", "y\n");
    let second = FileEdit::new("b.txt", "p\n", "q\n");
    let failures = [
        FailedEdit {
            edit: &first,
            reason: FailureReason::NoMatch,
            content: Some("unrelated\n"),
        },
        FailedEdit {
            edit: &second,
            reason: FailureReason::NoMatch,
            content: Some("unrelated\n"),
        },
    ];
    let report = format_failure_report(&failures, 3, &Fence::default());

    assert!(report.starts_with("# 2 SEARCH/REPLACE blocks failed to match!\n"));
    assert!(report.contains("lines in a.txt"));
    assert!(report.contains("lines in b.txt"));
    assert!(report.contains("The SEARCH section must exactly match an existing block of lines"));
    assert!(report.contains("# The other 3 SEARCH/REPLACE blocks were applied successfully."));
    assert!(report.contains("Don't re-send them."));
}

#[test]
fn test_aggregated_report_without_successes_has_no_footer() {
    let edit = FileEdit::new("a.txt", "x\n", "y\n");
    let failures = [FailedEdit {
        edit: &edit,
        reason: FailureReason::NoMatch,
        content: Some("z\n"),
    }];
    let report = format_failure_report(&failures, 0, &Fence::default());
    assert!(report.starts_with("# 1 SEARCH/REPLACE block failed to match!\n"));
    assert!(!report.contains("applied successfully"));
}
