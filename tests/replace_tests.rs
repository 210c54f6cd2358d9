use indoc::indoc;
use srpatch::{
    replace_chunk, replace_most_similar_chunk, strip_quoted_wrapping, Fence, MatchStrategy,
};
use std::path::Path;

fn replace(whole: &str, part: &str, updated: &str) -> Option<(String, MatchStrategy)> {
    replace_most_similar_chunk(whole, part, updated).map(|r| (r.content, r.strategy))
}

// --- Exact matching ---

#[test]
fn test_exact_match_changes_only_the_matched_region() {
    let whole = indoc! {"
        fn one() {}

        fn two() {
            old();
        }

        fn three() {}
    "};
    let (content, strategy) = replace(
        whole,
        "fn two() {\n    old();\n}\n",
        "fn two() {\n    new();\n}\n",
    )
    .unwrap();
    assert_eq!(strategy, MatchStrategy::Exact);
    assert_eq!(content, whole.replace("old();", "new();"));
}

#[test]
fn test_reapplying_an_edit_fails() {
    let whole = "alpha\nbeta\ngamma\n";
    let (content, _) = replace(whole, "beta\n", "BETA\n").unwrap();
    assert_eq!(content, "alpha\nBETA\ngamma\n");
    assert!(replace(&content, "beta\n", "BETA\n").is_none());
}

#[test]
fn test_identical_edit_can_be_reapplied() {
    let whole = "alpha\nbeta\n";
    let (content, _) = replace(whole, "beta\n", "beta\n").unwrap();
    assert_eq!(content, whole);
    assert!(replace(&content, "beta\n", "beta\n").is_some());
}

#[test]
fn test_exact_match_is_line_aligned() {
    // "run" is a substring of "running();" but not a whole line of it.
    assert!(replace("    running();\n", "run\n", "walk\n").is_none());
}

#[test]
fn test_exact_match_is_tried_before_whitespace_match() {
    let (content, strategy) = replace("foo\n  foo\n", "  foo\n", "  bar\n").unwrap();
    assert_eq!(strategy, MatchStrategy::Exact);
    assert_eq!(content, "foo\n  bar\n");
}

#[test]
fn test_missing_trailing_newline_is_added() {
    let (content, _) = replace("a\nb", "b", "c").unwrap();
    assert_eq!(content, "a\nc\n");
}

#[test]
fn test_crlf_terminators_are_preserved() {
    let (content, _) = replace("a\r\nb\r\n", "a\r\n", "x\r\n").unwrap();
    assert_eq!(content, "x\r\nb\r\n");
}

// --- Leading blank line ---

#[test]
fn test_spurious_leading_blank_line_is_skipped() {
    let (content, strategy) = replace("x\nfoo\nbar\n", "\nfoo\nbar\n", "baz\n").unwrap();
    assert_eq!(strategy, MatchStrategy::SkipLeadingBlankLine);
    assert_eq!(content, "x\nbaz\n");
}

// --- Leading whitespace ---

#[test]
fn test_missing_indentation_is_restored() {
    let (content, strategy) = replace("  a\n  b\n", "a\nb\n", "x\n").unwrap();
    assert_eq!(strategy, MatchStrategy::LeadingWhitespace);
    assert_eq!(content, "  x\n");
}

#[test]
fn test_relative_indentation_is_kept_when_reindenting() {
    let whole = indoc! {"
        fn f() {
            if x {
                y();
            }
        }
    "};
    let part = indoc! {"
        if x {
            y();
        }
    "};
    let updated = indoc! {"
        if x {
            z();
        }
    "};
    let (content, strategy) = replace(whole, part, updated).unwrap();
    assert_eq!(strategy, MatchStrategy::LeadingWhitespace);
    assert_eq!(content, whole.replace("y();", "z();"));
}

#[test]
fn test_common_indentation_of_edit_is_removed_first() {
    let whole = "def f():\n\treturn 1\n";
    let (content, _) = replace(whole, "        return 1\n", "        return 2\n").unwrap();
    assert_eq!(content, "def f():\n\treturn 2\n");
}

#[test]
fn test_extra_indentation_in_search_is_removed() {
    let (content, strategy) = replace("a\n", "    a\n", "b\n").unwrap();
    assert_eq!(strategy, MatchStrategy::LeadingWhitespace);
    assert_eq!(content, "b\n");
}

#[test]
fn test_outdent_keeps_relative_indentation() {
    let whole = indoc! {"
        fn a() {
            one();
        }
    "};
    let part = "    fn a() {\n        one();\n    }\n";
    let updated = "    fn a() {\n        two();\n    }\n\nfn b() {}\n";
    let (content, strategy) = replace(whole, part, updated).unwrap();
    assert_eq!(strategy, MatchStrategy::LeadingWhitespace);
    assert_eq!(content, "fn a() {\n    two();\n}\n\nfn b() {}\n");
}

#[test]
fn test_mixed_indent_and_outdent_does_not_match() {
    assert!(replace("a\n    b\n", "  a\n  b\n", "x\ny\n").is_none());
}

#[test]
fn test_non_uniform_indentation_does_not_match() {
    assert!(replace("  a\n    b\n", "a\nb\n", "x\ny\n").is_none());
}

// --- Trailing blank lines ---

#[test]
fn test_trailing_blank_lines_are_ignored() {
    let (content, strategy) = replace("a\nb\n", "b\n\n\n", "c\n\n").unwrap();
    assert_eq!(strategy, MatchStrategy::TrailingBlankLines);
    assert_eq!(content, "a\nc\n");
}

// --- Ellipsis ---

#[test]
fn test_ellipsis_segments_are_replaced_independently() {
    let (content, strategy) = replace("a\nb\nc\n", "a\n...\nc\n", "a2\n...\nc2\n").unwrap();
    assert_eq!(strategy, MatchStrategy::Ellipsis);
    assert_eq!(content, "a2\nb\nc2\n");
}

#[test]
fn test_ambiguous_ellipsis_segment_fails_entirely() {
    assert!(replace("a\nb\na\nc\n", "a\n...\nc\n", "a2\n...\nc2\n").is_none());
}

#[test]
fn test_ellipsis_with_unequal_segment_counts_does_not_apply() {
    assert!(replace("a\nb\nc\n", "a\n...\nc\n", "a2\nc2\n").is_none());
}

#[test]
fn test_ellipsis_with_empty_search_segment_appends() {
    let (content, strategy) = replace("a\nb\nc\n", "a\n...\n", "a\n...\nd\n").unwrap();
    assert_eq!(strategy, MatchStrategy::Ellipsis);
    assert_eq!(content, "a\nb\nc\nd\n");
}

// --- Whole-edit entry point ---

#[test]
fn test_blank_search_appends_to_existing_file() {
    let result = replace_chunk(
        Some("first"),
        Path::new("log.txt"),
        "",
        "second\n",
        &Fence::default(),
    )
    .unwrap();
    assert_eq!(result.strategy, MatchStrategy::Append);
    assert_eq!(result.content, "first\nsecond\n");
}

#[test]
fn test_append_inserts_newline_only_when_missing() {
    let fence = Fence::default();
    let path = Path::new("log.txt");
    let terminated = replace_chunk(Some("first\n"), path, "", "second\n", &fence).unwrap();
    assert_eq!(terminated.content, "first\nsecond\n");
    let empty = replace_chunk(Some(""), path, "\n", "second\n", &fence).unwrap();
    assert_eq!(empty.content, "second\n");
}

#[test]
fn test_blank_search_creates_missing_file() {
    let result = replace_chunk(
        None,
        Path::new("new.txt"),
        "",
        "hello\n",
        &Fence::default(),
    )
    .unwrap();
    assert_eq!(result.content, "hello\n");
    assert_eq!(result.strategy, MatchStrategy::Append);
}

#[test]
fn test_non_blank_search_against_missing_file_fails() {
    assert!(replace_chunk(
        None,
        Path::new("missing.txt"),
        "something\n",
        "else\n",
        &Fence::default(),
    )
    .is_none());
}

#[test]
fn test_quoted_wrapping_is_stripped_before_matching() {
    let result = replace_chunk(
        Some("one\ntwo\n"),
        Path::new("src/nums.txt"),
        "nums.txt\n```\ntwo\n```\n",
        "```\nthree\n```\n",
        &Fence::default(),
    )
    .unwrap();
    assert_eq!(result.content, "one\nthree\n");
}

#[test]
fn test_strip_quoted_wrapping() {
    let fence = Fence::default();
    let path = Some(Path::new("src/lib.rs"));
    assert_eq!(
        strip_quoted_wrapping("lib.rs\n```rust\nfn a() {}\n```\n", path, &fence),
        "fn a() {}\n"
    );
    assert_eq!(strip_quoted_wrapping("fn a() {}", path, &fence), "fn a() {}\n");
    assert_eq!(strip_quoted_wrapping("", path, &fence), "");
    // Only one layer is removed.
    assert_eq!(
        strip_quoted_wrapping("```\n```\ninner\n```\n```\n", None, &fence),
        "```\ninner\n```\n"
    );
}

#[test]
fn test_strip_quoted_wrapping_with_custom_fence() {
    let fence = Fence::new("<source>", "</source>");
    assert_eq!(
        strip_quoted_wrapping("<source>\nx = 1\n</source>\n", None, &fence),
        "x = 1\n"
    );
}
