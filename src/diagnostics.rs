//! Human-readable reports for edits that could not be applied.

use std::fmt::Write as _;

use log::trace;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::FailureReason;
use crate::parser::{FileEdit, Fence};
use crate::similarity::{combine, line_similarity, word_similarity};

/// A suggestion is only shown when its window scores at least this much.
pub const SIMILAR_LINES_THRESHOLD: f64 = 0.6;

/// Lines of surrounding context shown around a suggestion whose first and
/// last lines do not match the SEARCH text exactly.
pub const SUGGESTION_MARGIN: usize = 5;

/// The region of a file that most resembles an edit's SEARCH text.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilaritySuggestion {
    /// 0-based index of the first line shown.
    pub start_index: usize,
    /// The lines shown, without terminators.
    pub lines: Vec<String>,
    /// Similarity of the best window to the SEARCH text (0.0 to 1.0).
    pub score: f64,
}

/// Finds the window of `content` most similar to `search`.
///
/// Every window with as many lines as `search` is a candidate, scored with
/// [`window_similarity`](crate::window_similarity()); the first window with
/// the highest score wins. Nothing is returned when that score is below
/// [`SIMILAR_LINES_THRESHOLD`]. If the best window starts and ends with the
/// same lines as `search`, exactly that window is returned; otherwise it is
/// widened by [`SUGGESTION_MARGIN`] lines on each side.
///
/// Only the line ratio is computed for every window. Windows are then visited
/// from the best line ratio down, and the word ratio is computed only while a
/// window could still reach the best score found so far. The result is the
/// same as scoring every window in full.
///
/// # Example
///
/// ```
/// # use srpatch::find_similar_lines;
/// let content = "fn a() {\n    one();\n}\n\nfn b() {\n    two();\n}\n";
/// let suggestion = find_similar_lines("fn b() {\n    tw0();\n}\n", content).unwrap();
/// assert_eq!(suggestion.start_index, 4);
/// assert_eq!(suggestion.lines, vec!["fn b() {", "    two();", "}"]);
/// ```
pub fn find_similar_lines(search: &str, content: &str) -> Option<SimilaritySuggestion> {
    let search_lines: Vec<&str> = search.lines().collect();
    let content_lines: Vec<&str> = content.lines().collect();
    let len = search_lines.len();
    if len == 0 || len > content_lines.len() {
        return None;
    }

    #[cfg(feature = "parallel")]
    let line_scores: Vec<f64> = content_lines
        .par_windows(len)
        .map(|window| line_similarity(window, &search_lines[..]))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let line_scores: Vec<f64> = content_lines
        .windows(len)
        .map(|window| line_similarity(window, &search_lines[..]))
        .collect();

    let mut order: Vec<usize> = (0..line_scores.len()).collect();
    order.sort_by(|&a, &b| line_scores[b].total_cmp(&line_scores[a]).then(a.cmp(&b)));

    let mut best: Option<(usize, f64)> = None;
    let mut evaluated = 0;
    for index in order {
        let floor = best.map_or(SIMILAR_LINES_THRESHOLD, |(_, score)| score);
        // A perfect word ratio is the most this window can add.
        if combine(line_scores[index], 1.0) < floor {
            break;
        }
        evaluated += 1;
        let window = &content_lines[index..index + len];
        let score = combine(line_scores[index], word_similarity(window, &search_lines[..]));
        let better = match best {
            None => score >= SIMILAR_LINES_THRESHOLD,
            Some((best_index, best_score)) => {
                score > best_score || (score == best_score && index < best_index)
            }
        };
        if better {
            best = Some((index, score));
        }
    }
    trace!(
        "    Scored {} of {} windows in full for a {}-line SEARCH.",
        evaluated,
        line_scores.len(),
        len
    );

    let (best_index, best_score) = best?;
    trace!(
        "    Most similar window starts at line {} (score {:.3}).",
        best_index + 1,
        best_score
    );

    let best_window = &content_lines[best_index..best_index + len];
    let anchored =
        best_window[0] == search_lines[0] && best_window[len - 1] == search_lines[len - 1];
    let (start, end) = if anchored {
        (best_index, best_index + len)
    } else {
        (
            best_index.saturating_sub(SUGGESTION_MARGIN),
            (best_index + len + SUGGESTION_MARGIN).min(content_lines.len()),
        )
    };

    Some(SimilaritySuggestion {
        start_index: start,
        lines: content_lines[start..end]
            .iter()
            .map(|line| line.to_string())
            .collect(),
        score: best_score,
    })
}

/// A failed edit together with the file content it was tried against.
#[derive(Debug, Clone, Copy)]
pub struct FailedEdit<'a> {
    pub edit: &'a FileEdit,
    pub reason: FailureReason,
    /// The content of the target file, or `None` if it does not exist.
    pub content: Option<&'a str>,
}

/// Formats the report for a single failed edit.
///
/// The report repeats the edit in SEARCH/REPLACE form, shows the most similar
/// lines of the file when there are any, and points out when the REPLACE
/// text is already present in the file.
pub fn format_failure(failure: &FailedEdit<'_>, fence: &Fence) -> String {
    let FailedEdit {
        edit,
        reason,
        content,
    } = *failure;
    let path = edit.path.display();
    let mut report = String::new();

    match reason {
        FailureReason::NoMatch => {
            let _ = writeln!(
                report,
                "## SearchReplaceNoExactMatch: This SEARCH block failed to exactly match lines in {path}"
            );
        }
        FailureReason::MissingFile => {
            let _ = writeln!(
                report,
                "## SearchReplaceNoExactMatch: This SEARCH block targets {path}, which does not exist"
            );
        }
    }
    let _ = write!(
        report,
        "<<<<<<< SEARCH\n{}=======\n{}>>>>>>> REPLACE\n\n",
        with_newline(&edit.original),
        with_newline(&edit.updated)
    );

    let Some(content) = content else {
        return report;
    };

    if let Some(suggestion) = find_similar_lines(&edit.original, content) {
        let _ = write!(
            report,
            "Did you mean to match some of these actual lines from {path}?\n\n{}\n{}\n{}\n\n",
            fence.open,
            suggestion.lines.join("\n"),
            fence.close
        );
    }

    if !edit.updated.is_empty() && content.contains(edit.updated.as_str()) {
        let _ = write!(
            report,
            "Are you sure you need this SEARCH/REPLACE block?\nThe REPLACE lines are already in {path}!\n\n"
        );
    }

    report
}

/// Formats the aggregated report for a batch in which some edits failed.
///
/// `applied` is the number of edits in the same batch that did apply.
pub fn format_failure_report(
    failures: &[FailedEdit<'_>],
    applied: usize,
    fence: &Fence,
) -> String {
    let blocks = if failures.len() == 1 { "block" } else { "blocks" };
    let mut report = format!(
        "# {} SEARCH/REPLACE {} failed to match!\n",
        failures.len(),
        blocks
    );
    for failure in failures {
        report.push('\n');
        report.push_str(&format_failure(failure, fence));
    }

    report.push_str(
        "The SEARCH section must exactly match an existing block of lines including all white space, comments, indentation, docstrings, etc\n",
    );

    if applied > 0 {
        let applied_blocks = if applied == 1 { "block was" } else { "blocks were" };
        let _ = write!(
            report,
            "\n# The other {applied} SEARCH/REPLACE {applied_blocks} applied successfully.\nDon't re-send them.\nJust reply with fixed versions of the {blocks} above that failed to match.\n"
        );
    }
    report
}

fn with_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

