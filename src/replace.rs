//! Locating the SEARCH text of an edit in the current file and splicing in
//! the REPLACE text.
//!
//! All matching is line based. Lines keep their terminators, so joining a
//! slice of lines gives back the exact text it came from.

use std::fmt;
use std::path::Path;

use log::{debug, trace};

use crate::parser::Fence;

/// Describes how an edit was located and applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// The SEARCH section was blank; the REPLACE text was appended (or became
    /// the content of a new file).
    Append,
    /// A byte-for-byte run of lines.
    Exact,
    /// An exact match after dropping a spurious blank first line of SEARCH.
    SkipLeadingBlankLine,
    /// A match that ignores leading whitespace, provided every line of the
    /// match is indented more (or less) than the SEARCH text by the same
    /// amount. The REPLACE text is shifted the same way.
    LeadingWhitespace,
    /// An exact match after trimming trailing blank lines.
    TrailingBlankLines,
    /// A piecewise match of the sections between `...` lines.
    Ellipsis,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStrategy::Append => "append",
            MatchStrategy::Exact => "exact",
            MatchStrategy::SkipLeadingBlankLine => "exact (skipping leading blank line)",
            MatchStrategy::LeadingWhitespace => "leading whitespace",
            MatchStrategy::TrailingBlankLines => "exact (ignoring trailing blank lines)",
            MatchStrategy::Ellipsis => "elided sections",
        };
        f.write_str(name)
    }
}

/// The content produced by a successful replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// The complete new content of the file.
    pub content: String,
    /// The strategy that located the SEARCH text.
    pub strategy: MatchStrategy,
}

type StrategyFn = fn(&[&str], &[&str], &[&str]) -> Option<String>;

/// The matching strategies, in the order they are tried.
const STRATEGIES: [(MatchStrategy, StrategyFn); 5] = [
    (MatchStrategy::Exact, exact_match),
    (MatchStrategy::SkipLeadingBlankLine, skip_leading_blank_line),
    (MatchStrategy::LeadingWhitespace, leading_whitespace_match),
    (MatchStrategy::TrailingBlankLines, trailing_blank_lines_match),
    (MatchStrategy::Ellipsis, ellipsis_match),
];

/// Applies one edit to the current content of `path`.
///
/// `current` is `None` when the file does not exist. Before matching, one
/// layer of quoting is removed from `original` and `updated` (see
/// [`strip_quoted_wrapping`]). A blank `original` appends `updated` to the
/// content, treating a missing file as empty. Otherwise the strategies of
/// [`replace_most_similar_chunk`] are tried in order.
///
/// When appending to content that does not end with a newline, a newline is
/// inserted first so the appended text starts on a line of its own.
///
/// Returns `None` when the edit cannot be applied, including when the file
/// is missing and `original` is not blank.
///
/// # Example
///
/// ```
/// # use std::path::Path;
/// # use srpatch::{replace_chunk, Fence, MatchStrategy};
/// let current = "fn main() {\n    run();\n}\n";
/// let result = replace_chunk(
///     Some(current),
///     Path::new("src/main.rs"),
///     "run();\n",
///     "run_fast();\n",
///     &Fence::default(),
/// )
/// .unwrap();
///
/// assert_eq!(result.content, "fn main() {\n    run_fast();\n}\n");
/// assert_eq!(result.strategy, MatchStrategy::LeadingWhitespace);
/// ```
pub fn replace_chunk(
    current: Option<&str>,
    path: &Path,
    original: &str,
    updated: &str,
    fence: &Fence,
) -> Option<Replacement> {
    let original = strip_quoted_wrapping(original, Some(path), fence);
    let updated = strip_quoted_wrapping(updated, Some(path), fence);
    let is_append = original.trim().is_empty();

    let current = match current {
        Some(content) => content,
        None if is_append => {
            trace!("  '{}' does not exist; creating it.", path.display());
            ""
        }
        None => {
            trace!("  '{}' does not exist and SEARCH is not blank.", path.display());
            return None;
        }
    };

    if is_append {
        let mut content = current.to_string();
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(&updated);
        return Some(Replacement {
            content,
            strategy: MatchStrategy::Append,
        });
    }

    replace_most_similar_chunk(current, &original, &updated)
}

/// Replaces `part` with `replace` in `whole`, trying each matching strategy
/// in a fixed order and returning the first success.
///
/// All three texts are given a trailing newline if they lack one, so the
/// result always ends with a newline.
///
/// 1. [`MatchStrategy::Exact`]
/// 2. [`MatchStrategy::SkipLeadingBlankLine`]
/// 3. [`MatchStrategy::LeadingWhitespace`]
/// 4. [`MatchStrategy::TrailingBlankLines`]
/// 5. [`MatchStrategy::Ellipsis`]
pub fn replace_most_similar_chunk(whole: &str, part: &str, replace: &str) -> Option<Replacement> {
    let whole = with_trailing_newline(whole);
    let part = with_trailing_newline(part);
    let replace = with_trailing_newline(replace);

    let whole_lines: Vec<&str> = whole.split_inclusive('\n').collect();
    let part_lines: Vec<&str> = part.split_inclusive('\n').collect();
    let replace_lines: Vec<&str> = replace.split_inclusive('\n').collect();

    if part_lines.is_empty() {
        return None;
    }

    for (strategy, attempt) in STRATEGIES {
        trace!("    Attempting {} match...", strategy);
        if let Some(content) = attempt(&whole_lines, &part_lines, &replace_lines) {
            debug!("    Matched using the {} strategy.", strategy);
            return Some(Replacement { content, strategy });
        }
    }

    debug!("    No strategy located the SEARCH text.");
    None
}

/// Removes one layer of quoting from a SEARCH or REPLACE section.
///
/// Models sometimes repeat the filename as the first line of a section, or
/// wrap the section in its own fence. A first line equal to the base name of
/// `path` is dropped, then a first/last line pair that opens and closes
/// `fence` is dropped. The result ends with a newline unless it is empty.
///
/// # Example
///
/// ```
/// # use std::path::Path;
/// # use srpatch::{strip_quoted_wrapping, Fence};
/// let text = "lib.rs\n```rust\nfn a() {}\n```\n";
/// let stripped = strip_quoted_wrapping(text, Some(Path::new("src/lib.rs")), &Fence::default());
/// assert_eq!(stripped, "fn a() {}\n");
/// ```
pub fn strip_quoted_wrapping(text: &str, path: Option<&Path>, fence: &Fence) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut lines: Vec<&str> = text.split_inclusive('\n').collect();

    let base_name = path
        .and_then(|p| p.file_name())
        .and_then(|name| name.to_str());
    if let Some(name) = base_name {
        if lines.first().is_some_and(|first| first.trim() == name) {
            lines.remove(0);
        }
    }

    if lines.len() >= 2
        && lines[0].starts_with(fence.open.as_str())
        && lines[lines.len() - 1].starts_with(fence.close.as_str())
    {
        lines = lines[1..lines.len() - 1].to_vec();
    }

    with_trailing_newline(&lines.concat())
}

fn with_trailing_newline(text: &str) -> String {
    let mut text = text.to_string();
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Width in bytes of the run of spaces and tabs that starts `line`.
fn leading_width(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

fn splice(whole: &[&str], start: usize, len: usize, replace: &[&str]) -> String {
    let mut content = whole[..start].concat();
    content.push_str(&replace.concat());
    content.push_str(&whole[start + len..].concat());
    content
}

fn find_exact(whole: &[&str], part: &[&str]) -> Option<usize> {
    if part.is_empty() || part.len() > whole.len() {
        return None;
    }
    whole.windows(part.len()).position(|window| window == part)
}

fn exact_match(whole: &[&str], part: &[&str], replace: &[&str]) -> Option<String> {
    let start = find_exact(whole, part)?;
    trace!("      Exact match at line {}.", start + 1);
    Some(splice(whole, start, part.len(), replace))
}

fn skip_leading_blank_line(whole: &[&str], part: &[&str], replace: &[&str]) -> Option<String> {
    if part.len() <= 2 || !is_blank(part[0]) {
        return None;
    }
    exact_match(whole, &part[1..], replace)
}

fn leading_whitespace_match(whole: &[&str], part: &[&str], replace: &[&str]) -> Option<String> {
    let common = part
        .iter()
        .chain(replace)
        .filter(|line| !is_blank(line))
        .map(|line| leading_width(line))
        .min()
        .unwrap_or(0);
    let dedent = |line: &&str| -> String {
        if is_blank(line) {
            line.to_string()
        } else {
            line[common..].to_string()
        }
    };
    let part: Vec<String> = part.iter().map(&dedent).collect();
    let replace: Vec<String> = replace.iter().map(&dedent).collect();

    if part.len() > whole.len() {
        return None;
    }

    for (start, window) in whole.windows(part.len()).enumerate() {
        let Some(shift) = uniform_indent_shift(window, &part) else {
            continue;
        };
        trace!("      Whitespace-tolerant match at line {} ({:?}).", start + 1, shift);
        let reindented: Vec<String> = replace
            .iter()
            .map(|line| {
                if is_blank(line) {
                    return line.clone();
                }
                match shift {
                    IndentShift::Add(prefix) => format!("{prefix}{line}"),
                    IndentShift::Remove(width) => {
                        line[width.min(leading_width(line))..].to_string()
                    }
                }
            })
            .collect();
        let reindented: Vec<&str> = reindented.iter().map(String::as_str).collect();
        return Some(splice(whole, start, part.len(), &reindented));
    }
    None
}

/// How the file's indentation differs from the SEARCH text's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndentShift<'w> {
    /// The file indents every line by this extra prefix.
    Add(&'w str),
    /// The file indents every line by this many fewer bytes.
    Remove(usize),
}

/// Returns the indentation shift from `part` to `window`, if the lines agree
/// once leading whitespace is ignored and every non-blank line of the window
/// is shifted the same way.
fn uniform_indent_shift<'w>(window: &[&'w str], part: &[String]) -> Option<IndentShift<'w>> {
    let mut shift: Option<IndentShift<'w>> = None;
    for (&line, expected) in window.iter().zip(part) {
        if line.trim_start_matches([' ', '\t']) != expected.trim_start_matches([' ', '\t']) {
            return None;
        }
        if is_blank(line) {
            continue;
        }
        let (have, want) = (leading_width(line), leading_width(expected));
        let delta = if have >= want {
            IndentShift::Add(&line[..have - want])
        } else {
            IndentShift::Remove(want - have)
        };
        match shift {
            None => shift = Some(delta),
            Some(existing) if existing != delta => return None,
            Some(_) => {}
        }
    }
    shift
}

fn trailing_blank_lines_match(whole: &[&str], part: &[&str], replace: &[&str]) -> Option<String> {
    let content_end = |lines: &[&str]| {
        lines
            .iter()
            .rposition(|line| !is_blank(line))
            .map_or(0, |last| last + 1)
    };
    let (whole_end, part_end, replace_end) =
        (content_end(whole), content_end(part), content_end(replace));

    let start = find_exact(&whole[..whole_end], &part[..part_end])?;
    trace!(
        "      Match at line {} after trimming trailing blank lines.",
        start + 1
    );
    let mut content = splice(&whole[..whole_end], start, part_end, &replace[..replace_end]);
    // The file keeps its own trailing blank lines.
    content.push_str(&whole[whole_end..].concat());
    Some(content)
}

fn ellipsis_match(whole: &[&str], part: &[&str], replace: &[&str]) -> Option<String> {
    let part_segments = split_on_ellipsis(part);
    let replace_segments = split_on_ellipsis(replace);
    if part_segments.len() < 2 || part_segments.len() != replace_segments.len() {
        return None;
    }

    let mut result = whole.concat();
    for (search, substitute) in part_segments.iter().zip(&replace_segments) {
        if search.is_empty() && substitute.is_empty() {
            continue;
        }
        if search.is_empty() {
            if !result.is_empty() && !result.ends_with('\n') {
                result.push('\n');
            }
            result.push_str(substitute);
            continue;
        }
        let occurrences = result.matches(search.as_str()).count();
        if occurrences != 1 {
            trace!(
                "      Elided segment occurs {} times; expected exactly once.",
                occurrences
            );
            return None;
        }
        result = result.replacen(search.as_str(), substitute, 1);
    }
    Some(result)
}

/// Splits lines into the segments between standalone `...` lines. The `...`
/// lines themselves are discarded.
fn split_on_ellipsis(lines: &[&str]) -> Vec<String> {
    let mut segments = vec![String::new()];
    for line in lines {
        if line.trim() == "..." {
            segments.push(String::new());
        } else if let Some(segment) = segments.last_mut() {
            segment.push_str(line);
        }
    }
    segments
}
