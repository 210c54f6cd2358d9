//! Normalized text similarity between two line sequences.

use similar::TextDiff;

/// Weight of the line-level ratio in [`window_similarity`].
pub const LINE_WEIGHT: f64 = 0.6;
/// Weight of the word-level ratio in [`window_similarity`].
pub const WORD_WEIGHT: f64 = 0.4;

/// Computes how alike two line sequences are, on a scale from `0.0` to `1.0`.
///
/// Lines are joined with `\n` (their own terminators, if any, are dropped
/// first, so `"a\n"` and `"a"` count as the same line) and the two texts are
/// compared character by character. The score is `2 * M / T`, where `M` is
/// the number of characters in the longest common subsequence and `T` the
/// combined length of both texts.
///
/// The measure is symmetric, deterministic and free of side effects. Two
/// empty sequences are considered identical. Its cost grows with the product
/// of both lengths, so it suits short texts such as filenames; use
/// [`window_similarity`] to compare blocks of code.
///
/// # Example
///
/// ```
/// # use srpatch::similarity;
/// assert_eq!(similarity(&["fn main() {", "}"], &["fn main() {\n", "}\n"]), 1.0);
/// assert_eq!(similarity(&["abc"], &["xyz"]), 0.0);
///
/// let close = similarity(&["src/foo.rs"], &["src/fooo.rs"]);
/// let far = similarity(&["src/foo.rs"], &["docs/README.md"]);
/// assert!(close > far);
/// ```
pub fn similarity<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> f64 {
    let left = join_lines(a);
    let right = join_lines(b);
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(left.as_str(), right.as_str()).ratio())
}

/// Similarity of two single strings, treated as one-line sequences.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    similarity(&[a], &[b])
}

/// Ratio of whole lines shared by both sequences (`2 * M / T` over lines).
///
/// This is the cheap half of [`window_similarity`]: each line is hashed once,
/// so scoring every window of a large file stays fast.
pub fn line_similarity<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> f64 {
    let left = trimmed_lines(a);
    let right = trimmed_lines(b);
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_slices(&left, &right).ratio())
}

/// Ratio of words and whitespace runs shared by both sequences.
pub fn word_similarity<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> f64 {
    let left = join_lines(a);
    let right = join_lines(b);
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_words(left.as_str(), right.as_str()).ratio())
}

/// Scores a window of a file against a block of code.
///
/// The score mixes [`line_similarity`] and [`word_similarity`] as
/// `LINE_WEIGHT * lines + WORD_WEIGHT * words`. Whole-line agreement
/// dominates, while the word ratio still rewards lines that differ only in a
/// token or two. The result is symmetric and lies in `0.0..=1.0`.
///
/// # Example
///
/// ```
/// # use srpatch::window_similarity;
/// let search = ["fn b() {", "    tw0();", "}"];
/// let close = window_similarity(&["fn b() {", "    two();", "}"], &search);
/// let far = window_similarity(&["fn a() {", "    one();", "}"], &search);
/// assert!(close > far);
/// assert_eq!(window_similarity(&search, &search), 1.0);
/// ```
pub fn window_similarity<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> f64 {
    combine(line_similarity(a, b), word_similarity(a, b))
}

/// Mixes a line ratio and a word ratio into a window score.
pub(crate) fn combine(lines: f64, words: f64) -> f64 {
    LINE_WEIGHT * lines + WORD_WEIGHT * words
}

fn trimmed_lines<S: AsRef<str>>(lines: &[S]) -> Vec<&str> {
    lines
        .iter()
        .map(|line| line.as_ref().trim_end_matches(['\r', '\n']))
        .collect()
}

fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    trimmed_lines(lines).join("\n")
}
