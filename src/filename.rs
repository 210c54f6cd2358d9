//! Picking the target file for a block from the lines written above it.

use std::path::Path;

use log::{debug, trace};

use crate::parser::Fence;
use crate::similarity::text_similarity;

/// A candidate must score at least this much against exactly one valid
/// filename to be fuzzily resolved to it.
pub const FILENAME_MATCH_CUTOFF: f64 = 0.8;

/// How many lines above a `SEARCH` marker are searched for a filename.
pub const FILENAME_LOOKBACK: usize = 3;

/// Resolves the target filename of a block from the lines preceding its
/// `SEARCH` marker.
///
/// `preceding` holds the lines directly above the marker in input order (the
/// last element is the line right above it); at most the last
/// [`FILENAME_LOOKBACK`] are inspected, closest first. Each line is stripped
/// of decoration (`#`, a trailing `:`, backticks, asterisks). A line that
/// still contains whitespace after stripping is prose, not a candidate.
/// Walking stops at the first line that is neither a fence nor a usable
/// candidate.
///
/// Among the candidates, the first rule that matches wins:
///
/// 1. a candidate that is itself in `valid_filenames`;
/// 2. a candidate equal to the base name of a valid filename, which resolves
///    to that full valid filename;
/// 3. a candidate that scores at least [`FILENAME_MATCH_CUTOFF`] against
///    exactly one valid filename;
/// 4. a candidate that contains a `.`;
/// 5. the closest candidate.
///
/// An empty `valid_filenames` accepts anything.
///
/// # Example
///
/// ```
/// # use srpatch::{resolve_filename, Fence};
/// let valid = vec!["src/foo.ts".to_string()];
/// let resolved = resolve_filename(&["foo.ts\n", "```ts\n"], &Fence::default(), &valid);
/// assert_eq!(resolved.as_deref(), Some("src/foo.ts"));
/// ```
pub fn resolve_filename<S: AsRef<str>>(
    preceding: &[S],
    fence: &Fence,
    valid_filenames: &[String],
) -> Option<String> {
    let candidates = collect_candidates(preceding, fence);
    trace!("    Filename candidates: {:?}", candidates);
    if candidates.is_empty() {
        return None;
    }

    if let Some(exact) = candidates
        .iter()
        .find(|candidate| valid_filenames.contains(candidate))
    {
        debug!("  Resolved filename '{}' (exact match).", exact);
        return Some(exact.clone());
    }

    for candidate in &candidates {
        if let Some(valid) = valid_filenames
            .iter()
            .find(|valid| base_name(valid) == Some(candidate.as_str()))
        {
            debug!(
                "  Resolved filename '{}' to '{}' (base name match).",
                candidate, valid
            );
            return Some(valid.clone());
        }
    }

    for candidate in &candidates {
        let mut close = valid_filenames
            .iter()
            .filter(|valid| text_similarity(candidate, valid) >= FILENAME_MATCH_CUTOFF);
        if let (Some(valid), None) = (close.next(), close.next()) {
            debug!(
                "  Resolved filename '{}' to '{}' (fuzzy match).",
                candidate, valid
            );
            return Some(valid.clone());
        }
    }

    if let Some(with_extension) = candidates.iter().find(|candidate| candidate.contains('.')) {
        return Some(with_extension.clone());
    }

    candidates.into_iter().next()
}

fn collect_candidates<S: AsRef<str>>(preceding: &[S], fence: &Fence) -> Vec<String> {
    let mut candidates = Vec::new();
    for line in preceding.iter().rev().take(FILENAME_LOOKBACK) {
        let line = line.as_ref();
        let candidate = strip_filename(line, fence);
        let is_fence = fence.is_opener(line);
        match candidate {
            Some(name) => candidates.push(name),
            None if is_fence => {}
            None => break,
        }
    }
    candidates
}

/// Strips the decoration models put around a filename. Returns `None` when
/// nothing usable is left.
fn strip_filename(line: &str, fence: &Fence) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line == "..." {
        return None;
    }

    // A fence opener only names a file when a path follows it directly,
    // as in "```src/lib.rs".
    for opener in [fence.open.as_str(), "```"] {
        if let Some(rest) = line.strip_prefix(opener) {
            let rest = rest.trim();
            let looks_like_path = rest.contains('.') || rest.contains('/');
            return (!rest.is_empty() && looks_like_path).then(|| rest.to_string());
        }
    }

    let name = line.strip_suffix(':').unwrap_or(line);
    let name = name.strip_prefix('#').unwrap_or(name);
    let name = name.trim().trim_matches(|c: char| c == '`' || c == '*').trim();
    // Whitespace inside what is left means a sentence, not a path.
    let is_prose = name.contains(char::is_whitespace);
    (!name.is_empty() && !is_prose).then(|| name.to_string())
}

fn base_name(path: &str) -> Option<&str> {
    Path::new(path).file_name().and_then(|name| name.to_str())
}
