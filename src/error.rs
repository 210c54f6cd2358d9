//! Error types for parsing, workspace access and batch application.

use std::path::PathBuf;
use thiserror::Error;

use crate::apply::BatchReport;

/// Represents errors that can occur while scanning text for edit blocks.
///
/// Every variant renders as the text consumed so far followed by a `^^^`
/// pointer line, so the message can be handed back to whoever produced the
/// malformed block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `SEARCH` marker was found but no filename could be resolved from the
    /// preceding lines, and no earlier block supplied one.
    #[error(
        "{consumed}\n^^^ Bad/missing filename. The filename must be alone on the line before the opening fence {fence}"
    )]
    MissingFilename {
        /// The 1-based line number of the `SEARCH` marker.
        line: usize,
        /// The input text up to and including the offending line.
        consumed: String,
        /// The fence opener in effect while parsing.
        fence: String,
    },
    /// The input ended before the `=======` divider of a block.
    #[error("{consumed}\n^^^ Expected `=======`")]
    MissingDivider { line: usize, consumed: String },
    /// The input ended before the `>>>>>>> REPLACE` marker of a block.
    #[error("{consumed}\n^^^ Expected `>>>>>>> REPLACE` or `=======`")]
    MissingReplace { line: usize, consumed: String },
}

impl ParseError {
    /// The 1-based line number the error points at.
    pub fn line(&self) -> usize {
        match self {
            ParseError::MissingFilename { line, .. }
            | ParseError::MissingDivider { line, .. }
            | ParseError::MissingReplace { line, .. } => *line,
        }
    }
}

/// Hard failures raised by a [`Workspace`](crate::Workspace) implementation.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// The edit named a path outside the workspace root
    /// (e.g. `../../etc/passwd`).
    #[error("Path '{}' resolves outside the workspace root. Aborting for security.", .0.display())]
    PathTraversal(PathBuf),
    /// The file does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    /// The user does not have permission to read or write to the specified path.
    #[error("Permission denied for path: {path:?}")]
    PermissionDenied { path: PathBuf },
    /// The target path exists but is a directory, not a file.
    #[error("Target path is a directory, not a file: {path:?}")]
    TargetIsDirectory { path: PathBuf },
    /// Any other I/O error while reading or writing a file.
    #[error("I/O error while processing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single well-formed edit could not be applied.
///
/// These failures are not fatal to a batch: sibling edits still apply and
/// the failures are reported together at the end.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The SEARCH text could not be located by any matching strategy.
    #[error("SEARCH text not found")]
    NoMatch,
    /// The SEARCH text is non-blank but the target file does not exist.
    #[error("target file does not exist")]
    MissingFile,
}

/// The error returned by the batch entry points.
#[derive(Error, Debug)]
pub enum ApplyError {
    /// The input text contained a malformed block. Nothing was applied.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Reading or writing a file failed. Edits before the failing one may
    /// already have been written.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    /// At least one edit failed to match. All other edits were applied.
    #[error("{message}")]
    EditsFailed {
        /// The aggregated, human-readable failure report.
        message: String,
        /// Per-edit outcomes for the whole batch.
        report: Box<BatchReport>,
    },
}
