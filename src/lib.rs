//! Applies SEARCH/REPLACE edit blocks, as written by language models, to a set
//! of files.
//!
//! A model asked to edit code often answers with blocks like this one: a
//! filename, then the lines it expects to find, then the lines that should take
//! their place.
//!
//! ````text
//! src/main.rs
//! ```rust
//! <<<<<<< SEARCH
//!     println!("Hello, world!");
//! =======
//!     println!("Hello, srpatch!");
//! >>>>>>> REPLACE
//! ```
//! ````
//!
//! `srpatch` finds those blocks in free-form text, works out which file each
//! one targets, locates the SEARCH text in that file (tolerating the usual
//! mistakes: wrong indentation, stray blank lines, elided `...` sections) and
//! writes the result. Blocks that cannot be applied are collected into a report
//! that can be sent straight back to the model.
//!
//! ## Getting Started
//!
//! ````rust
//! use srpatch::{apply_edits_to_dir, ApplyOptions};
//! use std::fs;
//! use tempfile::tempdir;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 1. Set up a temporary directory and a file to be edited.
//! let dir = tempdir()?;
//! let file_path = dir.path().join("src/main.rs");
//! fs::create_dir_all(file_path.parent().unwrap())?;
//! fs::write(&file_path, "fn main() {\n    println!(\"Hello, world!\");\n}\n")?;
//!
//! // 2. The model's answer, edit blocks and prose mixed together.
//! let response = r#"
//! Here is the change:
//!
//! src/main.rs
//! ```rust
//! <<<<<<< SEARCH
//!     println!("Hello, world!");
//! =======
//!     println!("Hello, srpatch!");
//! >>>>>>> REPLACE
//! ```
//! "#;
//!
//! // 3. Apply every block in the answer.
//! let report = apply_edits_to_dir(response, dir.path(), &[], &ApplyOptions::default())?;
//! assert!(report.all_applied());
//!
//! // 4. Verify the file was changed.
//! let new_content = fs::read_to_string(&file_path)?;
//! assert_eq!(new_content, "fn main() {\n    println!(\"Hello, srpatch!\");\n}\n");
//! # Ok(())
//! # }
//! ````
//!
//! ## Key Concepts
//!
//! ### The Pipeline
//!
//! 1.  **Parsing:** [`parse_edit_blocks`] scans the text for `<<<<<<< SEARCH`,
//!     `=======` and `>>>>>>> REPLACE` markers and returns an ordered list of
//!     [`EditBlock`]s. Shell-language fences (` ```bash `, ` ```sh `, ...) are
//!     returned as [`EditBlock::ShellCommand`]; they are never executed.
//! 2.  **Filename resolution:** [`resolve_filename`] picks the target file from
//!     the lines above each block, preferring names from a caller-supplied list
//!     of valid filenames.
//! 3.  **Replacement:** [`replace_chunk`] locates the SEARCH text and splices in
//!     the REPLACE text. Strategies are tried in a fixed order and the first
//!     success wins (see [`MatchStrategy`]).
//! 4.  **Reporting:** when a block cannot be applied,
//!     [`format_failure_report`] explains why and shows the most similar lines
//!     of the file.
//!
//! [`apply_edits`] runs the whole pipeline against any [`Workspace`];
//! [`apply_edits_to_dir`] is the same over a directory on disk.
//!
//! ### Partial Failure
//!
//! Edits are applied one by one, in order, and each sees the file as left by
//! the edits before it. An edit that fails does not stop the batch: the others
//! are still written, and the failures are returned together as
//! [`ApplyError::EditsFailed`].
//!
//! ````rust
//! use srpatch::{apply_edits, ApplyError, ApplyOptions, MemoryWorkspace};
//!
//! let mut workspace = MemoryWorkspace::new().with_file("list.txt", "alpha\nbeta\ngamma\n");
//! let response = r#"
//! list.txt
//! ```
//! <<<<<<< SEARCH
//! beta
//! =======
//! BETA
//! >>>>>>> REPLACE
//! ```
//!
//! list.txt
//! ```
//! <<<<<<< SEARCH
//! delta
//! =======
//! DELTA
//! >>>>>>> REPLACE
//! ```
//! "#;
//!
//! let err = apply_edits(response, &mut workspace, &[], &ApplyOptions::default()).unwrap_err();
//! let ApplyError::EditsFailed { message, report } = err else {
//!     panic!("expected a match failure");
//! };
//!
//! // The report names the one block that failed ...
//! assert!(message.starts_with("# 1 SEARCH/REPLACE block failed to match!"));
//! assert_eq!(report.failed().len(), 1);
//!
//! // ... and the block that matched was still written.
//! assert_eq!(workspace.get("list.txt"), Some("alpha\nBETA\ngamma\n"));
//! ````
//!
//! ## Feature Flags
//!
//! ### `parallel`
//!
//! - **Enabled by default.**
//! - Scores the candidate windows of a failed edit in parallel using
//!   [`rayon`](https://crates.io/crates/rayon) when looking for the most
//!   similar lines to suggest. Results are identical with the feature off.
//!
//! - **To disable this feature**, specify `default-features = false` in your `Cargo.toml`:
//!   ```toml
//!   [dependencies]
//!   srpatch = { version = "0.1.0", default-features = false }
//!   ```

mod apply;
mod diagnostics;
mod error;
mod filename;
mod parser;
mod replace;
mod similarity;
mod workspace;

pub use apply::{
    apply_edits, apply_edits_to_dir, ApplyOptions, ApplyOptionsBuilder, ApplyOutcome,
    BatchReport, EditResult, FilePreview,
};
pub use diagnostics::{
    find_similar_lines, format_failure, format_failure_report, FailedEdit, SimilaritySuggestion,
    SIMILAR_LINES_THRESHOLD, SUGGESTION_MARGIN,
};
pub use error::{ApplyError, FailureReason, ParseError, WorkspaceError};
pub use filename::{resolve_filename, FILENAME_LOOKBACK, FILENAME_MATCH_CUTOFF};
pub use parser::{
    is_divider_marker, is_head_marker, is_tail_marker, parse_edit_blocks, EditBlock, Fence,
    FileEdit,
};
pub use replace::{
    replace_chunk, replace_most_similar_chunk, strip_quoted_wrapping, MatchStrategy, Replacement,
};
pub use similarity::{
    line_similarity, similarity, text_similarity, window_similarity, word_similarity, LINE_WEIGHT,
    WORD_WEIGHT,
};
pub use workspace::{FsWorkspace, MemoryWorkspace, Workspace};
