//! The batch applier: runs a whole model response against a workspace.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};
use similar::udiff::unified_diff;

use crate::diagnostics::{format_failure_report, FailedEdit};
use crate::error::{ApplyError, FailureReason, WorkspaceError};
use crate::parser::{parse_edit_blocks, EditBlock, Fence, FileEdit};
use crate::replace::{replace_chunk, MatchStrategy, Replacement};
use crate::workspace::{FsWorkspace, Workspace};

/// Options for configuring how a batch of edits is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    /// If `true`, no files are modified. Edits are staged in memory and a
    /// diff of every touched file is returned in [`BatchReport::previews`].
    pub dry_run: bool,
    /// The fence pair used to quote code in the input.
    pub fence: Fence,
    /// If `true`, an edit that fails against its own file is retried against
    /// every other valid filename that exists.
    pub search_other_files: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            fence: Fence::default(),
            search_other_files: false,
        }
    }
}

impl ApplyOptions {
    /// Creates a new builder for `ApplyOptions`.
    ///
    /// # Example
    ///
    /// ```
    /// # use srpatch::{ApplyOptions, Fence};
    /// let options = ApplyOptions::builder()
    ///     .dry_run(true)
    ///     .fence(Fence::new("<source>", "</source>"))
    ///     .build();
    ///
    /// assert!(options.dry_run);
    /// assert_eq!(options.fence.open, "<source>");
    /// assert!(!options.search_other_files);
    /// ```
    pub fn builder() -> ApplyOptionsBuilder {
        ApplyOptionsBuilder::default()
    }
}

/// A builder for creating `ApplyOptions`.
#[derive(Debug, Clone, Default)]
pub struct ApplyOptionsBuilder {
    dry_run: Option<bool>,
    fence: Option<Fence>,
    search_other_files: Option<bool>,
}

impl ApplyOptionsBuilder {
    /// If `true`, no files will be modified. Instead, a diff of the proposed
    /// changes will be returned in [`BatchReport::previews`].
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    /// Sets the fence pair used to quote code in the input.
    pub fn fence(mut self, fence: Fence) -> Self {
        self.fence = Some(fence);
        self
    }

    /// Enables retrying failed edits against the other valid filenames.
    pub fn search_other_files(mut self, search_other_files: bool) -> Self {
        self.search_other_files = Some(search_other_files);
        self
    }

    /// Builds the `ApplyOptions`.
    pub fn build(self) -> ApplyOptions {
        let default = ApplyOptions::default();
        ApplyOptions {
            dry_run: self.dry_run.unwrap_or(default.dry_run),
            fence: self.fence.unwrap_or(default.fence),
            search_other_files: self
                .search_other_files
                .unwrap_or(default.search_other_files),
        }
    }
}

/// What happened to a single file edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The edit was written (or staged, in dry-run mode).
    Applied {
        /// The strategy that located the SEARCH text.
        strategy: MatchStrategy,
    },
    /// The edit could not be applied.
    Failed(FailureReason),
}

/// A file edit and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditResult {
    /// The edit as parsed. If it was applied to a different file than the one
    /// it named, `edit.path` is the file it was applied to.
    pub edit: FileEdit,
    pub outcome: ApplyOutcome,
}

impl EditResult {
    /// Returns `true` if the edit was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, ApplyOutcome::Applied { .. })
    }
}

/// The proposed change to one file in a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub path: PathBuf,
    /// A unified diff from the file's content before the batch to its staged
    /// content.
    pub diff: String,
}

/// The outcome of a batch, one entry per file edit in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// One result per file edit, in the order the edits appeared.
    pub results: Vec<EditResult>,
    /// The bodies of the shell-command blocks, in order. They are never run.
    pub shell_commands: Vec<String>,
    /// Per-file diffs of the staged changes. Only populated in dry-run mode.
    pub previews: Vec<FilePreview>,
}

impl BatchReport {
    /// Returns `true` if every file edit in the batch was applied.
    pub fn all_applied(&self) -> bool {
        self.results.iter().all(EditResult::is_applied)
    }

    /// The edits that were applied, in input order.
    pub fn applied(&self) -> Vec<&FileEdit> {
        self.results
            .iter()
            .filter(|result| result.is_applied())
            .map(|result| &result.edit)
            .collect()
    }

    /// The edits that failed, in input order.
    pub fn failed(&self) -> Vec<&FileEdit> {
        self.results
            .iter()
            .filter(|result| !result.is_applied())
            .map(|result| &result.edit)
            .collect()
    }
}

struct StagedFile {
    before: Option<String>,
    after: String,
}

/// Routes reads and writes either straight to the workspace or, in dry-run
/// mode, through an in-memory overlay.
struct Session<'w, W: Workspace + ?Sized> {
    workspace: &'w mut W,
    dry_run: bool,
    staged: BTreeMap<PathBuf, StagedFile>,
}

impl<'w, W: Workspace + ?Sized> Session<'w, W> {
    fn new(workspace: &'w mut W, dry_run: bool) -> Self {
        Self {
            workspace,
            dry_run,
            staged: BTreeMap::new(),
        }
    }

    fn read(&self, path: &Path) -> Result<Option<String>, WorkspaceError> {
        if let Some(staged) = self.staged.get(path) {
            return Ok(Some(staged.after.clone()));
        }
        if self.workspace.exists(path) {
            self.workspace.read(path).map(Some)
        } else {
            Ok(None)
        }
    }

    fn write(
        &mut self,
        path: &Path,
        before: Option<String>,
        content: String,
    ) -> Result<(), WorkspaceError> {
        if !self.dry_run {
            info!("  Writing '{}'", path.display());
            return self.workspace.write(path, &content);
        }
        info!("  DRY RUN: Would write changes to '{}'", path.display());
        match self.staged.entry(path.to_path_buf()) {
            Entry::Occupied(mut staged) => staged.get_mut().after = content,
            Entry::Vacant(slot) => {
                slot.insert(StagedFile {
                    before,
                    after: content,
                });
            }
        }
        Ok(())
    }

    fn previews(&self) -> Vec<FilePreview> {
        self.staged
            .iter()
            .map(|(path, staged)| {
                let old_name = format!("a/{}", path.display());
                let new_name = format!("b/{}", path.display());
                let diff = unified_diff(
                    similar::Algorithm::default(),
                    staged.before.as_deref().unwrap_or(""),
                    &staged.after,
                    3,
                    Some((old_name.as_str(), new_name.as_str())),
                );
                FilePreview {
                    path: path.clone(),
                    diff,
                }
            })
            .collect()
    }
}

/// Parses `content` and applies every SEARCH/REPLACE block in it to
/// `workspace`, in order.
///
/// Each edit sees the file as left by the edits before it. An edit that
/// cannot be applied is recorded and the batch carries on, so unrelated
/// edits are still written. Shell-command blocks are collected into
/// [`BatchReport::shell_commands`] and never executed.
///
/// `valid_filenames` steers filename resolution (see
/// [`resolve_filename`](crate::resolve_filename)); pass an empty slice to
/// accept any filename.
///
/// # Errors
///
/// - [`ApplyError::Parse`] if the input holds a malformed block. Nothing is
///   applied.
/// - [`ApplyError::Workspace`] if reading or writing a file fails. Edits
///   before the failing one have already been written.
/// - [`ApplyError::EditsFailed`] if at least one edit failed to apply (not in
///   dry-run mode). The message is a report meant to be handed back to the
///   model; the successful edits have been written.
///
/// # Example
///
/// ````rust
/// use srpatch::{apply_edits, ApplyOptions, MemoryWorkspace};
///
/// let mut workspace = MemoryWorkspace::new()
///     .with_file("greet.py", "def greet():\n    print(\"hello\")\n");
///
/// let response = r#"
/// greet.py
/// ```python
/// <<<<<<< SEARCH
///     print("hello")
/// =======
///     print("hello, world")
/// >>>>>>> REPLACE
/// ```
/// "#;
///
/// let report = apply_edits(response, &mut workspace, &[], &ApplyOptions::default()).unwrap();
/// assert!(report.all_applied());
/// assert_eq!(
///     workspace.get("greet.py"),
///     Some("def greet():\n    print(\"hello, world\")\n")
/// );
/// ````
pub fn apply_edits<W: Workspace + ?Sized>(
    content: &str,
    workspace: &mut W,
    valid_filenames: &[String],
    options: &ApplyOptions,
) -> Result<BatchReport, ApplyError> {
    let blocks = parse_edit_blocks(content, &options.fence, valid_filenames)?;
    let total = blocks
        .iter()
        .filter(|block| block.as_file_edit().is_some())
        .count();

    let mut session = Session::new(workspace, options.dry_run);
    let mut report = BatchReport::default();
    // Index into `report.results` and the content the edit was tried against.
    let mut failures: Vec<(usize, Option<String>)> = Vec::new();

    for block in blocks {
        let edit = match block {
            EditBlock::ShellCommand(command) => {
                debug!("Collected shell command block ({} bytes).", command.len());
                report.shell_commands.push(command);
                continue;
            }
            EditBlock::File(edit) => edit,
        };

        let index = report.results.len();
        info!(
            "Applying edit {}/{} to '{}'",
            index + 1,
            total,
            edit.path.display()
        );

        let current = session.read(&edit.path)?;
        let attempt = replace_chunk(
            current.as_deref(),
            &edit.path,
            &edit.original,
            &edit.updated,
            &options.fence,
        );

        if let Some(Replacement { content, strategy }) = attempt {
            debug!("  Matched using strategy: {}", strategy);
            session.write(&edit.path, current, content)?;
            report.results.push(EditResult {
                edit,
                outcome: ApplyOutcome::Applied { strategy },
            });
            continue;
        }

        if options.search_other_files && !edit.is_append() {
            if let Some((other, strategy)) =
                apply_to_other_file(&mut session, &edit, valid_filenames, &options.fence)?
            {
                info!(
                    "  Applied edit for '{}' to '{}' instead.",
                    edit.path.display(),
                    other.display()
                );
                report.results.push(EditResult {
                    edit: FileEdit { path: other, ..edit },
                    outcome: ApplyOutcome::Applied { strategy },
                });
                continue;
            }
        }

        let reason = if current.is_some() {
            FailureReason::NoMatch
        } else {
            FailureReason::MissingFile
        };
        warn!(
            "  Failed to apply edit {} to '{}': {}",
            index + 1,
            edit.path.display(),
            reason
        );
        report.results.push(EditResult {
            edit,
            outcome: ApplyOutcome::Failed(reason),
        });
        failures.push((index, current));
    }

    if options.dry_run {
        report.previews = session.previews();
        info!(
            "DRY RUN: {} of {} edit(s) would apply; nothing was written.",
            total - failures.len(),
            total
        );
        return Ok(report);
    }

    if failures.is_empty() {
        info!("Applied all {} edit(s).", total);
        return Ok(report);
    }

    let message = {
        let failed: Vec<FailedEdit<'_>> = failures
            .iter()
            .filter_map(|(index, content)| {
                let result = report.results.get(*index)?;
                let ApplyOutcome::Failed(reason) = result.outcome else {
                    return None;
                };
                Some(FailedEdit {
                    edit: &result.edit,
                    reason,
                    content: content.as_deref(),
                })
            })
            .collect();
        format_failure_report(&failed, total - failures.len(), &options.fence)
    };
    Err(ApplyError::EditsFailed {
        message,
        report: Box::new(report),
    })
}

/// Tries `edit` against each valid filename other than its own target.
/// Returns the path and strategy of the first file it applied to.
fn apply_to_other_file<W: Workspace + ?Sized>(
    session: &mut Session<'_, W>,
    edit: &FileEdit,
    valid_filenames: &[String],
    fence: &Fence,
) -> Result<Option<(PathBuf, MatchStrategy)>, WorkspaceError> {
    for name in valid_filenames {
        let other = Path::new(name);
        if other == edit.path.as_path() {
            continue;
        }
        let Some(current) = session.read(other)? else {
            continue;
        };
        trace!("  Trying edit for '{}' against '{}'", edit.path.display(), name);
        if let Some(Replacement { content, strategy }) =
            replace_chunk(Some(current.as_str()), other, &edit.original, &edit.updated, fence)
        {
            session.write(other, Some(current), content)?;
            return Ok(Some((other.to_path_buf(), strategy)));
        }
    }
    Ok(None)
}

/// Applies the edits in `content` to the files under `target_dir`.
///
/// A convenience wrapper around [`apply_edits`] with an [`FsWorkspace`].
/// Paths that would resolve outside `target_dir` are rejected with
/// [`WorkspaceError::PathTraversal`].
///
/// # Example
///
/// ````rust
/// # use srpatch::{apply_edits_to_dir, ApplyOptions};
/// # use std::fs;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let response = "notes/todo.md\n```\n<<<<<<< SEARCH\n=======\n- write tests\n>>>>>>> REPLACE\n```\n";
///
/// let report = apply_edits_to_dir(response, dir.path(), &[], &ApplyOptions::default())?;
/// assert!(report.all_applied());
/// assert_eq!(fs::read_to_string(dir.path().join("notes/todo.md"))?, "- write tests\n");
/// # Ok(())
/// # }
/// ````
pub fn apply_edits_to_dir(
    content: &str,
    target_dir: &Path,
    valid_filenames: &[String],
    options: &ApplyOptions,
) -> Result<BatchReport, ApplyError> {
    let mut workspace = FsWorkspace::new(target_dir);
    apply_edits(content, &mut workspace, valid_filenames, options)
}
