//! Scanning raw text for SEARCH/REPLACE blocks and shell-command fences.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::{debug, trace};
use regex::Regex;

use crate::error::ParseError;
use crate::filename::{resolve_filename, FILENAME_LOOKBACK};

static HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<{5,9} SEARCH\s*$").expect("valid head marker regex"));
static DIVIDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^={5,9}\s*$").expect("valid divider regex"));
static TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>{5,9} REPLACE\s*$").expect("valid tail marker regex"));

/// Info-string languages that mark a fenced block of shell commands.
const SHELL_LANGUAGES: &[&str] = &[
    "bash",
    "sh",
    "shell",
    "cmd",
    "batch",
    "powershell",
    "ps1",
    "zsh",
    "fish",
    "ksh",
    "csh",
    "tcsh",
];

const TRIPLE_BACKTICKS: &str = "```";

/// The pair of delimiters used to quote code in the input text.
///
/// Defaults to triple backticks for both ends. Some prompts use other pairs
/// such as `<source>` / `</source>`; the parser and the replacement engine
/// recognise whichever pair is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence {
    /// The opening delimiter, e.g. "```".
    pub open: String,
    /// The closing delimiter, e.g. "```".
    pub close: String,
}

impl Fence {
    /// Creates a fence from an opening and closing delimiter.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Returns `true` if `line` starts with this fence's opener or with plain
    /// triple backticks.
    pub fn is_opener(&self, line: &str) -> bool {
        let line = line.trim_start();
        line.starts_with(self.open.as_str()) || line.starts_with(TRIPLE_BACKTICKS)
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new(TRIPLE_BACKTICKS, TRIPLE_BACKTICKS)
    }
}

/// One edit to one file, as written in a SEARCH/REPLACE block.
///
/// `original` and `updated` keep their line terminators exactly as they
/// appeared in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    /// The target path, relative to the workspace.
    pub path: PathBuf,
    /// The text expected in the current file. Empty means "append", or
    /// "create" when the file does not exist yet.
    pub original: String,
    /// The text that takes the place of `original`.
    pub updated: String,
}

impl FileEdit {
    /// Creates a new edit.
    pub fn new(
        path: impl Into<PathBuf>,
        original: impl Into<String>,
        updated: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            original: original.into(),
            updated: updated.into(),
        }
    }

    /// Returns `true` if the SEARCH section holds nothing but whitespace.
    pub fn is_append(&self) -> bool {
        self.original.trim().is_empty()
    }
}

/// A unit extracted from the input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditBlock {
    /// A SEARCH/REPLACE block targeting a file.
    File(FileEdit),
    /// The body of a shell-language fence. It is only extracted, never run.
    ShellCommand(String),
}

impl EditBlock {
    /// Returns the file edit, if this block is one.
    pub fn as_file_edit(&self) -> Option<&FileEdit> {
        match self {
            EditBlock::File(edit) => Some(edit),
            EditBlock::ShellCommand(_) => None,
        }
    }
}

/// Returns `true` if the line is a `<<<<<<< SEARCH` marker (5 to 9 `<`).
pub fn is_head_marker(line: &str) -> bool {
    HEAD.is_match(line.trim())
}

/// Returns `true` if the line is a `=======` divider (5 to 9 `=`).
pub fn is_divider_marker(line: &str) -> bool {
    DIVIDER.is_match(line.trim())
}

/// Returns `true` if the line is a `>>>>>>> REPLACE` marker (5 to 9 `>`).
pub fn is_tail_marker(line: &str) -> bool {
    TAIL.is_match(line.trim())
}

/// A shell fence is ` ``` ` followed by one of [`SHELL_LANGUAGES`] as the
/// whole first word of the info string, so ` ```csharp ` is not one.
fn is_shell_fence(line: &str) -> bool {
    let Some(info) = line.trim().strip_prefix(TRIPLE_BACKTICKS) else {
        return false;
    };
    info.split_whitespace()
        .next()
        .is_some_and(|language| SHELL_LANGUAGES.contains(&language))
}

/// Parses a string into an ordered list of [`EditBlock`]s.
///
/// The scan is a single pass over the lines of `content`:
///
/// - A shell fence (` ```bash `, ` ```sh `, ...) that is not directly followed
///   by a `SEARCH` marker is captured up to its closing fence as an
///   [`EditBlock::ShellCommand`].
/// - A `<<<<<<< SEARCH` marker starts a file edit. The filename is taken from
///   up to three lines above the marker (see [`resolve_filename`]); if none is
///   found there, the filename of the previous block is reused.
/// - The SEARCH section runs to the `=======` divider and the REPLACE section
///   runs to the `>>>>>>> REPLACE` marker. A second `=======` is also
///   accepted as the end of the REPLACE section.
/// - Everything else is ignored.
///
/// `valid_filenames` steers filename resolution toward known files; pass an
/// empty slice to accept any filename. Blocks with an empty SEARCH section
/// (new files) never consult it.
///
/// # Errors
///
/// Any malformed block fails the whole parse with a [`ParseError`]; no
/// partial result is returned.
///
/// # Example
///
/// ````rust
/// use srpatch::{parse_edit_blocks, EditBlock, Fence};
///
/// let response = r#"
/// Rename the greeting.
///
/// src/main.rs
/// ```rust
/// <<<<<<< SEARCH
///     println!("Hello, world!");
/// =======
///     println!("Hello, srpatch!");
/// >>>>>>> REPLACE
/// ```
///
/// ```bash
/// cargo run
/// ```
/// "#;
///
/// let blocks = parse_edit_blocks(response, &Fence::default(), &[]).unwrap();
/// assert_eq!(blocks.len(), 2);
///
/// let edit = blocks[0].as_file_edit().unwrap();
/// assert_eq!(edit.path.to_str(), Some("src/main.rs"));
/// assert_eq!(edit.original, "    println!(\"Hello, world!\");\n");
/// assert_eq!(edit.updated, "    println!(\"Hello, srpatch!\");\n");
///
/// assert_eq!(blocks[1], EditBlock::ShellCommand("cargo run\n".to_string()));
/// ````
pub fn parse_edit_blocks(
    content: &str,
    fence: &Fence,
    valid_filenames: &[String],
) -> Result<Vec<EditBlock>, ParseError> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let mut blocks = Vec::new();
    let mut current_filename: Option<String> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        let next_is_head = lines.get(i + 1).is_some_and(|next| is_head_marker(next));
        if is_shell_fence(line) && !next_is_head {
            trace!("  Shell fence opened on line {}", i + 1);
            let mut command = String::new();
            i += 1;
            while i < lines.len() && !lines[i].trim().starts_with(TRIPLE_BACKTICKS) {
                command.push_str(lines[i]);
                i += 1;
            }
            if i < lines.len() {
                // Skip the closing fence.
                i += 1;
            }
            blocks.push(EditBlock::ShellCommand(command));
            continue;
        }

        if is_head_marker(line) {
            let (edit, next) = parse_file_edit(
                &lines,
                i,
                fence,
                valid_filenames,
                current_filename.as_deref(),
            )?;
            current_filename = Some(edit.path.to_string_lossy().into_owned());
            blocks.push(EditBlock::File(edit));
            i = next;
            continue;
        }

        i += 1;
    }

    debug!(
        "Parsed {} block(s) from {} line(s) of input.",
        blocks.len(),
        lines.len()
    );
    Ok(blocks)
}

/// Parses the block whose `SEARCH` marker sits at `head`. Returns the edit and
/// the index of the first line after its terminator.
fn parse_file_edit(
    lines: &[&str],
    head: usize,
    fence: &Fence,
    valid_filenames: &[String],
    current_filename: Option<&str>,
) -> Result<(FileEdit, usize), ParseError> {
    let consumed = |upto: usize| lines[..(upto + 1).min(lines.len())].concat();

    let is_new_file = lines.get(head + 1).is_some_and(|next| is_divider_marker(next));
    let preceding = &lines[head.saturating_sub(FILENAME_LOOKBACK)..head];
    let constraint: &[String] = if is_new_file { &[] } else { valid_filenames };

    let filename = match resolve_filename(preceding, fence, constraint) {
        Some(name) => name,
        None => match current_filename {
            Some(previous) => {
                debug!(
                    "  No filename above line {}; reusing '{}'.",
                    head + 1,
                    previous
                );
                previous.to_string()
            }
            None => {
                return Err(ParseError::MissingFilename {
                    line: head + 1,
                    consumed: consumed(head),
                    fence: fence.open.clone(),
                })
            }
        },
    };

    let mut i = head + 1;
    let mut original = String::new();
    while i < lines.len() && !is_divider_marker(lines[i]) {
        original.push_str(lines[i]);
        i += 1;
    }
    if i >= lines.len() {
        return Err(ParseError::MissingDivider {
            line: lines.len(),
            consumed: consumed(i),
        });
    }

    i += 1;
    let mut updated = String::new();
    while i < lines.len() && !(is_tail_marker(lines[i]) || is_divider_marker(lines[i])) {
        updated.push_str(lines[i]);
        i += 1;
    }
    if i >= lines.len() {
        return Err(ParseError::MissingReplace {
            line: lines.len(),
            consumed: consumed(i),
        });
    }
    if is_divider_marker(lines[i]) {
        trace!(
            "  Block for '{}' closed by a second divider on line {}",
            filename,
            i + 1
        );
    }

    trace!(
        "  Parsed block for '{}' (lines {}-{})",
        filename,
        head + 1,
        i + 1
    );
    Ok((FileEdit::new(Path::new(&filename), original, updated), i + 1))
}
