//! The file I/O boundary: checking, reading and writing target files.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use log::trace;

use crate::error::WorkspaceError;

/// The file operations the batch applier needs from its host.
///
/// Paths are the ones written in the edit blocks, relative to whatever root
/// the implementation chooses. Each call completes before the next one is
/// made; implementations never see overlapping requests.
pub trait Workspace {
    /// Returns `true` if `path` names an existing file.
    fn exists(&self, path: &Path) -> bool;

    /// Reads the full text of `path`. Only called when [`exists`](Self::exists)
    /// returned `true`.
    fn read(&self, path: &Path) -> Result<String, WorkspaceError>;

    /// Replaces the content of `path`, creating the file if needed.
    fn write(&mut self, path: &Path, content: &str) -> Result<(), WorkspaceError>;
}

/// Converts a `std::io::Error` into a more specific `WorkspaceError`.
fn map_io_error(path: PathBuf, e: std::io::Error) -> WorkspaceError {
    match e.kind() {
        std::io::ErrorKind::NotFound => WorkspaceError::NotFound(path),
        std::io::ErrorKind::PermissionDenied => WorkspaceError::PermissionDenied { path },
        std::io::ErrorKind::IsADirectory => WorkspaceError::TargetIsDirectory { path },
        _ => WorkspaceError::Io { path, source: e },
    }
}

/// A [`Workspace`] backed by a directory on disk.
///
/// Edit paths are resolved against `root`. Absolute paths and paths that
/// climb out of the root with `..` are rejected, and before anything is
/// written the parent directory is canonicalized so that symlinks cannot
/// redirect a write outside the root either.
///
/// # Example
///
/// ```
/// # use srpatch::{FsWorkspace, Workspace};
/// # use std::path::Path;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = tempfile::tempdir()?;
/// let mut workspace = FsWorkspace::new(dir.path());
///
/// workspace.write(Path::new("src/new.rs"), "fn new() {}\n")?;
/// assert!(workspace.exists(Path::new("src/new.rs")));
/// assert_eq!(workspace.read(Path::new("src/new.rs"))?, "fn new() {}\n");
///
/// assert!(workspace.write(Path::new("../escape.rs"), "").is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    /// Creates a workspace rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory edit paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `relative` to the root, rejecting paths that would leave it.
    fn resolve(&self, relative: &Path) -> Result<PathBuf, WorkspaceError> {
        let mut depth: usize = 0;
        for component in relative.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                Component::ParentDir => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| WorkspaceError::PathTraversal(relative.to_path_buf()))?;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(WorkspaceError::PathTraversal(relative.to_path_buf()));
                }
            }
        }
        Ok(self.root.join(relative))
    }

    /// Creates the parent directories of `relative` and returns its
    /// canonical, symlink-free location, which must lie inside the root.
    fn prepare_write(&self, relative: &Path) -> Result<PathBuf, WorkspaceError> {
        let target = self.resolve(relative)?;
        let base = fs::canonicalize(&self.root).map_err(|e| map_io_error(self.root.clone(), e))?;
        let parent = target.parent().unwrap_or(Path::new(""));
        fs::create_dir_all(parent).map_err(|e| map_io_error(parent.to_path_buf(), e))?;
        let file_name = target
            .file_name()
            .ok_or_else(|| WorkspaceError::TargetIsDirectory {
                path: target.clone(),
            })?;
        let resolved = fs::canonicalize(parent)
            .map_err(|e| map_io_error(parent.to_path_buf(), e))?
            .join(file_name);
        if !resolved.starts_with(&base) {
            return Err(WorkspaceError::PathTraversal(relative.to_path_buf()));
        }
        Ok(resolved)
    }
}

impl Workspace for FsWorkspace {
    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).is_ok_and(|full| full.is_file())
    }

    fn read(&self, path: &Path) -> Result<String, WorkspaceError> {
        let full = self.resolve(path)?;
        if full.is_dir() {
            return Err(WorkspaceError::TargetIsDirectory { path: full });
        }
        trace!("  Reading '{}'", path.display());
        fs::read_to_string(&full).map_err(|e| map_io_error(full, e))
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<(), WorkspaceError> {
        let full = self.prepare_write(path)?;
        if full.is_dir() {
            return Err(WorkspaceError::TargetIsDirectory { path: full });
        }
        trace!("  Writing {} bytes to '{}'", content.len(), path.display());
        fs::write(&full, content).map_err(|e| map_io_error(full, e))
    }
}

/// A [`Workspace`] held entirely in memory.
///
/// Useful when the caller already has the file contents (an editor buffer,
/// a virtual filesystem) and for tests.
///
/// # Example
///
/// ```
/// # use srpatch::{MemoryWorkspace, Workspace};
/// # use std::path::Path;
/// let mut workspace = MemoryWorkspace::new().with_file("notes.txt", "one\n");
/// workspace.write(Path::new("notes.txt"), "two\n").unwrap();
/// assert_eq!(workspace.get("notes.txt"), Some("two\n"));
/// assert!(!workspace.exists(Path::new("missing.txt")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryWorkspace {
    files: BTreeMap<PathBuf, String>,
}

impl MemoryWorkspace {
    /// Creates an empty workspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file, replacing any existing content.
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Returns the content of `path`, if it exists.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Iterates over all files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files
            .iter()
            .map(|(path, content)| (path.as_path(), content.as_str()))
    }
}

impl Workspace for MemoryWorkspace {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<String, WorkspaceError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| WorkspaceError::NotFound(path.to_path_buf()))
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<(), WorkspaceError> {
        self.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}
