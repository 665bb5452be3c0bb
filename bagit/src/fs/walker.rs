//! Directory traversal for payload and tag files.
//!
//! Walks are depth-first and unordered. Only non-directory entries are
//! reported; symlinks to files count as regular files.

use crate::utils::Result;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking. Symlinks are never followed into
/// directories.
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Maximum depth (None = unlimited)
    pub max_depth: Option<usize>,
}

impl WalkOptions {
    /// Only the immediate children of the root.
    pub fn top_level() -> Self {
        Self {
            max_depth: Some(1),
            ..Self::default()
        }
    }
}

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Relative path from the root
    pub relative_path: PathBuf,

    /// File size in bytes (0 for broken symlinks)
    pub size: u64,

    /// Is this a symlink?
    pub is_symlink: bool,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// Symlinks pointing at directories yield None. Broken symlinks are kept so
    /// that hashing them surfaces the I/O error.
    fn from_entry(entry: &DirEntry, root: &Path) -> Result<Option<Self>> {
        let path = entry.path().to_path_buf();
        let relative_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        let is_symlink = entry.path_is_symlink();

        let size = if is_symlink {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_dir() => return Ok(None),
                Ok(resolved) => resolved.len(),
                Err(_) => 0,
            }
        } else {
            entry.metadata()?.len()
        };

        Ok(Some(Self {
            path,
            relative_path,
            size,
            is_symlink,
        }))
    }

    /// Relative path with `/` separators.
    pub fn slash_path(&self) -> String {
        to_slash(&self.relative_path)
    }
}

/// Walk a directory tree and collect all files
///
/// # Arguments
/// * `root` - Root directory to start walking from
/// * `options` - Walking options (depth)
///
/// # Returns
/// * `Ok(Vec<FileInfo>)` - List of all files found
/// * `Err(BagError::Walk)` - If a directory cannot be read
///
/// # Example
/// ```no_run
/// use bagit::fs::walker::{walk_directory, WalkOptions};
/// use std::path::Path;
///
/// let files = walk_directory(Path::new("bag/data"), WalkOptions::default()).unwrap();
/// println!("Found {} files", files.len());
/// ```
pub fn walk_directory(root: &Path, options: WalkOptions) -> Result<Vec<FileInfo>> {
    let mut files = Vec::new();
    walk_directory_with_callback(root, options, |file| files.push(file.clone()))?;
    Ok(files)
}

/// Walk a directory tree with a callback for each file.
pub fn walk_directory_with_callback<F>(
    root: &Path,
    options: WalkOptions,
    mut callback: F,
) -> Result<()>
where
    F: FnMut(&FileInfo),
{
    let mut walker = WalkDir::new(root).min_depth(1);

    if let Some(max_depth) = options.max_depth {
        walker = walker.max_depth(max_depth);
    }

    for entry in walker {
        let entry = entry?;

        if entry.file_type().is_dir() {
            continue;
        }

        if let Some(file_info) = FileInfo::from_entry(&entry, root)? {
            callback(&file_info);
        }
    }

    Ok(())
}

/// Render a relative path with forward slashes regardless of host platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
