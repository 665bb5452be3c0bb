//! Checksum manifests.
//!
//! A manifest pairs one checksum algorithm with a mapping from file path to
//! expected hex digest. On disk it is `manifest-<alg>.txt` (payload) or
//! `tagmanifest-<alg>.txt` (tag files), one `<digest> <path>` line per file,
//! paths relative to the bag root with `/` separators.

use super::{split_first_field, LineError};
use crate::checksum::{hash_file_with_buffer, Algorithm, READ_BUFFER};
use crate::fs::walker::{to_slash, walk_directory, FileInfo, WalkOptions};
use crate::utils::{BagError, IoContext, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which files a manifest covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ManifestKind {
    Payload,
    Tag,
}

impl ManifestKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ManifestKind::Payload => "manifest-",
            ManifestKind::Tag => "tagmanifest-",
        }
    }

    /// `manifest-md5.txt`, `tagmanifest-sha256.txt`, ...
    pub fn file_name(self, algorithm: Algorithm) -> String {
        format!("{}{}.txt", self.prefix(), algorithm)
    }
}

/// Recognise a manifest by file name.
///
/// Returns `None` for files that are not manifests, and an
/// `UnsupportedAlgorithm` error when the name carries an unknown algorithm.
/// The algorithm is the token between the first `-` and the following `.`.
pub fn parse_manifest_file_name(name: &str) -> Option<Result<(ManifestKind, Algorithm)>> {
    let kind = if name.starts_with(ManifestKind::Payload.prefix()) {
        ManifestKind::Payload
    } else if name.starts_with(ManifestKind::Tag.prefix()) {
        ManifestKind::Tag
    } else {
        return None;
    };

    let (_, rest) = name.split_once('-')?;
    let token = rest.split('.').next().unwrap_or(rest);
    Some(token.parse::<Algorithm>().map(|algorithm| (kind, algorithm)))
}

/// A manifest file found at a bag root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub path: PathBuf,
    pub kind: ManifestKind,
    pub algorithm: Algorithm,
}

/// List every `manifest-*` and `tagmanifest-*` regular file directly under
/// `bag_dir`, sorted by path.
pub fn discover_manifests(bag_dir: &Path) -> Result<Vec<ManifestFile>> {
    let mut found = Vec::new();

    for entry in fs::read_dir(bag_dir).at(bag_dir)? {
        let entry = entry.at(bag_dir)?;
        let name = entry.file_name().to_string_lossy().into_owned();

        let Some(parsed) = parse_manifest_file_name(&name) else {
            continue;
        };
        if !entry.path().is_file() {
            continue;
        }

        let (kind, algorithm) = parsed?;
        found.push(ManifestFile {
            path: entry.path(),
            kind,
            algorithm,
        });
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

/// One `<digest> <path>` line as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLine {
    pub digest: String,
    pub path: String,
}

/// Algorithm plus path-to-digest entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    algorithm: Algorithm,
    entries: BTreeMap<PathBuf, String>,
}

impl Manifest {
    /// Create an empty manifest. Each manifest owns its own entry map.
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            entries: BTreeMap::new(),
        }
    }

    /// Create an empty manifest from an algorithm name, rejecting unknown names.
    pub fn with_algorithm_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn entries(&self) -> &BTreeMap<PathBuf, String> {
        &self.entries
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, digest: impl Into<String>) {
        self.entries.insert(path.into(), digest.into());
    }

    pub fn digest_for(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Digest every file under `root`, keyed by full path.
    pub fn build(algorithm: Algorithm, root: &Path) -> Result<Self> {
        Self::build_with(algorithm, root, READ_BUFFER, |_| {})
    }

    /// Like [`Manifest::build`], calling `on_file` for each file before it is
    /// hashed.
    pub fn build_with<F>(
        algorithm: Algorithm,
        root: &Path,
        block_size: usize,
        mut on_file: F,
    ) -> Result<Self>
    where
        F: FnMut(&FileInfo),
    {
        let mut manifest = Self::new(algorithm);

        for file_info in walk_directory(root, WalkOptions::default())? {
            // Manifest lines are UTF-8 text; a lossy name would never match on disk.
            if file_info.relative_path.to_str().is_none() {
                return Err(BagError::NonUtf8Path(file_info.path));
            }
            on_file(&file_info);
            let digest = hash_file_with_buffer(&file_info.path, algorithm, block_size)?;
            debug!("{} {}", digest, file_info.path.display());
            manifest.entries.insert(file_info.path, digest);
        }

        Ok(manifest)
    }

    /// Render as manifest text with paths relative to `base_dir`.
    ///
    /// Entries already relative (not under `base_dir`) are written as-is.
    pub fn serialize(&self, base_dir: &Path) -> String {
        let mut out = String::new();
        for (path, digest) in &self.entries {
            let relative = path.strip_prefix(base_dir).unwrap_or(path);
            out.push_str(digest);
            out.push(' ');
            out.push_str(&to_slash(relative));
            out.push('\n');
        }
        out
    }

    /// Split manifest text into `(digest, path)` lines.
    ///
    /// Blank lines are skipped; each other line splits on its first run of
    /// whitespace, and trailing whitespace is dropped from the path.
    pub fn parse(text: &str) -> std::result::Result<Vec<ManifestLine>, LineError> {
        let mut lines = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let (digest, path) = split_first_field(line);
            if path.is_empty() {
                return Err(LineError::new(idx + 1, "missing path after digest"));
            }

            lines.push(ManifestLine {
                digest: digest.to_string(),
                path: path.to_string(),
            });
        }

        Ok(lines)
    }

    /// Read and parse a manifest file.
    pub fn read_lines(path: &Path) -> Result<Vec<ManifestLine>> {
        let text = fs::read_to_string(path).at(path)?;
        Self::parse(&text).map_err(|e| e.in_file(path))
    }

    /// Load a manifest file, taking the algorithm from its name and keying
    /// entries by bag-relative path.
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (_, algorithm) = parse_manifest_file_name(&name)
            .ok_or_else(|| BagError::UnsupportedAlgorithm(name.clone()))??;

        let mut manifest = Self::new(algorithm);
        for line in Self::read_lines(path)? {
            manifest.entries.insert(PathBuf::from(line.path), line.digest);
        }
        Ok(manifest)
    }

    /// Write this manifest into `bag_dir` as `<kind>-<alg>.txt`, paths
    /// relative to `base_dir`. Returns the path written.
    pub fn write(&self, bag_dir: &Path, kind: ManifestKind, base_dir: &Path) -> Result<PathBuf> {
        let path = bag_dir.join(kind.file_name(self.algorithm));
        fs::write(&path, self.serialize(base_dir)).at(&path)?;
        Ok(path)
    }

    /// Move entries keyed under `from` so they are keyed under `to`.
    pub fn rebase(self, from: &Path, to: &Path) -> Self {
        let entries = self
            .entries
            .into_iter()
            .map(|(path, digest)| match path.strip_prefix(from) {
                Ok(relative) => (to.join(relative), digest),
                Err(_) => (path, digest),
            })
            .collect();

        Self {
            algorithm: self.algorithm,
            entries,
        }
    }
}
