//! Bag completeness and validity checks.
//!
//! Structural problems are reported as a [`Violation`] inside a
//! [`CheckReport`], so a caller can keep going through a batch of bags.
//! I/O, parse and unsupported-algorithm failures are errors.

use crate::bag::fetch::read_fetch_file;
use crate::bag::manifest::{discover_manifests, Manifest, ManifestFile, ManifestKind};
use crate::bag::tagfile::read_bagit_file;
use crate::bag::{BAGIT_FILE, DATA_DIR, FETCH_FILE};
use crate::checksum::{hash_file_with_buffer, Algorithm, READ_BUFFER};
use crate::fs::walker::{walk_directory, WalkOptions};
use crate::utils::Result;
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Why a bag is not complete or not valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    MissingBagitFile,
    MissingPayloadDirectory,
    NoPayloadManifest,
    ManifestEntryMissing {
        manifest: String,
        path: String,
    },
    FetchItemMissing {
        path: String,
    },
    /// An entry in a manifest or `fetch.txt` points outside the bag root.
    PathOutsideBag {
        listed_in: String,
        path: String,
    },
    UnlistedPayloadFile {
        path: String,
    },
    ChecksumMismatch {
        manifest: String,
        path: String,
        algorithm: Algorithm,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingBagitFile => write!(f, "{} does not exist", BAGIT_FILE),
            Violation::MissingPayloadDirectory => {
                write!(f, "{}/ does not exist or is not a directory", DATA_DIR)
            }
            Violation::NoPayloadManifest => {
                write!(f, "could not find at least one payload manifest")
            }
            Violation::ManifestEntryMissing { manifest, path } => {
                write!(f, "file {} is listed in {} but does not exist", path, manifest)
            }
            Violation::FetchItemMissing { path } => {
                write!(f, "file {} is listed in {} but does not exist", path, FETCH_FILE)
            }
            Violation::PathOutsideBag { listed_in, path } => {
                write!(f, "{} lists {} which is outside the bag", listed_in, path)
            }
            Violation::UnlistedPayloadFile { path } => {
                write!(f, "file {} is not in any manifest", path)
            }
            Violation::ChecksumMismatch {
                manifest,
                path,
                algorithm,
                expected,
                actual,
            } => write!(
                f,
                "file {} has {} {} but {} expects {}",
                path, algorithm, actual, manifest, expected
            ),
        }
    }
}

/// Outcome of checking one bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub bag_dir: PathBuf,
    /// First failing check, if any
    pub violation: Option<Violation>,
}

impl CheckReport {
    fn pass(bag_dir: &Path) -> Self {
        Self {
            bag_dir: bag_dir.to_path_buf(),
            violation: None,
        }
    }

    fn fail(bag_dir: &Path, violation: Violation) -> Self {
        Self {
            bag_dir: bag_dir.to_path_buf(),
            violation: Some(violation),
        }
    }

    pub fn passed(&self) -> bool {
        self.violation.is_none()
    }
}

/// Check that `bag_dir` is structurally complete.
///
/// Evaluated in order, stopping at the first failure:
/// 1. `bagit.txt` exists
/// 2. `data/` is a directory
/// 3. at least one `manifest-<alg>.txt` exists
/// 4. every path in every manifest and tag manifest exists
/// 5. every path in `fetch.txt` exists
/// 6. every file under `data/` appears in at least one payload manifest
///
/// Entries that resolve outside the bag root fail with
/// [`Violation::PathOutsideBag`].
pub fn check_complete(bag_dir: &Path) -> Result<CheckReport> {
    let report = run_completeness(bag_dir)?;
    log_report("complete", &report);
    Ok(report)
}

fn run_completeness(bag_dir: &Path) -> Result<CheckReport> {
    if !bag_dir.join(BAGIT_FILE).is_file() {
        return Ok(CheckReport::fail(bag_dir, Violation::MissingBagitFile));
    }
    if let Ok(declaration) = read_bagit_file(bag_dir) {
        debug!(
            "{} declares BagIt {} ({})",
            bag_dir.display(),
            declaration.version,
            declaration.encoding
        );
    }

    let data_dir = bag_dir.join(DATA_DIR);
    if !data_dir.is_dir() {
        return Ok(CheckReport::fail(bag_dir, Violation::MissingPayloadDirectory));
    }

    let manifests = discover_manifests(bag_dir)?;
    if !manifests.iter().any(|m| m.kind == ManifestKind::Payload) {
        return Ok(CheckReport::fail(bag_dir, Violation::NoPayloadManifest));
    }

    // Only payload manifests count towards covering files under data/.
    let mut in_payload_manifest = HashSet::new();
    for manifest in &manifests {
        let name = manifest_name(manifest);
        for line in Manifest::read_lines(&manifest.path)? {
            let Some(path) = bag_relative(&line.path) else {
                return Ok(CheckReport::fail(
                    bag_dir,
                    Violation::PathOutsideBag {
                        listed_in: name,
                        path: line.path,
                    },
                ));
            };
            if !bag_dir.join(&path).is_file() {
                return Ok(CheckReport::fail(
                    bag_dir,
                    Violation::ManifestEntryMissing {
                        manifest: name,
                        path,
                    },
                ));
            }
            if manifest.kind == ManifestKind::Payload {
                in_payload_manifest.insert(path);
            }
        }
    }

    let fetch_file = bag_dir.join(FETCH_FILE);
    if fetch_file.is_file() {
        for item in read_fetch_file(&fetch_file)? {
            let Some(path) = bag_relative(&item.path) else {
                return Ok(CheckReport::fail(
                    bag_dir,
                    Violation::PathOutsideBag {
                        listed_in: FETCH_FILE.to_string(),
                        path: item.path,
                    },
                ));
            };
            if !bag_dir.join(&path).is_file() {
                return Ok(CheckReport::fail(bag_dir, Violation::FetchItemMissing { path }));
            }
        }
    }

    for file in walk_directory(&data_dir, WalkOptions::default())? {
        let path = format!("{}/{}", DATA_DIR, file.slash_path());
        if !in_payload_manifest.contains(&path) {
            return Ok(CheckReport::fail(bag_dir, Violation::UnlistedPayloadFile { path }));
        }
    }

    Ok(CheckReport::pass(bag_dir))
}

/// Check that `bag_dir` is complete and that every manifest digest matches
/// the file on disk. Digests compare case-sensitively.
pub fn check_valid(bag_dir: &Path) -> Result<CheckReport> {
    check_valid_with_buffer(bag_dir, READ_BUFFER)
}

/// [`check_valid`] with an explicit read block size.
pub fn check_valid_with_buffer(bag_dir: &Path, block_size: usize) -> Result<CheckReport> {
    let complete = run_completeness(bag_dir)?;
    if !complete.passed() {
        log_report("valid", &complete);
        return Ok(complete);
    }

    let report = run_validity(bag_dir, block_size)?;
    log_report("valid", &report);
    Ok(report)
}

fn run_validity(bag_dir: &Path, block_size: usize) -> Result<CheckReport> {
    for manifest in discover_manifests(bag_dir)? {
        let name = manifest_name(&manifest);
        for line in Manifest::read_lines(&manifest.path)? {
            let Some(path) = bag_relative(&line.path) else {
                return Ok(CheckReport::fail(
                    bag_dir,
                    Violation::PathOutsideBag {
                        listed_in: name,
                        path: line.path,
                    },
                ));
            };
            let full_path = bag_dir.join(&path);
            if !full_path.is_file() {
                return Ok(CheckReport::fail(
                    bag_dir,
                    Violation::ManifestEntryMissing {
                        manifest: name,
                        path,
                    },
                ));
            }

            let actual = hash_file_with_buffer(&full_path, manifest.algorithm, block_size)?;
            if actual != line.digest {
                return Ok(CheckReport::fail(
                    bag_dir,
                    Violation::ChecksumMismatch {
                        manifest: name,
                        path,
                        algorithm: manifest.algorithm,
                        expected: line.digest,
                        actual,
                    },
                ));
            }
        }
        debug!("{} verified", manifest.path.display());
    }

    Ok(CheckReport::pass(bag_dir))
}

/// `true` when [`check_complete`] finds no violation.
pub fn is_complete(bag_dir: &Path) -> Result<bool> {
    Ok(check_complete(bag_dir)?.passed())
}

/// `true` when [`check_valid`] finds no violation.
pub fn is_valid(bag_dir: &Path) -> Result<bool> {
    Ok(check_valid(bag_dir)?.passed())
}

/// `/`-joined form of a bag-relative path, or `None` if it is absolute or
/// climbs out with `..`.
fn bag_relative(path: &str) -> Option<String> {
    let mut parts = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

fn manifest_name(manifest: &ManifestFile) -> String {
    manifest
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| manifest.path.display().to_string())
}

fn log_report(check: &str, report: &CheckReport) {
    match &report.violation {
        None => debug!("Bag {} is {}", report.bag_dir.display(), check),
        Some(violation) => debug!(
            "Bag {} is not {}: {}",
            report.bag_dir.display(),
            check,
            violation
        ),
    }
}
