//! Error types for bag creation and verification.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BagError {
    #[error("Unsupported checksum algorithm: {0} (expected one of md5, sha1, sha256, sha512)")]
    UnsupportedAlgorithm(String),

    #[error("I/O error on {}: {source}", .path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Parse error in {}, line {line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Malformed {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    #[error("Path is not valid UTF-8 and cannot be listed in a manifest: {}", .0.display())]
    NonUtf8Path(PathBuf),

    #[error("Invalid BagIt version: {0}")]
    InvalidVersion(String),

    #[error("Directory is already bagged: {} exists", .0.display())]
    AlreadyBagged(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Destination is not empty: {}", .0.display())]
    DestinationNotEmpty(PathBuf),

    #[error("Name collision while copying into bag: {}", .0.display())]
    NameCollision(PathBuf),

    #[error("Bagging step '{step}' failed: {source}")]
    Step {
        step: BagStep,
        #[source]
        source: Box<BagError>,
    },

    #[error(
        "{source}; rollback incomplete, unrestored entries kept in {}",
        .staging.display()
    )]
    RollbackIncomplete {
        staging: PathBuf,
        #[source]
        source: Box<BagError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BagError {
    /// Attach the offending path to an I/O error.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BagError::IoAt {
            path: path.into(),
            source,
        }
    }
}

/// Stages of in-place bagging, used to report where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagStep {
    CreateDataDirectory,
    MovePayload,
    WriteBagitFile,
    BuildManifest,
    WriteManifest,
    Commit,
    CopyPayload,
    WriteTagManifest,
}

impl std::fmt::Display for BagStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BagStep::CreateDataDirectory => "create data directory",
            BagStep::MovePayload => "move payload",
            BagStep::WriteBagitFile => "write bagit.txt",
            BagStep::BuildManifest => "build payload manifest",
            BagStep::WriteManifest => "write payload manifest",
            BagStep::Commit => "commit bag layout",
            BagStep::CopyPayload => "copy payload",
            BagStep::WriteTagManifest => "write tag manifest",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, BagError>;

/// Extension for tagging a failure with the bagging step it belongs to.
pub trait StepContext<T> {
    fn step(self, step: BagStep) -> Result<T>;
}

impl<T> StepContext<T> for Result<T> {
    fn step(self, step: BagStep) -> Result<T> {
        self.map_err(|e| BagError::Step {
            step,
            source: Box::new(e),
        })
    }
}

/// Extension for tagging `io::Result`s with the path they concern.
pub trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| BagError::io_at(path, e))
    }
}
