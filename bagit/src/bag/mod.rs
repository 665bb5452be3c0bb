//! In-memory model of a bag and its on-disk tag files.

pub mod fetch;
pub mod manifest;
pub mod tagfile;

use crate::utils::{BagError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use fetch::FetchItem;
pub use manifest::{Manifest, ManifestKind};

/// Name of the payload directory under the bag root.
pub const DATA_DIR: &str = "data";

/// Name of the bag declaration tag file.
pub const BAGIT_FILE: &str = "bagit.txt";

/// Name of the fetch list tag file.
pub const FETCH_FILE: &str = "fetch.txt";

/// Character encoding declared for every tag file.
pub const FILE_ENCODING: &str = "utf-8";

/// BagIt version declared in `bagit.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::new(0, 97)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BagError::InvalidVersion(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Version {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = BagError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

/// A malformed line in one of the bag's text files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line number; 0 when the problem is with the file as a whole
    pub line: usize,
    pub reason: String,
}

impl LineError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }

    /// A problem not tied to any one line, such as a missing declaration.
    pub fn whole_file(reason: impl Into<String>) -> Self {
        Self::new(0, reason)
    }

    /// Attach the file the line came from.
    pub fn in_file(self, path: &Path) -> BagError {
        if self.line == 0 {
            return BagError::Malformed {
                path: path.to_path_buf(),
                reason: self.reason,
            };
        }
        BagError::Parse {
            path: path.to_path_buf(),
            line: self.line,
            reason: self.reason,
        }
    }
}

/// Split off the first whitespace-delimited field; the rest has its leading
/// whitespace run removed.
pub(crate) fn split_first_field(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim_start()),
        None => (line, ""),
    }
}

/// Descriptor of one bag, populated while bagging a directory.
///
/// Not persisted as such; its durable form is the set of tag files and the
/// `data/` directory under `root_dir`.
#[derive(Debug, Clone)]
pub struct Bag {
    pub root_dir: PathBuf,
    pub version: Version,
    pub file_encoding: &'static str,
    pub fetch_items: Vec<FetchItem>,
    pub payload_manifests: Vec<Manifest>,
    pub tag_manifests: Vec<Manifest>,
    pub metadata: BTreeMap<String, String>,
}

impl Bag {
    pub fn new(root_dir: impl Into<PathBuf>, version: Version) -> Self {
        Self {
            root_dir: root_dir.into(),
            version,
            file_encoding: FILE_ENCODING,
            fetch_items: Vec::new(),
            payload_manifests: Vec::new(),
            tag_manifests: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root_dir.join(DATA_DIR)
    }

    /// Payload manifest for `algorithm`, if one was built.
    pub fn payload_manifest(&self, algorithm: crate::checksum::Algorithm) -> Option<&Manifest> {
        self.payload_manifests
            .iter()
            .find(|m| m.algorithm() == algorithm)
    }

    /// `Payload-Oxum` style summary: total bytes and file count of the payload.
    pub fn set_payload_oxum(&mut self, total_bytes: u64, total_files: usize) {
        self.metadata.insert(
            "Payload-Oxum".to_string(),
            format!("{}.{}", total_bytes, total_files),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_display_and_parse() -> Result<()> {
        let version: Version = "1.0".parse()?;
        assert_eq!(version, Version::new(1, 0));
        assert_eq!(Version::default().to_string(), "0.97");
        Ok(())
    }

    #[test]
    fn test_version_rejects_garbage() {
        assert!(matches!(
            "one.two".parse::<Version>(),
            Err(BagError::InvalidVersion(_))
        ));
        assert!("1".parse::<Version>().is_err());
    }

    #[test]
    fn test_split_first_field() {
        assert_eq!(split_first_field("abc  data/a b.txt"), ("abc", "data/a b.txt"));
        assert_eq!(split_first_field("abc\tdata/x"), ("abc", "data/x"));
        assert_eq!(split_first_field("abc"), ("abc", ""));
    }

    #[test]
    fn test_new_bag_uses_given_root() {
        let bag = Bag::new("/tmp/some-bag", Version::default());
        assert_eq!(bag.root_dir, PathBuf::from("/tmp/some-bag"));
        assert_eq!(bag.data_dir(), PathBuf::from("/tmp/some-bag/data"));
        assert_eq!(bag.file_encoding, "utf-8");
        assert!(bag.payload_manifests.is_empty());
    }

    #[test]
    fn test_payload_oxum() {
        let mut bag = Bag::new("/tmp/b", Version::default());
        bag.set_payload_oxum(10, 2);
        assert_eq!(bag.metadata.get("Payload-Oxum").map(String::as_str), Some("10.2"));
    }
}
