//! Streaming file digests for bag manifests.
//!
//! Files are read in fixed-size blocks so memory use stays bounded no matter
//! how large the payload is.

use crate::utils::{BagError, IoContext, Result};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Default read block size (1MB)
pub const READ_BUFFER: usize = 1024 * 1024;

/// Checksum algorithms a manifest may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Md5,
        Algorithm::Sha1,
        Algorithm::Sha256,
        Algorithm::Sha512,
    ];

    /// Lowercase name as it appears in manifest filenames.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha512 => "sha512",
        }
    }

    fn hasher(self) -> Hasher {
        match self {
            Algorithm::Md5 => Hasher::Md5(md5::Context::new()),
            Algorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            Algorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            Algorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = BagError;

    fn from_str(s: &str) -> Result<Self> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| BagError::UnsupportedAlgorithm(s.to_string()))
    }
}

impl TryFrom<String> for Algorithm {
    type Error = BagError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.name().to_string()
    }
}

/// Incremental hashing state for one file.
enum Hasher {
    Md5(md5::Context),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn update(&mut self, block: &[u8]) {
        match self {
            Hasher::Md5(ctx) => ctx.consume(block),
            Hasher::Sha1(h) => h.update(block),
            Hasher::Sha256(h) => h.update(block),
            Hasher::Sha512(h) => h.update(block),
        }
    }

    fn finish_hex(self) -> String {
        match self {
            Hasher::Md5(ctx) => format!("{:x}", ctx.finalize()),
            Hasher::Sha1(h) => hex::encode(h.finalize()),
            Hasher::Sha256(h) => hex::encode(h.finalize()),
            Hasher::Sha512(h) => hex::encode(h.finalize()),
        }
    }
}

/// Hash everything `reader` yields, `block_size` bytes at a time.
pub fn hash_reader<R: Read>(
    mut reader: R,
    algorithm: Algorithm,
    block_size: usize,
) -> io::Result<String> {
    let mut hasher = algorithm.hasher();
    let mut buffer = vec![0u8; block_size.max(1)];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finish_hex())
}

/// Lowercase hex digest of a file's full contents.
///
/// # Arguments
/// * `path` - File to digest
/// * `algorithm` - Checksum algorithm
///
/// # Returns
/// * `Ok(String)` - Hex digest
/// * `Err(BagError::IoAt)` - If the file cannot be opened or read
pub fn hash_file(path: &Path, algorithm: Algorithm) -> Result<String> {
    hash_file_with_buffer(path, algorithm, READ_BUFFER)
}

/// Same as [`hash_file`] with an explicit read block size.
pub fn hash_file_with_buffer(path: &Path, algorithm: Algorithm, block_size: usize) -> Result<String> {
    let file = File::open(path).at(path)?;
    hash_reader(file, algorithm, block_size).at(path)
}

/// Parse an algorithm name and digest the file in one go.
pub fn hash_file_named(path: &Path, algorithm: &str) -> Result<String> {
    let algorithm: Algorithm = algorithm.parse()?;
    hash_file(path, algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("hello.txt");
        fs::write(&path, b"hello")?;

        assert_eq!(hash_file(&path, Algorithm::Md5)?, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(
            hash_file(&path, Algorithm::Sha1)?,
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
        assert_eq!(
            hash_file(&path, Algorithm::Sha256)?,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(hash_file(&path, Algorithm::Sha512)?.len(), 128);

        Ok(())
    }

    #[test]
    fn test_small_blocks_match_single_read() -> Result<()> {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        let whole = hash_reader(&data[..], Algorithm::Sha256, READ_BUFFER)?;
        let chunked = hash_reader(&data[..], Algorithm::Sha256, 7)?;
        assert_eq!(whole, chunked);

        Ok(())
    }

    #[test]
    fn test_empty_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("empty");
        fs::write(&path, b"")?;

        assert_eq!(hash_file(&path, Algorithm::Md5)?, "d41d8cd98f00b204e9800998ecf8427e");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = hash_file(Path::new("/nonexistent/bagit/file"), Algorithm::Md5).unwrap_err();
        assert!(matches!(err, BagError::IoAt { .. }));
    }

    #[test]
    fn test_unsupported_name() {
        let err = hash_file_named(Path::new("/nonexistent"), "crc32").unwrap_err();
        assert!(matches!(err, BagError::UnsupportedAlgorithm(name) if name == "crc32"));
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("SHA256".parse::<Algorithm>().is_err());
        assert_eq!("sha256".parse::<Algorithm>().unwrap(), Algorithm::Sha256);
    }
}
