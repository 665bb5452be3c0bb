//! `bagit.txt` declaration file.

use super::{LineError, Version, BAGIT_FILE};
use crate::utils::{IoContext, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of `bagit.txt`.
pub fn render_bagit_file(version: Version) -> String {
    format!(
        "BagIt-Version: {}\nTag-File-Character-Encoding: UTF-8\n",
        version
    )
}

/// Write `bagit.txt` into `bag_dir`, returning the path written.
pub fn write_bagit_file(bag_dir: &Path, version: Version) -> Result<PathBuf> {
    let path = bag_dir.join(BAGIT_FILE);
    fs::write(&path, render_bagit_file(version)).at(&path)?;
    Ok(path)
}

/// Declarations found in `bagit.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagDeclaration {
    pub version: Version,
    pub encoding: String,
}

/// Parse `bagit.txt` contents. `BagIt-Version` is required; the encoding
/// defaults to UTF-8 when absent.
pub fn parse_bagit_file(text: &str) -> std::result::Result<BagDeclaration, LineError> {
    let mut version = None;
    let mut encoding = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| LineError::new(idx + 1, "expected `<label>: <value>`"))?;

        match key.trim() {
            "BagIt-Version" => {
                let parsed = value
                    .trim()
                    .parse::<Version>()
                    .map_err(|e| LineError::new(idx + 1, e.to_string()))?;
                version = Some(parsed);
            }
            "Tag-File-Character-Encoding" => encoding = Some(value.trim().to_string()),
            _ => {}
        }
    }

    let version =
        version.ok_or_else(|| LineError::whole_file("missing BagIt-Version declaration"))?;
    Ok(BagDeclaration {
        version,
        encoding: encoding.unwrap_or_else(|| "UTF-8".to_string()),
    })
}

/// Read and parse `bagit.txt` from `bag_dir`.
pub fn read_bagit_file(bag_dir: &Path) -> Result<BagDeclaration> {
    let path = bag_dir.join(BAGIT_FILE);
    let text = fs::read_to_string(&path).at(&path)?;
    parse_bagit_file(&text).map_err(|e| e.in_file(&path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::BagError;
    use tempfile::TempDir;

    #[test]
    fn test_render_has_two_declarations() {
        let text = render_bagit_file(Version::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["BagIt-Version: 0.97", "Tag-File-Character-Encoding: UTF-8"]
        );
    }

    #[test]
    fn test_write_then_read() -> Result<()> {
        let temp_dir = TempDir::new()?;
        write_bagit_file(temp_dir.path(), Version::new(1, 0))?;

        let decl = read_bagit_file(temp_dir.path())?;
        assert_eq!(decl.version, Version::new(1, 0));
        assert_eq!(decl.encoding, "UTF-8");
        Ok(())
    }

    #[test]
    fn test_missing_version() {
        let err = parse_bagit_file("Tag-File-Character-Encoding: UTF-8\n").unwrap_err();
        assert!(err.reason.contains("BagIt-Version"));
    }

    #[test]
    fn test_empty_bagit_file_is_malformed() -> Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(BAGIT_FILE), "")?;

        let err = read_bagit_file(temp_dir.path()).unwrap_err();
        assert!(matches!(err, BagError::Malformed { .. }));
        let message = err.to_string();
        assert!(message.contains("missing BagIt-Version"));
        assert!(!message.contains("line 0"));
        Ok(())
    }

    #[test]
    fn test_bad_line() {
        let err = parse_bagit_file("BagIt-Version: 0.97\nnonsense\n").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
