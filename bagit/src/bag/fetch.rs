//! `fetch.txt` parsing.
//!
//! Each line is `<url> <length> <relative-path>`; a length of `-` means the
//! size is unknown. Items are only read here, never downloaded.

use super::{split_first_field, LineError};
use crate::utils::{IoContext, Result};
use std::fs;
use std::path::Path;

/// A payload file meant to be fetched from a URL rather than stored locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchItem {
    pub url: String,
    pub length: Option<u64>,
    pub path: String,
}

/// Parse the contents of a `fetch.txt` file. Blank lines are ignored.
pub fn parse_fetch(text: &str) -> std::result::Result<Vec<FetchItem>, LineError> {
    let mut items = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (url, rest) = split_first_field(line);
        let (length, path) = split_first_field(rest);
        if path.is_empty() {
            return Err(LineError::new(idx + 1, "expected `<url> <length> <path>`"));
        }

        let length = match length {
            "-" => None,
            n => Some(
                n.parse::<u64>()
                    .map_err(|_| LineError::new(idx + 1, format!("invalid length `{}`", n)))?,
            ),
        };

        items.push(FetchItem {
            url: url.to_string(),
            length,
            path: path.to_string(),
        });
    }

    Ok(items)
}

/// Read `fetch.txt` from disk.
pub fn read_fetch_file(path: &Path) -> Result<Vec<FetchItem>> {
    let text = fs::read_to_string(path).at(path)?;
    parse_fetch(&text).map_err(|e| e.in_file(path))
}
