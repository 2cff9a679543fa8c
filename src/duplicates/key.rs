//! Duplicate-matching key and its persisted string encoding.
//!
//! Two files are candidates for duplication when their [`FileKey`]s are
//! equal: same final path segment, same byte count. The key is only a
//! heuristic pre-filter; distinct files may share one.
//!
//! # Encoding
//!
//! Persisted keys use `"<size>:<name byte length>:<name>"`. The name comes
//! last and its length is declared up front, so names containing `:`, empty
//! names and names that look like numbers all decode unambiguously.
//!
//! ```
//! use dupescan::duplicates::FileKey;
//!
//! let key = FileKey::new("a:b.txt", 42);
//! assert_eq!(key.encode(), "42:7:a:b.txt");
//! assert_eq!(FileKey::decode("42:7:a:b.txt").unwrap(), key);
//! ```

use std::fmt;
use std::path::Path;

/// Identity used for duplicate grouping: basename plus size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileKey {
    /// Final path segment (not the full path)
    pub name: String,
    /// File size in bytes
    pub size: u64,
}

impl FileKey {
    /// Create a key from a name and a size.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Create a key from a file path, using its final segment as the name.
    ///
    /// Non-UTF-8 names are converted lossily. A path without a final
    /// segment (such as `/`) yields an empty name.
    #[must_use]
    pub fn from_path(path: &Path, size: u64) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, size }
    }

    /// Render the key in its stable persisted form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}:{}:{}", self.size, self.name.len(), self.name)
    }

    /// Parse a key produced by [`FileKey::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`KeyDecodeError`] if the string is not in canonical form:
    /// missing separators, non-decimal fields, leading zeros, or a name whose
    /// byte length differs from the declared one.
    pub fn decode(encoded: &str) -> Result<Self, KeyDecodeError> {
        let err = |reason| KeyDecodeError {
            key: encoded.to_string(),
            reason,
        };

        let (size, rest) = encoded.split_once(':').ok_or_else(|| err("missing size"))?;
        let (len, name) = rest.split_once(':').ok_or_else(|| err("missing length"))?;

        let size = parse_decimal(size).ok_or_else(|| err("size is not a decimal number"))?;
        let len = parse_decimal(len).ok_or_else(|| err("length is not a decimal number"))?;

        if name.len() as u64 != len {
            return Err(err("name length does not match declared length"));
        }

        Ok(Self::new(name, size))
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.size)
    }
}

/// Canonical unsigned decimal: digits only, no sign, no leading zeros.
fn parse_decimal(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if s.len() > 1 && s.starts_with('0') {
        return None;
    }
    s.parse().ok()
}

/// A persisted key that could not be decoded.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid file key {key:?}: {reason}")]
pub struct KeyDecodeError {
    /// The offending encoded key
    pub key: String,
    /// What was wrong with it
    pub reason: &'static str,
}
