/// Errors raised while opening or navigating a registry hive.
///
/// The loader only cares about one distinction: whether the bytes were
/// readable but did not look like a hive ([`HiveError::Structure`]), or
/// something more basic went wrong (I/O, a file too small to hold even the
/// signature). Both end up as a failed artifact, with different diagnostics.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HiveError {
    /// The file could not be read.
    #[error("I/O error reading hive: {0}")]
    Io(#[from] std::io::Error),

    /// The file is shorter than the `regf` signature.
    #[error("file is {len} bytes, too small to contain a hive header")]
    Truncated { len: usize },

    /// The byte stream does not match the hive layout.
    #[error("malformed hive: {0}")]
    Structure(String),

    /// A key path component did not resolve.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A named value is absent from a key.
    #[error("value '{value}' not found in key '{key}'")]
    ValueNotFound { key: String, value: String },
}

impl HiveError {
    /// `true` for errors caused by a layout mismatch rather than by I/O or
    /// a degenerate (near-empty) file.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structure(_))
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_structure_errors_are_structural() {
        assert!(HiveError::structure("bad sig").is_structural());
        assert!(!HiveError::Truncated { len: 0 }.is_structural());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!HiveError::from(io).is_structural());
        assert!(!HiveError::KeyNotFound("Select".into()).is_structural());
    }

    #[test]
    fn truncated_message_mentions_size() {
        let msg = HiveError::Truncated { len: 2 }.to_string();
        assert!(msg.contains("2 bytes"), "got: {msg}");
    }
}
