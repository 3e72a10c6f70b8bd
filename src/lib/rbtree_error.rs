use std::fmt;

/// Errors reported by tree operations, cursors and enumerators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// `insert` was called with a key that is already present.
    DuplicateKey,
    /// A lookup that must succeed found no entry for the key.
    KeyNotFound,
    /// A cursor or enumerator was used after the tree was structurally modified.
    InvalidatedByMutation,
    /// A positional accessor was given an index past the end.
    IndexOutOfRange {
        /// The requested position.
        index: usize,
        /// Number of entries at the time of the call.
        len: usize,
    },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::DuplicateKey => write!(f, "key is already present in the tree"),
            TreeError::KeyNotFound => write!(f, "key not found"),
            TreeError::InvalidatedByMutation => {
                write!(f, "tree was modified after the cursor was created")
            }
            TreeError::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range for tree of length {}", index, len)
            }
        }
    }
}

impl std::error::Error for TreeError {}
