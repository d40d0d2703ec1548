//! Error types for ROOT file reading and writing.

use thiserror::Error;

/// Errors produced by `ks-root`.
#[derive(Debug, Error)]
pub enum RootError {
    /// Underlying filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File does not start with the `root` magic.
    #[error("not a ROOT file (bad magic)")]
    BadMagic,

    /// A read ran past the end of its buffer.
    #[error("buffer underflow at offset {offset}: need {need} bytes, have {have}")]
    BufferUnderflow {
        /// Position of the failed read.
        offset: usize,
        /// Bytes requested.
        need: usize,
        /// Bytes available.
        have: usize,
    },

    /// A compressed block could not be decoded.
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// A streamed object did not have the expected layout.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// No key with the given name exists.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The requested object is not a readable TTree.
    #[error("tree not found: {0}")]
    TreeNotFound(String),

    /// The tree has no branch with the given name.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// The object's class is not supported.
    #[error("unsupported class: {0}")]
    UnsupportedClass(String),

    /// The branch is not a flat scalar branch.
    #[error("unsupported branch '{name}': {reason}")]
    UnsupportedBranch {
        /// Branch name.
        name: String,
        /// What makes it unsupported.
        reason: String,
    },

    /// An entry index beyond the end of a tree.
    #[error("entry {index} out of range: tree has {entries} entries")]
    EntryOutOfRange {
        /// Requested entry.
        index: u64,
        /// Entries available.
        entries: u64,
    },

    /// A value was requested with an incompatible type.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The top-level directory holds no keys.
    #[error("file has no stored objects: {0}")]
    EmptyFile(String),

    /// An object could not be serialized.
    #[error("write error: {0}")]
    Write(String),
}

/// Result alias for `ks-root` operations.
pub type Result<T> = std::result::Result<T, RootError>;
