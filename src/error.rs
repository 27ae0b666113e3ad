//! # Error types for the trie core

use thiserror::Error;

/// Trie error types.
///
/// All variants signal data corruption or caller mistakes and are never
/// retried. Store failures keep their own variant and pass through the
/// engine unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrieError {
    #[error("malformed node: not a 2 or 17 item sequence")]
    MalformedNode,

    #[error("unrecognized node shape")]
    MalformedNodeType,

    #[error("invalid root digest: expected 0 or 32 bytes, got {0}")]
    InvalidRootDigest(usize),

    #[error("proof does not cover a required node")]
    InvalidProof,

    #[error("node not found in store: {0}")]
    NodeNotFound(String),

    #[error("RLP decode error: {0}")]
    RlpDecode(String),
}

/// Result type for trie operations
pub type Result<T> = std::result::Result<T, TrieError>;
