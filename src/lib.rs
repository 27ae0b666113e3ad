//! # Merkle Patricia Trie
//!
//! A cryptographically verifiable mapping from byte-string keys to
//! byte-string values over a content-addressed key-value store. The whole
//! key space commits to a single 32 byte root digest.
//!
//! This crate covers the read side and the proof machinery:
//! - canonical node encoding and content-addressed persistence
//! - key lookup across the four node shapes
//! - recursive size accounting and whole-tree clearing
//! - SPV proof recording and verification layered over node decode/encode
//!
//! Mutation (insert/update/delete) belongs to external builder code, which
//! constructs node graphs with the [`Node`] constructors and the
//! [`Trie::commit`] / [`Trie::resolve`] primitives exposed here.

pub mod error;
pub mod nibbles;
pub mod node;
pub mod proof;
pub mod trie;

pub use error::TrieError;
pub use nibbles::NibblePath;
pub use node::{ChildRef, Node};
pub use proof::{prove, verify_proof, Proof, ProofMode};
pub use trie::{KeyValueStore, MemoryStore, Trie, EMPTY_ROOT};
