//! # Trie engine
//!
//! Root lifecycle, lookup, size and clear over a content-addressed node
//! store. Mutation lives in external builder code, which reuses the
//! [`Trie::commit`] / [`Trie::resolve`] primitives and installs new roots
//! via [`Trie::set_root_node`].

use std::collections::HashMap;

use alloy_primitives::{keccak256, B256};
use log::{debug, trace};

use crate::error::{Result, TrieError};
use crate::nibbles::NibblePath;
use crate::node::{ChildRef, Node};
use crate::proof::{ProofLedger, ProofMode};

/// Root digest of the blank trie (keccak256 of the RLP empty string)
pub const EMPTY_ROOT: B256 = B256::new([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6,
    0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0,
    0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

/// Backing store for node encodings, keyed by content digest.
///
/// Because keys are content digests, a given key is only ever written with
/// one value. There is no delete: storage lifetime is indefinite once a
/// node is persisted.
pub trait KeyValueStore {
    /// Fetch the bytes stored under a digest.
    ///
    /// A missing key is the store's own failure signal; the engine
    /// propagates it unchanged.
    fn get(&self, key: &B256) -> Result<Vec<u8>>;

    /// Store bytes under a digest
    fn put(&mut self, key: B256, value: Vec<u8>) -> Result<()>;
}

/// In-memory node store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    nodes: HashMap<B256, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            nodes: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &B256) -> Result<Vec<u8>> {
        self.nodes
            .get(key)
            .cloned()
            .ok_or_else(|| TrieError::NodeNotFound(hex::encode(key)))
    }

    fn put(&mut self, key: B256, value: Vec<u8>) -> Result<()> {
        self.nodes.insert(key, value);
        Ok(())
    }
}

/// Merkle Patricia Trie engine
#[derive(Debug)]
pub struct Trie<S: KeyValueStore> {
    /// Node store
    store: S,
    /// Live root node
    root: Node,
    /// A transient trie caches its root digest without materializing a graph
    transient: bool,
    transient_root: B256,
    /// Proof bookkeeping for the current session
    ledger: ProofLedger,
}

impl<S: KeyValueStore> Trie<S> {
    /// Create an empty trie
    pub fn new(store: S) -> Self {
        Trie {
            store,
            root: Node::Blank,
            transient: false,
            transient_root: EMPTY_ROOT,
            ledger: ProofLedger::default(),
        }
    }

    /// Open a trie at an existing root digest
    pub fn new_at(store: S, digest: &[u8]) -> Result<Self> {
        let mut trie = Trie::new(store);
        trie.set_root_hash(digest)?;
        Ok(trie)
    }

    /// Create a transient trie: the digest is cached verbatim and no node
    /// graph is ever materialized or persisted. Reads (`get`, `size`)
    /// answer from a blank graph regardless of the cached digest; only the
    /// digest itself round-trips through `root_hash`/`set_root_hash`.
    pub fn new_transient(store: S, digest: B256) -> Self {
        Trie {
            store,
            root: Node::Blank,
            transient: true,
            transient_root: digest,
            ledger: ProofLedger::default(),
        }
    }

    /// Access the backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check if the trie is blank
    pub fn is_blank(&self) -> bool {
        if self.transient {
            self.transient_root == EMPTY_ROOT
        } else {
            self.root.is_blank()
        }
    }

    /// Root digest committing to the whole key space.
    ///
    /// The root node is always persisted under its digest, inline threshold
    /// or not: callers re-open the trie by digest alone. Its encoding is
    /// also registered with the proof session, since the root is both
    /// stored and provable.
    pub fn root_hash(&mut self) -> Result<B256> {
        if self.transient {
            return Ok(self.transient_root);
        }
        if self.root.is_blank() {
            return Ok(EMPTY_ROOT);
        }

        let encoded = self.root.rlp_encode();
        let digest = keccak256(&encoded);
        self.store.put(digest, encoded.clone())?;
        self.ledger.on_persist(&encoded);
        self.ledger.on_fetch(&encoded)?;
        Ok(digest)
    }

    /// Replace the root wholesale from a digest.
    ///
    /// The digest must be empty (blank trie) or exactly 32 bytes; anything
    /// else is rejected before the store is touched.
    pub fn set_root_hash(&mut self, digest: &[u8]) -> Result<()> {
        if !digest.is_empty() && digest.len() != 32 {
            return Err(TrieError::InvalidRootDigest(digest.len()));
        }

        if self.transient {
            self.transient_root = if digest.is_empty() {
                EMPTY_ROOT
            } else {
                B256::from_slice(digest)
            };
            return Ok(());
        }

        if digest.is_empty() || digest == EMPTY_ROOT.as_slice() {
            self.root = Node::Blank;
            return Ok(());
        }

        trace!("opening root {}", hex::encode(digest));
        self.root = self.fetch_node(&B256::from_slice(digest))?;
        Ok(())
    }

    /// Replace the live root node. Builder seam for external mutation code.
    pub fn set_root_node(&mut self, node: Node) {
        self.root = node;
    }

    /// Look up the value stored under a byte key
    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let path = NibblePath::from_key(key);
        let root = self.root.clone();
        self.lookup(&root, &path)
    }

    fn lookup(&mut self, node: &Node, path: &NibblePath) -> Result<Option<Vec<u8>>> {
        match node {
            Node::Blank => Ok(None),

            Node::Leaf { path: suffix, value } => Ok(if suffix == path {
                Some(value.clone())
            } else {
                None
            }),

            Node::Extension { path: prefix, child } => {
                if !path.starts_with(prefix) {
                    return Ok(None);
                }
                let child_node = self.resolve(child)?;
                self.lookup(&child_node, &path.skip(prefix.len()))
            }

            Node::Branch { children, value } => match path.first() {
                None => Ok(value.clone()),
                Some(nibble) => {
                    let child_node = self.resolve(&children[nibble as usize])?;
                    self.lookup(&child_node, &path.skip(1))
                }
            },
        }
    }

    /// Number of (key, value) pairs reachable from the root.
    ///
    /// Topology-blind: a subtree reachable from two parents is counted once
    /// per parent.
    pub fn size(&mut self) -> Result<u64> {
        let root = self.root.clone();
        self.count_pairs(&root)
    }

    fn count_pairs(&mut self, node: &Node) -> Result<u64> {
        match node {
            Node::Blank => Ok(0),
            Node::Leaf { .. } => Ok(1),
            Node::Extension { child, .. } => {
                let child_node = self.resolve(child)?;
                self.count_pairs(&child_node)
            }
            Node::Branch { children, value } => {
                let mut total = u64::from(value.is_some());
                for child in children.iter() {
                    let child_node = self.resolve(child)?;
                    total += self.count_pairs(&child_node)?;
                }
                Ok(total)
            }
        }
    }

    /// Drop the whole trie.
    ///
    /// Every reachable node is visited, but stored bytes are left in place:
    /// two semantically distinct nodes can serialize to identical bytes and
    /// share a storage slot, so deleting by digest could corrupt an
    /// unrelated trie. Only the live root pointer is reset.
    pub fn clear(&mut self) -> Result<()> {
        if self.transient {
            self.transient_root = EMPTY_ROOT;
            return Ok(());
        }

        debug!("clearing trie");
        let root = std::mem::take(&mut self.root);
        self.delete_subtree(&root)?;
        self.delete_storage(&root);
        self.root = Node::Blank;
        Ok(())
    }

    fn delete_subtree(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Blank | Node::Leaf { .. } => Ok(()),
            Node::Extension { child, .. } => {
                let child_node = self.resolve(child)?;
                self.delete_subtree(&child_node)?;
                self.delete_storage(&child_node);
                Ok(())
            }
            Node::Branch { children, .. } => {
                for child in children.iter() {
                    let child_node = self.resolve(child)?;
                    self.delete_subtree(&child_node)?;
                    self.delete_storage(&child_node);
                }
                Ok(())
            }
        }
    }

    /// Deliberate no-op, see [`Trie::clear`]
    fn delete_storage(&mut self, _node: &Node) {}

    /// Decode a child reference into a live node, fetching stored
    /// references from the backing store
    pub fn resolve(&mut self, child: &ChildRef) -> Result<Node> {
        match child {
            ChildRef::Absent => Ok(Node::Blank),
            ChildRef::Inline(node) => Ok((**node).clone()),
            ChildRef::Stored(digest) => self.fetch_node(digest),
        }
    }

    fn fetch_node(&mut self, digest: &B256) -> Result<Node> {
        let encoding = self.store.get(digest)?;
        self.ledger.on_fetch(&encoding)?;
        Node::rlp_decode(&encoding)
    }

    /// Encode a node and return the reference a parent should hold: the
    /// node itself below the 32 byte threshold, otherwise the digest of the
    /// persisted encoding
    pub fn commit(&mut self, node: &Node) -> Result<ChildRef> {
        if node.is_blank() {
            return Ok(ChildRef::Absent);
        }

        let encoded = node.rlp_encode();
        if encoded.len() < 32 {
            return Ok(ChildRef::Inline(Box::new(node.clone())));
        }

        let digest = keccak256(&encoded);
        trace!("storing node {}", hex::encode(digest));
        self.store.put(digest, encoded.clone())?;
        self.ledger.on_persist(&encoded);
        Ok(ChildRef::Stored(digest))
    }

    /// Start recording fetched node encodings for a proof
    pub fn begin_recording(&mut self) {
        self.ledger.start(ProofMode::Recording, Vec::new());
    }

    /// End a recording session and take the node bag a verifier needs
    pub fn finish_recording(&mut self) -> Vec<Vec<u8>> {
        let nodes = self.ledger.recorded_nodes();
        self.ledger.stop();
        nodes
    }

    /// Start verifying against a supplied node bag: every fetch must find
    /// its encoding in the bag or the operation fails with `InvalidProof`
    pub fn begin_verifying(&mut self, nodes: Vec<Vec<u8>>) {
        self.ledger.start(ProofMode::Verifying, nodes);
    }

    /// End a verifying session
    pub fn finish_verifying(&mut self) {
        self.ledger.stop();
    }

    /// Current proof session mode
    pub fn proof_mode(&self) -> ProofMode {
        self.ledger.mode()
    }
}

impl Trie<MemoryStore> {
    /// Create an empty trie over an in-memory store
    pub fn new_memory() -> Self {
        Trie::new(MemoryStore::new())
    }
}
