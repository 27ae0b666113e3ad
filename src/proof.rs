//! # SPV proof sessions
//!
//! A prover replays a read in recording mode: every node encoding fetched
//! from the store lands in the `proven` bag. Shipping that bag together
//! with the root digest lets a verifier replay the same read with no store
//! access at all: each fetch must find its encoding already proven, and the
//! first one that does not fails the whole verification.

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrieError};
use crate::trie::{KeyValueStore, MemoryStore, Trie};

/// Proof session mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProofMode {
    /// No bookkeeping
    #[default]
    Off,
    /// Collect fetched encodings into the proven bag
    Recording,
    /// Require every fetched encoding to already be proven
    Verifying,
}

/// Bookkeeping state hooked into the engine's encode/decode paths.
///
/// Per-instance mutable state: recording and verifying sessions must not
/// interleave on one trie.
#[derive(Debug, Default)]
pub struct ProofLedger {
    mode: ProofMode,
    /// Encodings already authenticated (bag, duplicates permitted)
    proven: Vec<Vec<u8>>,
    /// Encodings the prover produced itself while recording; a verifier
    /// does not need them supplied
    exempt: Vec<Vec<u8>>,
}

impl ProofLedger {
    pub fn mode(&self) -> ProofMode {
        self.mode
    }

    pub(crate) fn start(&mut self, mode: ProofMode, proven: Vec<Vec<u8>>) {
        self.mode = mode;
        self.proven = proven;
        self.exempt = Vec::new();
    }

    pub(crate) fn stop(&mut self) {
        self.start(ProofMode::Off, Vec::new());
    }

    /// Fetch hook: fires every time a reference is read from the store
    pub(crate) fn on_fetch(&mut self, encoding: &[u8]) -> Result<()> {
        match self.mode {
            ProofMode::Off => Ok(()),
            ProofMode::Recording => {
                self.proven.push(encoding.to_vec());
                Ok(())
            }
            ProofMode::Verifying => {
                if self.proven.iter().any(|e| e == encoding) {
                    Ok(())
                } else {
                    Err(TrieError::InvalidProof)
                }
            }
        }
    }

    /// Persist hook: fires every time a node encoding is written.
    ///
    /// A digest computed during verification is already authenticated by
    /// the hash chain rooted at the claimed root, so the encoding is
    /// admitted for any later fetch of the same bytes.
    pub(crate) fn on_persist(&mut self, encoding: &[u8]) {
        match self.mode {
            ProofMode::Off => {}
            ProofMode::Recording => self.exempt.push(encoding.to_vec()),
            ProofMode::Verifying => self.proven.push(encoding.to_vec()),
        }
    }

    /// The bag a verifier needs: proven minus exempt (multiset difference),
    /// deduplicated in first-seen order
    pub(crate) fn recorded_nodes(&self) -> Vec<Vec<u8>> {
        let mut exempt = self.exempt.clone();
        let mut nodes: Vec<Vec<u8>> = Vec::new();
        for encoding in &self.proven {
            if let Some(pos) = exempt.iter().position(|e| e == encoding) {
                exempt.swap_remove(pos);
                continue;
            }
            if !nodes.iter().any(|e| e == encoding) {
                nodes.push(encoding.clone());
            }
        }
        nodes
    }
}

/// Transportable proof payload: the claimed root digest plus every node
/// encoding the verifier will need to fetch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Root digest the proof commits to
    pub root: B256,
    /// Canonical node encodings along the replayed path
    pub nodes: Vec<Vec<u8>>,
}

/// Record a proof for `key` by replaying the lookup from the root digest.
///
/// The replay starts at `set_root_hash` so the root node itself enters the
/// bag through a genuine fetch.
pub fn prove<S: KeyValueStore>(trie: &mut Trie<S>, key: &[u8]) -> Result<Proof> {
    let root = trie.root_hash()?;

    trie.begin_recording();
    let outcome = trie
        .set_root_hash(root.as_slice())
        .and_then(|()| trie.get(key));
    let nodes = trie.finish_recording();
    outcome?;

    Ok(Proof { root, nodes })
}

/// Replay a lookup for `key` against the proof alone and return the value
/// it commits to (`None` proves absence).
///
/// The node bag is loaded into an ephemeral store under each encoding's
/// digest; a node the replay needs but the bag lacks fails as
/// `InvalidProof`, whether the miss is caught by the ledger or the store.
pub fn verify_proof(root: B256, key: &[u8], proof: &Proof) -> Result<Option<Vec<u8>>> {
    if proof.root != root {
        return Err(TrieError::InvalidProof);
    }

    let mut store = MemoryStore::new();
    for encoding in &proof.nodes {
        store.put(keccak256(encoding), encoding.clone())?;
    }

    let mut trie = Trie::new(store);
    trie.begin_verifying(proof.nodes.clone());
    let outcome = trie
        .set_root_hash(root.as_slice())
        .and_then(|()| trie.get(key));
    trie.finish_verifying();

    match outcome {
        Err(TrieError::NodeNotFound(_)) => Err(TrieError::InvalidProof),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nibbles::NibblePath;
    use crate::node::Node;
    use crate::trie::EMPTY_ROOT;

    /// Same graph as the engine tests:
    /// {"do": "verb", "dog": "puppy", "horse": "stallion"}
    fn sample_trie() -> Trie<MemoryStore> {
        let mut trie = Trie::new_memory();

        let puppy = Node::leaf(NibblePath::from_nibbles(vec![7]), b"puppy".to_vec());
        let mut inner = Node::empty_branch();
        if let Node::Branch { children, value } = &mut inner {
            children[6] = trie.commit(&puppy).unwrap();
            *value = Some(b"verb".to_vec());
        }

        let fork = Node::extension(
            NibblePath::from_nibbles(vec![6, 0xf]),
            trie.commit(&inner).unwrap(),
        );
        let horse = Node::leaf(
            NibblePath::from_nibbles(vec![6, 0xf, 7, 2, 7, 3, 6, 5]),
            b"stallion".to_vec(),
        );

        let mut top = Node::empty_branch();
        if let Node::Branch { children, .. } = &mut top {
            children[4] = trie.commit(&fork).unwrap();
            children[8] = trie.commit(&horse).unwrap();
        }

        let root = Node::extension(
            NibblePath::from_nibbles(vec![6]),
            trie.commit(&top).unwrap(),
        );
        trie.set_root_node(root);
        trie
    }

    #[test]
    fn test_proof_round_trip() {
        let mut trie = sample_trie();
        let root = trie.root_hash().unwrap();

        let proof = prove(&mut trie, b"dog").unwrap();
        assert!(!proof.nodes.is_empty());
        assert_eq!(proof.root, root);

        assert_eq!(
            verify_proof(root, b"dog", &proof).unwrap(),
            Some(b"puppy".to_vec())
        );
    }

    #[test]
    fn test_proof_every_key() {
        let mut trie = sample_trie();
        let root = trie.root_hash().unwrap();

        for (key, value) in [
            (&b"do"[..], &b"verb"[..]),
            (&b"dog"[..], &b"puppy"[..]),
            (&b"horse"[..], &b"stallion"[..]),
        ] {
            let proof = prove(&mut trie, key).unwrap();
            assert_eq!(
                verify_proof(root, key, &proof).unwrap(),
                Some(value.to_vec()),
                "proof for {:?} should verify",
                String::from_utf8_lossy(key)
            );
        }
    }

    #[test]
    fn test_proof_of_absence() {
        let mut trie = sample_trie();
        let root = trie.root_hash().unwrap();

        let proof = prove(&mut trie, b"dog2").unwrap();
        assert_eq!(verify_proof(root, b"dog2", &proof).unwrap(), None);
    }

    #[test]
    fn test_proof_wrong_key_needs_unvisited_node() {
        let mut trie = sample_trie();
        let root = trie.root_hash().unwrap();

        // The path to "do" runs through a stored node the "horse" proof
        // never touches.
        let proof = prove(&mut trie, b"horse").unwrap();
        assert_eq!(
            verify_proof(root, b"do", &proof),
            Err(TrieError::InvalidProof)
        );
    }

    #[test]
    fn test_proof_wrong_root() {
        let mut trie = sample_trie();
        let proof = prove(&mut trie, b"dog").unwrap();

        let other = keccak256(b"not the root");
        assert_eq!(
            verify_proof(other, b"dog", &proof),
            Err(TrieError::InvalidProof)
        );

        // claimed digest present but nothing provable under it
        let forged = Proof {
            root: other,
            nodes: proof.nodes.clone(),
        };
        assert_eq!(
            verify_proof(other, b"dog", &forged),
            Err(TrieError::InvalidProof)
        );
    }

    #[test]
    fn test_proof_tampered_bag() {
        let mut trie = sample_trie();
        let root = trie.root_hash().unwrap();

        let mut proof = prove(&mut trie, b"dog").unwrap();
        // Drop the deepest node from the bag
        proof.nodes.pop();

        assert_eq!(
            verify_proof(root, b"dog", &proof),
            Err(TrieError::InvalidProof)
        );
    }

    #[test]
    fn test_blank_trie_proof() {
        let mut trie = Trie::new_memory();
        let root = trie.root_hash().unwrap();
        assert_eq!(root, EMPTY_ROOT);

        let proof = prove(&mut trie, b"anything").unwrap();
        assert!(proof.nodes.is_empty());
        assert_eq!(verify_proof(root, b"anything", &proof).unwrap(), None);
    }

    #[test]
    fn test_recorded_size_replay() {
        let mut trie = sample_trie();
        let root = trie.root_hash().unwrap();

        // Record a size traversal
        trie.begin_recording();
        trie.set_root_hash(root.as_slice()).unwrap();
        assert_eq!(trie.size().unwrap(), 3);
        let nodes = trie.finish_recording();
        assert!(!nodes.is_empty());

        // Replay it in verifying mode against the bag alone
        let mut store = MemoryStore::new();
        for encoding in &nodes {
            store.put(keccak256(encoding), encoding.clone()).unwrap();
        }
        let mut verifier = Trie::new(store);
        verifier.begin_verifying(nodes);
        verifier.set_root_hash(root.as_slice()).unwrap();
        assert_eq!(verifier.size().unwrap(), 3);
        verifier.finish_verifying();

        // An empty bag cannot even open the root
        let mut verifier = Trie::new_memory();
        verifier.begin_verifying(Vec::new());
        assert!(matches!(
            verifier.set_root_hash(root.as_slice()),
            Err(TrieError::NodeNotFound(_) | TrieError::InvalidProof)
        ));
    }

    #[test]
    fn test_verifying_rejects_unproven_fetch() {
        // A verifier whose store holds every node still may not use one
        // that is absent from the bag: the ledger, not the store, is the
        // guard here.
        let mut trie = sample_trie();
        let root = trie.root_hash().unwrap();

        trie.begin_verifying(Vec::new());
        assert_eq!(
            trie.set_root_hash(root.as_slice()),
            Err(TrieError::InvalidProof)
        );
        trie.finish_verifying();

        // A bag covering only the root lets the fetch of the root pass,
        // then fails on the first deeper fetch.
        let root_encoding = trie.store().get(&root).unwrap();
        trie.begin_verifying(vec![root_encoding]);
        trie.set_root_hash(root.as_slice()).unwrap();
        assert_eq!(trie.get(b"dog"), Err(TrieError::InvalidProof));
        trie.finish_verifying();
    }

    #[test]
    fn test_proof_mode_resets() {
        let mut trie = sample_trie();

        assert_eq!(trie.proof_mode(), ProofMode::Off);
        let _ = prove(&mut trie, b"dog").unwrap();
        assert_eq!(trie.proof_mode(), ProofMode::Off);
    }

    #[test]
    fn test_proof_serde_round_trip() {
        let mut trie = sample_trie();
        let root = trie.root_hash().unwrap();
        let proof = prove(&mut trie, b"horse").unwrap();

        let json = serde_json::to_string(&proof).unwrap();
        let decoded: Proof = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, proof);

        assert_eq!(
            verify_proof(root, b"horse", &decoded).unwrap(),
            Some(b"stallion".to_vec())
        );
    }
}
