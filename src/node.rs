//! # Trie node shapes
//!
//! The trie has four node shapes:
//! 1. Blank - the absent node
//! 2. Leaf - remaining key path plus a value
//! 3. Extension - a shared path prefix pointing at one child
//! 4. Branch - 16-way branch point plus an optional terminal value
//!
//! Canonically a non-blank node serializes to an RLP list: 2 items for
//! leaf/extension (leaf and extension are told apart by the terminator flag
//! in the compact path), 17 items for branch. Any other arity is malformed.

use alloy_primitives::B256;
use alloy_rlp::{Encodable, Header, EMPTY_STRING_CODE};

use crate::error::{Result, TrieError};
use crate::nibbles::NibblePath;

/// Reference from a parent node to a child.
///
/// The storage strategy is decided purely by encoding size: nodes whose
/// canonical encoding is under 32 bytes are embedded inline in the parent
/// and never separately addressed; everything else lives in the store under
/// its keccak digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildRef {
    /// No child in this slot
    Absent,
    /// Child embedded in the parent (encoding < 32 bytes)
    Inline(Box<Node>),
    /// Content address of a stored child
    Stored(B256),
}

impl ChildRef {
    /// Check if the slot is empty
    pub fn is_absent(&self) -> bool {
        matches!(self, ChildRef::Absent)
    }

    /// Get the digest if this is a stored reference
    pub fn as_digest(&self) -> Option<B256> {
        match self {
            ChildRef::Stored(digest) => Some(*digest),
            _ => None,
        }
    }
}

impl Default for ChildRef {
    fn default() -> Self {
        ChildRef::Absent
    }
}

/// Trie node shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Blank node (null)
    Blank,

    /// Leaf node: [compact_path, value]
    /// The path is the remaining key suffix
    Leaf {
        path: NibblePath,
        value: Vec<u8>,
    },

    /// Extension node: [compact_path, child]
    /// Compresses a prefix shared by every key below it
    Extension {
        path: NibblePath,
        child: ChildRef,
    },

    /// Branch node: [child0, ..., child15, value]
    /// One child slot per nibble value plus an optional value
    Branch {
        children: Box<[ChildRef; 16]>,
        value: Option<Vec<u8>>,
    },
}

impl Default for Node {
    fn default() -> Self {
        Node::Blank
    }
}

impl Node {
    /// Create a branch node with all slots empty
    pub fn empty_branch() -> Self {
        Node::Branch {
            children: Box::new(std::array::from_fn(|_| ChildRef::Absent)),
            value: None,
        }
    }

    /// Create a leaf node
    pub fn leaf(path: NibblePath, value: Vec<u8>) -> Self {
        Node::Leaf { path, value }
    }

    /// Create an extension node
    pub fn extension(path: NibblePath, child: ChildRef) -> Self {
        Node::Extension { path, child }
    }

    /// Check if the node is blank
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank)
    }

    /// Canonical RLP encoding of this node
    pub fn rlp_encode(&self) -> Vec<u8> {
        match self {
            Node::Blank => vec![EMPTY_STRING_CODE],

            Node::Leaf { path, value } => {
                let mut payload = Vec::new();
                path.to_compact(true).as_slice().encode(&mut payload);
                value.as_slice().encode(&mut payload);
                finish_list(payload)
            }

            Node::Extension { path, child } => {
                let mut payload = Vec::new();
                path.to_compact(false).as_slice().encode(&mut payload);
                encode_child(child, &mut payload);
                finish_list(payload)
            }

            Node::Branch { children, value } => {
                let mut payload = Vec::new();
                for child in children.iter() {
                    encode_child(child, &mut payload);
                }
                match value {
                    Some(v) => v.as_slice().encode(&mut payload),
                    None => payload.push(EMPTY_STRING_CODE),
                }
                finish_list(payload)
            }
        }
    }

    /// Decode a canonical node encoding.
    ///
    /// This is the trust boundary where externally stored bytes re-enter the
    /// live graph; the shape is resolved here, once, and never re-derived.
    pub fn rlp_decode(buf: &[u8]) -> Result<Node> {
        if buf.is_empty() || buf == [EMPTY_STRING_CODE] {
            return Ok(Node::Blank);
        }

        let mut payload = buf;
        let head = Header::decode(&mut payload).map_err(rlp_err)?;
        if !head.list {
            return Err(TrieError::MalformedNode);
        }
        if payload.len() != head.payload_length {
            return Err(TrieError::RlpDecode("trailing bytes after node".into()));
        }

        let mut items = Vec::new();
        while !payload.is_empty() {
            items.push(Item::take(&mut payload)?);
        }

        match items.len() {
            2 => {
                let (path, is_leaf) = NibblePath::from_compact(items[0].as_str()?);
                if is_leaf {
                    Ok(Node::Leaf {
                        path,
                        value: items[1].as_str()?.to_vec(),
                    })
                } else {
                    Ok(Node::Extension {
                        path,
                        child: items[1].into_child()?,
                    })
                }
            }
            17 => {
                let mut children: Box<[ChildRef; 16]> =
                    Box::new(std::array::from_fn(|_| ChildRef::Absent));
                for (slot, item) in children.iter_mut().zip(&items[..16]) {
                    *slot = item.into_child()?;
                }
                let value = match items[16].as_str()? {
                    [] => None,
                    v => Some(v.to_vec()),
                };
                Ok(Node::Branch { children, value })
            }
            _ => Err(TrieError::MalformedNodeType),
        }
    }
}

/// Append a child reference to a list payload
fn encode_child(child: &ChildRef, out: &mut Vec<u8>) {
    match child {
        ChildRef::Absent => out.push(EMPTY_STRING_CODE),
        // Inline children sit in the payload as raw nested lists
        ChildRef::Inline(node) => out.extend_from_slice(&node.rlp_encode()),
        ChildRef::Stored(digest) => digest.as_slice().encode(out),
    }
}

/// Wrap an already-encoded payload in a list header
fn finish_list(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

fn rlp_err(err: alloy_rlp::Error) -> TrieError {
    TrieError::RlpDecode(err.to_string())
}

/// One item of a node's list payload: either a byte string or a raw nested
/// list (an inline child).
#[derive(Debug, Clone, Copy)]
enum Item<'a> {
    Str(&'a [u8]),
    List(&'a [u8]),
}

impl<'a> Item<'a> {
    /// Split the next item off the front of `buf`
    fn take(buf: &mut &'a [u8]) -> Result<Item<'a>> {
        let first = *buf
            .first()
            .ok_or_else(|| TrieError::RlpDecode("empty item".into()))?;

        if first >= 0xc0 {
            // Nested list: keep the raw bytes, header included
            let mut peek = *buf;
            let head = Header::decode(&mut peek).map_err(rlp_err)?;
            let total = buf.len() - peek.len() + head.payload_length;
            if buf.len() < total {
                return Err(TrieError::RlpDecode("truncated list item".into()));
            }
            let (item, rest) = buf.split_at(total);
            *buf = rest;
            Ok(Item::List(item))
        } else {
            let head = Header::decode(buf).map_err(rlp_err)?;
            if buf.len() < head.payload_length {
                return Err(TrieError::RlpDecode("truncated string item".into()));
            }
            let (item, rest) = buf.split_at(head.payload_length);
            *buf = rest;
            Ok(Item::Str(item))
        }
    }

    fn as_str(&self) -> Result<&'a [u8]> {
        match self {
            Item::Str(s) => Ok(s),
            Item::List(_) => Err(TrieError::MalformedNode),
        }
    }

    fn into_child(self) -> Result<ChildRef> {
        match self {
            Item::Str([]) => Ok(ChildRef::Absent),
            Item::Str(s) if s.len() == 32 => Ok(ChildRef::Stored(B256::from_slice(s))),
            Item::Str(_) => Err(TrieError::MalformedNode),
            Item::List(raw) => Ok(ChildRef::Inline(Box::new(Node::rlp_decode(raw)?))),
        }
    }
}
