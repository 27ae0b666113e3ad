//! # Nibble paths
//!
//! Keys are walked one nibble (half-byte / 4 bits) at a time, which gives
//! branch nodes their 16-way fanout. Leaf and extension nodes carry their
//! path segment in the compact "hex prefix" form: a flag nibble holding the
//! terminator bit and the odd-length bit, followed by the packed nibbles.

use std::fmt;

/// A sequence of 4-bit values describing a (partial) key path.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct NibblePath {
    nibbles: Vec<u8>,
}

impl NibblePath {
    /// Create an empty path
    pub fn new() -> Self {
        NibblePath { nibbles: Vec::new() }
    }

    /// Create from a byte key (each byte becomes 2 nibbles)
    pub fn from_key(key: &[u8]) -> Self {
        let mut nibbles = Vec::with_capacity(key.len() * 2);
        for byte in key {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0f);
        }
        NibblePath { nibbles }
    }

    /// Create from raw nibble values
    pub fn from_nibbles(nibbles: Vec<u8>) -> Self {
        debug_assert!(nibbles.iter().all(|n| *n < 16));
        NibblePath { nibbles }
    }

    /// Decode a compact (hex prefix) path segment.
    ///
    /// Returns the path and whether the terminator flag was set, i.e.
    /// whether the segment belongs to a leaf.
    pub fn from_compact(encoded: &[u8]) -> (Self, bool) {
        let Some(first) = encoded.first() else {
            return (NibblePath::new(), false);
        };

        let flags = first >> 4;
        let is_leaf = flags & 0x2 != 0;
        let odd = flags & 0x1 != 0;

        let mut nibbles = Vec::with_capacity(encoded.len() * 2);
        if odd {
            nibbles.push(first & 0x0f);
        }
        for byte in &encoded[1..] {
            nibbles.push(byte >> 4);
            nibbles.push(byte & 0x0f);
        }

        (NibblePath { nibbles }, is_leaf)
    }

    /// Encode to the compact (hex prefix) form.
    pub fn to_compact(&self, is_leaf: bool) -> Vec<u8> {
        let flags = if is_leaf { 0x2 } else { 0x0 };
        let odd = self.nibbles.len() % 2 == 1;

        let mut encoded = Vec::with_capacity(self.nibbles.len() / 2 + 1);
        let body = if odd {
            encoded.push((flags | 0x1) << 4 | self.nibbles[0]);
            &self.nibbles[1..]
        } else {
            encoded.push(flags << 4);
            &self.nibbles[..]
        };

        for pair in body.chunks(2) {
            encoded.push(pair[0] << 4 | pair[1]);
        }

        encoded
    }

    /// Number of nibbles
    pub fn len(&self) -> usize {
        self.nibbles.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.nibbles.is_empty()
    }

    /// Get the first nibble
    pub fn first(&self) -> Option<u8> {
        self.nibbles.first().copied()
    }

    /// Get the nibble at an index
    pub fn at(&self, index: usize) -> Option<u8> {
        self.nibbles.get(index).copied()
    }

    /// Suffix left after dropping the first `n` nibbles
    pub fn skip(&self, n: usize) -> Self {
        NibblePath {
            nibbles: self.nibbles[n.min(self.nibbles.len())..].to_vec(),
        }
    }

    /// Test whether `prefix` is a prefix of this path
    pub fn starts_with(&self, prefix: &NibblePath) -> bool {
        self.nibbles.len() >= prefix.nibbles.len()
            && self.nibbles[..prefix.nibbles.len()] == prefix.nibbles
    }

    /// Get as a slice of nibble values
    pub fn as_slice(&self) -> &[u8] {
        &self.nibbles
    }
}

impl fmt::Debug for NibblePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NibblePath(")?;
        for n in &self.nibbles {
            write!(f, "{:x}", n)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for NibblePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for n in &self.nibbles {
            write!(f, "{:x}", n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_key() {
        let path = NibblePath::from_key(&[0xab, 0xcd]);
        assert_eq!(path.len(), 4);
        assert_eq!(path.at(0), Some(0xa));
        assert_eq!(path.at(1), Some(0xb));
        assert_eq!(path.at(2), Some(0xc));
        assert_eq!(path.at(3), Some(0xd));
    }

    #[test]
    fn test_compact_leaf_odd() {
        let path = NibblePath::from_nibbles(vec![1, 2, 3]);
        let encoded = path.to_compact(true);
        // Odd leaf: flags = 3, first byte = 0x31
        assert_eq!(encoded, vec![0x31, 0x23]);

        let (decoded, is_leaf) = NibblePath::from_compact(&encoded);
        assert!(is_leaf);
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_compact_leaf_even() {
        let path = NibblePath::from_nibbles(vec![1, 2, 3, 4]);
        let encoded = path.to_compact(true);
        // Even leaf: flags = 2, first byte = 0x20
        assert_eq!(encoded, vec![0x20, 0x12, 0x34]);

        let (decoded, is_leaf) = NibblePath::from_compact(&encoded);
        assert!(is_leaf);
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_compact_extension_odd() {
        let path = NibblePath::from_nibbles(vec![1, 2, 3]);
        let encoded = path.to_compact(false);
        // Odd extension: flags = 1, first byte = 0x11
        assert_eq!(encoded, vec![0x11, 0x23]);

        let (decoded, is_leaf) = NibblePath::from_compact(&encoded);
        assert!(!is_leaf);
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_compact_extension_even() {
        let path = NibblePath::from_nibbles(vec![1, 2, 3, 4]);
        let encoded = path.to_compact(false);
        // Even extension: flags = 0, first byte = 0x00
        assert_eq!(encoded, vec![0x00, 0x12, 0x34]);

        let (decoded, is_leaf) = NibblePath::from_compact(&encoded);
        assert!(!is_leaf);
        assert_eq!(decoded, path);
    }

    #[test]
    fn test_compact_empty() {
        let path = NibblePath::new();
        assert_eq!(path.to_compact(false), vec![0x00]);
        assert_eq!(path.to_compact(true), vec![0x20]);

        let (decoded, is_leaf) = NibblePath::from_compact(&[0x20]);
        assert!(is_leaf);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_starts_with() {
        let path = NibblePath::from_nibbles(vec![1, 2, 3, 4, 5]);

        assert!(path.starts_with(&NibblePath::new()));
        assert!(path.starts_with(&NibblePath::from_nibbles(vec![1, 2, 3])));
        assert!(path.starts_with(&NibblePath::from_nibbles(vec![1, 2, 3, 4, 5])));
        assert!(!path.starts_with(&NibblePath::from_nibbles(vec![1, 2, 4])));
        assert!(!path.starts_with(&NibblePath::from_nibbles(vec![1, 2, 3, 4, 5, 6])));
    }

    #[test]
    fn test_skip() {
        let path = NibblePath::from_nibbles(vec![1, 2, 3, 4, 5]);

        assert_eq!(path.skip(2), NibblePath::from_nibbles(vec![3, 4, 5]));
        assert_eq!(path.skip(0), path);
        assert!(path.skip(5).is_empty());
        assert!(path.skip(9).is_empty());
    }

    #[test]
    fn test_first() {
        let path = NibblePath::from_nibbles(vec![7, 8]);
        assert_eq!(path.first(), Some(7));
        assert_eq!(NibblePath::new().first(), None);
    }
}
