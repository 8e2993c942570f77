/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! The tagged node variant stored content-addressed in [`crate::storage`].

use crate::error::{Error, Result};
use crate::field::{Hash, HASH_SIZE, HASH_ZERO};
use crate::hash::{leaf_key, middle_key};

pub const NODE_TAG_MIDDLE: u8 = 0;
pub const NODE_TAG_LEAF: u8 = 1;
pub const NODE_TAG_EMPTY: u8 = 2;

/// A tagged node in the tree. `Empty` is a sentinel never written to
/// storage; `Leaf` and `Middle` are immutable and content-addressed by
/// [`Node::hash`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    Empty,
    Leaf { k: Hash, v: Hash },
    Middle { l: Hash, r: Hash },
}

impl Node {
    /// The node's content-address. `Empty` hashes to `HashZero`.
    pub fn hash(&self) -> Result<Hash> {
        match self {
            Node::Empty => Ok(HASH_ZERO),
            Node::Leaf { k, v } => leaf_key(k, v),
            Node::Middle { l, r } => middle_key(l, r),
        }
    }

    /// `[tag:1][payload:64]` storage bytes. `Empty` is never encoded;
    /// calling this on `Empty` is a programmer error.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Node::Empty => panic!("Empty nodes are never encoded"),
            Node::Leaf { k, v } => {
                let mut out = Vec::with_capacity(1 + HASH_SIZE * 2);
                out.push(NODE_TAG_LEAF);
                out.extend_from_slice(k.as_bytes());
                out.extend_from_slice(v.as_bytes());
                out
            }
            Node::Middle { l, r } => {
                let mut out = Vec::with_capacity(1 + HASH_SIZE * 2);
                out.push(NODE_TAG_MIDDLE);
                out.extend_from_slice(l.as_bytes());
                out.extend_from_slice(r.as_bytes());
                out
            }
        }
    }

    /// Inverse of [`Node::encode`]. Fails with [`Error::BadNodeBytes`] if
    /// the length doesn't match the tag, [`Error::InvalidNode`] if the tag
    /// is unrecognized or denotes `Empty` (which is never stored).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::BadNodeBytes)
        }
        let tag = bytes[0];
        let payload = &bytes[1..];

        match tag {
            NODE_TAG_LEAF | NODE_TAG_MIDDLE => {
                if payload.len() != HASH_SIZE * 2 {
                    return Err(Error::BadNodeBytes)
                }
                let mut a = [0u8; HASH_SIZE];
                let mut b = [0u8; HASH_SIZE];
                a.copy_from_slice(&payload[..HASH_SIZE]);
                b.copy_from_slice(&payload[HASH_SIZE..]);
                if tag == NODE_TAG_LEAF {
                    Ok(Node::Leaf { k: Hash::from_bytes(a), v: Hash::from_bytes(b) })
                } else {
                    Ok(Node::Middle { l: Hash::from_bytes(a), r: Hash::from_bytes(b) })
                }
            }
            _ => Err(Error::InvalidNode),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty)
    }
}

/// A node's storage key. Operationally it's the same 32-byte value as the
/// [`Hash`] it wraps (`Node::hash()` of the node in question); the newtype
/// exists only to mark "this is an address into the node store" at call
/// sites on the [`crate::storage::Storage`] boundary, distinct from a
/// `Hash` used as leaf key/value material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(Hash);

impl NodeKey {
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_hash(&self) -> Hash {
        self.0
    }
}

impl From<Hash> for NodeKey {
    fn from(h: Hash) -> Self {
        NodeKey(h)
    }
}

impl From<NodeKey> for Hash {
    fn from(k: NodeKey) -> Self {
        k.0
    }
}

impl std::fmt::Display for NodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_round_trips_through_bytes() {
        let n = Node::Leaf { k: Hash::from_u64(1), v: Hash::from_u64(2) };
        let bytes = n.encode();
        assert_eq!(Node::decode(&bytes).unwrap(), n);
    }

    #[test]
    fn middle_round_trips_through_bytes() {
        let n = Node::Middle { l: Hash::from_u64(1), r: Hash::from_u64(2) };
        let bytes = n.encode();
        assert_eq!(Node::decode(&bytes).unwrap(), n);
    }

    #[test]
    fn empty_hashes_to_zero() {
        assert_eq!(Node::Empty.hash().unwrap(), HASH_ZERO);
    }

    #[test]
    fn decode_rejects_bad_length() {
        assert!(Node::decode(&[NODE_TAG_LEAF, 1, 2, 3]).is_err());
    }

    #[test]
    fn decode_rejects_empty_tag() {
        let mut bytes = vec![NODE_TAG_EMPTY];
        bytes.extend_from_slice(&[0u8; HASH_SIZE * 2]);
        assert!(Node::decode(&bytes).is_err());
    }

    #[test]
    fn node_key_round_trips_through_hash() {
        let h = Hash::from_u64(7);
        let key = NodeKey::from(h);
        assert_eq!(Hash::from(key), h);
        assert_eq!(key.as_hash(), h);
    }

    #[test]
    fn node_key_zero_matches_hash_zero() {
        assert!(NodeKey::from(HASH_ZERO).is_zero());
        assert!(!NodeKey::from(Hash::from_u64(1)).is_zero());
    }
}
