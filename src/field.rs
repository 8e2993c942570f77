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

//! 32-byte little-endian representation of a BN254 scalar field (`Fr`)
//! element, and conversions to/from unbounded integers, hex, and decimal.

use std::fmt;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{Error, Result};

/// Number of bytes in a field element / node hash.
pub const HASH_SIZE: usize = 32;

lazy_static::lazy_static! {
    /// BN254 scalar field modulus.
    pub static ref Q: BigUint = "21888242871839275222246405745257275088548364400416034343698204186575808495617"
        .parse()
        .expect("Q is a valid decimal constant");
}

/// A 32-byte little-endian representation of an `Fr` element.
///
/// `Hash([0u8; 32])` is the distinguished `HashZero` value denoting an
/// empty node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(pub [u8; HASH_SIZE]);

/// The distinguished zero hash, used for `Empty` nodes and as padding.
pub const HASH_ZERO: Hash = Hash([0u8; HASH_SIZE]);

impl Default for Hash {
    fn default() -> Self {
        HASH_ZERO
    }
}

impl Hash {
    /// Build a `Hash` from raw little-endian bytes. Does not check the
    /// field-range invariant; use [`Hash::from_integer`] when the input
    /// is untrusted.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == HASH_ZERO.0
    }

    /// Encode an unbounded integer as a `Hash`. Fails with
    /// [`Error::ValueNotInField`] if `n < 0` or `n >= Q`.
    pub fn from_integer(n: &BigUint) -> Result<Self> {
        if n >= &*Q {
            return Err(Error::ValueNotInField(n.to_string()))
        }
        Self::from_biguint_unchecked(n)
    }

    /// Like [`Hash::from_integer`] but for a small non-negative integer
    /// that is known to be in-field by construction (e.g. the `1` domain
    /// separator). Panics in debug builds if out of range.
    pub fn from_u64(n: u64) -> Self {
        let big = BigUint::from(n);
        debug_assert!(big < *Q);
        Self::from_biguint_unchecked(&big).expect("u64 is always in field")
    }

    fn from_biguint_unchecked(n: &BigUint) -> Result<Self> {
        let be = n.to_bytes_be();
        if be.len() > HASH_SIZE {
            return Err(Error::ValueNotInField(n.to_string()))
        }
        let mut bytes = [0u8; HASH_SIZE];
        // to_bytes_be is big-endian and shortest; reverse into our
        // little-endian fixed-width layout.
        for (i, b) in be.iter().rev().enumerate() {
            bytes[i] = *b;
        }
        Ok(Self(bytes))
    }

    /// Decode to an unbounded integer (always non-negative, always `< Q`
    /// for any `Hash` constructed through `from_integer`).
    pub fn to_integer(&self) -> BigUint {
        BigUint::from_bytes_le(&self.0)
    }

    /// Validate `0 <= self < Q`. A `Hash` built via [`Hash::from_integer`]
    /// always satisfies this; one built via [`Hash::from_bytes`] or
    /// [`Hash::from_hex`] from untrusted bytes might not.
    pub fn check_in_field(&self) -> Result<()> {
        if self.to_integer() >= *Q {
            return Err(Error::ValueNotInField(self.to_integer().to_string()))
        }
        Ok(())
    }

    /// Parse exactly 64 lowercase-or-uppercase hex characters, no `0x`
    /// prefix, as a little-endian `Hash`.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != HASH_SIZE * 2 {
            return Err(Error::InvalidHex(s.to_string()))
        }
        let bytes = hex::decode(s).map_err(|_| Error::InvalidHex(s.to_string()))?;
        let mut out = [0u8; HASH_SIZE];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// Lowercase hex, always exactly 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_integer())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}
