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

//! Adapter between our [`Hash`] type and the `poseidon-rs` crate, which
//! supplies the actual Poseidon permutation over BN254's `Fr`. This is the
//! external collaborator named in the purpose statement: we only convert
//! at the boundary, we don't reimplement the permutation.

use ff_ce::PrimeField;
use poseidon_rs::{Fr as PoseidonFr, Poseidon};

use crate::error::{Error, Result};
use crate::field::Hash;

/// Domain separator mixed into every leaf key: `Poseidon(k, v, 1)`.
const LEAF_DOMAIN_TAG: u64 = 1;

fn to_poseidon_fr(h: &Hash) -> Result<PoseidonFr> {
    PoseidonFr::from_str(&h.to_integer().to_string())
        .ok_or_else(|| Error::HashError(format!("value `{h}` is not a valid Fr element")))
}

fn from_poseidon_fr(fr: &PoseidonFr) -> Hash {
    // PrimeField's Display prints the canonical decimal representation;
    // parsing it back through our own BigUint path keeps the byte layout
    // (little-endian, fixed-width) solely our concern.
    let decimal = fr.into_repr().to_string();
    let n: num_bigint::BigUint = decimal.parse().expect("Fr always prints a valid decimal");
    Hash::from_integer(&n).expect("a reduced Fr element is always in-field")
}

/// Hash an arbitrary (1..=16) slice of field elements with Poseidon.
/// This is the one primitive every other hash in this crate is built on.
pub fn poseidon_hash(inputs: &[Hash]) -> Result<Hash> {
    let frs: Vec<PoseidonFr> =
        inputs.iter().map(to_poseidon_fr).collect::<Result<_>>()?;
    let poseidon = Poseidon::new();
    let out =
        poseidon.hash(frs).map_err(|e| Error::HashError(format!("{e:?}")))?;
    Ok(from_poseidon_fr(&out))
}

/// `Poseidon(k, v, 1)` — the content-address of a `Leaf{k, v}` node.
pub fn leaf_key(k: &Hash, v: &Hash) -> Result<Hash> {
    poseidon_hash(&[*k, *v, Hash::from_u64(LEAF_DOMAIN_TAG)])
}

/// `Poseidon(L, R)` — the content-address of a `Middle{L, R}` node.
pub fn middle_key(l: &Hash, r: &Hash) -> Result<Hash> {
    poseidon_hash(&[*l, *r])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_key_is_deterministic() {
        let k = Hash::from_u64(1);
        let v = Hash::from_u64(2);
        let h1 = leaf_key(&k, &v).unwrap();
        let h2 = leaf_key(&k, &v).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn middle_key_is_deterministic() {
        let l = Hash::from_u64(10);
        let r = Hash::from_u64(20);
        let h1 = middle_key(&l, &r).unwrap();
        let h2 = middle_key(&l, &r).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn leaf_and_middle_keys_differ() {
        let a = Hash::from_u64(1);
        let b = Hash::from_u64(2);
        assert_ne!(leaf_key(&a, &b).unwrap(), middle_key(&a, &b).unwrap());
    }
}
