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

//! The inclusion/non-inclusion proof object, its bit-exact wire codec, its
//! JSON codec, and the stateless `VerifyProof`/`RootFromProof` verifier.

use std::collections::HashMap;

use tinyjson::JsonValue;

use crate::error::{Error, Result};
use crate::field::{Hash, HASH_SIZE, HASH_ZERO};
use crate::hash::{leaf_key, middle_key};
use crate::path::path_bit;

/// The bitmap in the wire header is 30 bytes wide (240 bits), bounding
/// the sibling vector a wire-encoded proof can carry.
const BITMAP_BYTES: usize = 30;
const MAX_WIRE_DEPTH: usize = BITMAP_BYTES * 8;

/// An inclusion/non-inclusion proof for a single key under some root.
/// `siblings` is always the full vector, one entry per descended level
/// including zero entries, which is what zk-circuits expect. The compact
/// wire form in [`Proof::encode`] strips the zero entries; the JSON form
/// in [`Proof::to_json`] does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub existence: bool,
    pub siblings: Vec<Hash>,
    /// Present only for non-existence proofs where traversal terminated
    /// at a non-matching leaf (the "intruder"); `(k, v)` of that leaf.
    pub node_aux: Option<(Hash, Hash)>,
}

impl Proof {
    /// `[flag:1][depth:1][bitmap:30]` then each non-zero sibling (32B,
    /// ascending depth), then `nodeAux.k||v` (64B) if present.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.siblings.len() > MAX_WIRE_DEPTH {
            return Err(Error::InvalidProofBytes)
        }

        let mut flag = 0u8;
        if !self.existence {
            flag |= 0b01;
        }
        if self.node_aux.is_some() {
            flag |= 0b10;
        }

        let depth = self.siblings.len() as u8;
        let mut bitmap = [0u8; BITMAP_BYTES];
        for (i, s) in self.siblings.iter().enumerate() {
            if !s.is_zero() {
                bitmap[i / 8] |= 1 << (7 - (i % 8));
            }
        }

        let mut out = Vec::with_capacity(32 + self.siblings.len() * HASH_SIZE + 64);
        out.push(flag);
        out.push(depth);
        out.extend_from_slice(&bitmap);
        for s in &self.siblings {
            if !s.is_zero() {
                out.extend_from_slice(s.as_bytes());
            }
        }
        if let Some((k, v)) = self.node_aux {
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(v.as_bytes());
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 32 {
            return Err(Error::InvalidProofBytes)
        }

        let flag = bytes[0];
        let existence = flag & 0b01 == 0;
        let node_aux_present = flag & 0b10 != 0;
        let depth = bytes[1] as usize;
        let bitmap = &bytes[2..32];

        let mut cursor = 32;
        let mut siblings = Vec::with_capacity(depth);
        for i in 0..depth {
            let set = bitmap[i / 8] & (1 << (7 - (i % 8))) != 0;
            if set {
                if cursor + HASH_SIZE > bytes.len() {
                    return Err(Error::InvalidProofBytes)
                }
                let mut buf = [0u8; HASH_SIZE];
                buf.copy_from_slice(&bytes[cursor..cursor + HASH_SIZE]);
                siblings.push(Hash::from_bytes(buf));
                cursor += HASH_SIZE;
            } else {
                siblings.push(HASH_ZERO);
            }
        }

        let node_aux = if node_aux_present {
            if cursor + HASH_SIZE * 2 != bytes.len() {
                return Err(Error::InvalidProofBytes)
            }
            let mut kb = [0u8; HASH_SIZE];
            let mut vb = [0u8; HASH_SIZE];
            kb.copy_from_slice(&bytes[cursor..cursor + HASH_SIZE]);
            vb.copy_from_slice(&bytes[cursor + HASH_SIZE..cursor + HASH_SIZE * 2]);
            cursor += HASH_SIZE * 2;
            Some((Hash::from_bytes(kb), Hash::from_bytes(vb)))
        } else {
            None
        };

        if cursor != bytes.len() {
            return Err(Error::InvalidProofBytes)
        }

        Ok(Self { existence, siblings, node_aux })
    }

    /// `{"existence", "siblings" (always the full zero-padded vector,
    /// decimal strings), "node_aux"}`.
    pub fn to_json(&self) -> JsonValue {
        let siblings: Vec<JsonValue> =
            self.siblings.iter().map(|s| JsonValue::String(s.to_integer().to_string())).collect();

        let node_aux = match self.node_aux {
            Some((k, v)) => JsonValue::Object(HashMap::from([
                ("key".to_string(), JsonValue::String(k.to_integer().to_string())),
                ("value".to_string(), JsonValue::String(v.to_integer().to_string())),
            ])),
            None => JsonValue::Null,
        };

        JsonValue::Object(HashMap::from([
            ("existence".to_string(), JsonValue::Boolean(self.existence)),
            ("siblings".to_string(), JsonValue::Array(siblings)),
            ("node_aux".to_string(), node_aux),
        ]))
    }

    pub fn to_json_string(&self) -> Result<String> {
        self.to_json().stringify().map_err(|e| Error::InvalidProofJson(e.to_string()))
    }

    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let existence = *value["existence"]
            .get::<bool>()
            .ok_or_else(|| Error::InvalidProofJson("missing `existence`".into()))?;

        let siblings_json = value["siblings"]
            .get::<Vec<JsonValue>>()
            .ok_or_else(|| Error::InvalidProofJson("missing `siblings`".into()))?;
        let mut siblings = Vec::with_capacity(siblings_json.len());
        for s in siblings_json {
            let dec = s
                .get::<String>()
                .ok_or_else(|| Error::InvalidProofJson("sibling is not a string".into()))?;
            let n: num_bigint::BigUint =
                dec.parse().map_err(|_| Error::InvalidProofJson(format!("bad integer `{dec}`")))?;
            siblings.push(Hash::from_integer(&n)?);
        }

        let node_aux = match &value["node_aux"] {
            JsonValue::Null => None,
            obj @ JsonValue::Object(_) => {
                let k_dec = obj["key"]
                    .get::<String>()
                    .ok_or_else(|| Error::InvalidProofJson("missing `node_aux.key`".into()))?;
                let v_dec = obj["value"]
                    .get::<String>()
                    .ok_or_else(|| Error::InvalidProofJson("missing `node_aux.value`".into()))?;
                let k: num_bigint::BigUint = k_dec
                    .parse()
                    .map_err(|_| Error::InvalidProofJson(format!("bad integer `{k_dec}`")))?;
                let v: num_bigint::BigUint = v_dec
                    .parse()
                    .map_err(|_| Error::InvalidProofJson(format!("bad integer `{v_dec}`")))?;
                Some((Hash::from_integer(&k)?, Hash::from_integer(&v)?))
            }
            _ => return Err(Error::InvalidProofJson("`node_aux` is neither null nor object".into())),
        };

        Ok(Self { existence, siblings, node_aux })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: JsonValue =
            s.parse().map_err(|e: tinyjson::JsonParseError| Error::InvalidProofJson(e.to_string()))?;
        Self::from_json(&value)
    }
}

/// Reconstruct the root hash a proof claims, bottom-up. Rejects a
/// non-existence proof whose `node_aux.k` equals the claimed key: such a
/// proof would otherwise "prove" the absence of a key that is, in fact,
/// the very node the traversal terminated on.
pub fn root_from_proof(proof: &Proof, k: &Hash, v: &Hash) -> Result<Hash> {
    if !proof.existence {
        if let Some((aux_k, _)) = proof.node_aux {
            if aux_k == *k {
                return Err(Error::NonExistenceAgainstMatchingAux)
            }
        }
    }

    let mut mid_key = if proof.existence {
        leaf_key(k, v)?
    } else if let Some((aux_k, aux_v)) = proof.node_aux {
        leaf_key(&aux_k, &aux_v)?
    } else {
        HASH_ZERO
    };

    for lvl in (0..proof.siblings.len()).rev() {
        let sibling = proof.siblings[lvl];
        mid_key = if path_bit(k, lvl) {
            middle_key(&sibling, &mid_key)?
        } else {
            middle_key(&mid_key, &sibling)?
        };
    }

    Ok(mid_key)
}

/// `root == RootFromProof(proof, k, v)`; any error collapses to `false`.
/// This is the one function in the crate that deliberately swallows
/// errors instead of propagating them, since a malformed proof should
/// simply fail to verify.
pub fn verify_proof(root: &Hash, proof: &Proof, k: &Hash, v: &Hash) -> bool {
    match root_from_proof(proof, k, v) {
        Ok(computed) => computed == *root,
        Err(_) => false,
    }
}
