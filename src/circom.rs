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

//! circom-facing adapters: [`CircomVerifierProof`] (inclusion/non-inclusion
//! in circuit-friendly form) and [`CircomProcessorProof`] (a single
//! state-transition record for Insert/Update/Delete).

use std::collections::HashMap;

use tinyjson::JsonValue;

use crate::field::{Hash, HASH_ZERO};
use crate::proof::Proof;

/// circom function code for the inclusion/non-inclusion verifier circuit:
/// `0` = inclusion, `1` = non-inclusion.
pub const FNC_INCLUSION: u8 = 0;
pub const FNC_NON_INCLUSION: u8 = 1;

/// circom function code for the processor circuit: a no-op, or which of
/// the three mutations the proof documents.
pub const FNC_NOP: u8 = 0;
pub const FNC_UPDATE: u8 = 1;
pub const FNC_INSERT: u8 = 2;
pub const FNC_DELETE: u8 = 3;

/// An inclusion/non-inclusion proof reshaped for circom verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircomVerifierProof {
    pub root: Hash,
    pub siblings: Vec<Hash>,
    pub old_key: Hash,
    pub old_value: Hash,
    pub is_old0: bool,
    pub key: Hash,
    pub value: Hash,
    pub fnc: u8,
}

impl CircomVerifierProof {
    /// Build from a [`Proof`] plus the claimed `(key, value)` and `root`,
    /// siblings exactly as the proof carries them (no padding) — the
    /// "smart-contract" shape.
    pub fn from_proof_sc(proof: &Proof, root: Hash, key: Hash, value: Hash) -> Self {
        Self::build(proof, root, key, value, proof.siblings.clone())
    }

    /// Same as [`CircomVerifierProof::from_proof_sc`] but zero-pads
    /// `siblings` to `max_levels + 1` — the shape circom circuits expect.
    pub fn from_proof_circom(
        proof: &Proof,
        root: Hash,
        key: Hash,
        value: Hash,
        max_levels: usize,
    ) -> Self {
        let mut siblings = proof.siblings.clone();
        siblings.resize(max_levels + 1, HASH_ZERO);
        Self::build(proof, root, key, value, siblings)
    }

    fn build(proof: &Proof, root: Hash, key: Hash, value: Hash, siblings: Vec<Hash>) -> Self {
        let (old_key, old_value) = proof.node_aux.unwrap_or((HASH_ZERO, HASH_ZERO));
        let is_old0 = !proof.existence && proof.node_aux.is_none();
        let fnc = if proof.existence { FNC_INCLUSION } else { FNC_NON_INCLUSION };
        Self { root, siblings, old_key, old_value, is_old0, key, value, fnc }
    }

    pub fn to_json(&self) -> JsonValue {
        let siblings: Vec<JsonValue> =
            self.siblings.iter().map(|s| JsonValue::String(s.to_integer().to_string())).collect();

        JsonValue::Object(HashMap::from([
            ("root".to_string(), JsonValue::String(self.root.to_integer().to_string())),
            ("siblings".to_string(), JsonValue::Array(siblings)),
            ("oldKey".to_string(), JsonValue::String(self.old_key.to_integer().to_string())),
            ("oldValue".to_string(), JsonValue::String(self.old_value.to_integer().to_string())),
            ("isOld0".to_string(), JsonValue::Boolean(self.is_old0)),
            ("key".to_string(), JsonValue::String(self.key.to_integer().to_string())),
            ("value".to_string(), JsonValue::String(self.value.to_integer().to_string())),
            ("fnc".to_string(), JsonValue::Number(self.fnc as f64)),
        ]))
    }

    pub fn to_json_string(&self) -> crate::error::Result<String> {
        self.to_json().stringify().map_err(|e| crate::error::Error::InvalidProofJson(e.to_string()))
    }
}

/// A single tree mutation (Insert/Update/Delete/NOP) described in a
/// circuit-friendly way. Also known as `TransactionInfo` in some
/// circom-tooling ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircomProcessorProof {
    pub old_root: Hash,
    pub new_root: Hash,
    /// Zero-padded to `max_levels + 1`.
    pub siblings: Vec<Hash>,
    pub old_key: Hash,
    pub old_value: Hash,
    pub new_key: Hash,
    pub new_value: Hash,
    pub is_old0: bool,
    pub fnc: u8,
}

/// Alias for [`CircomProcessorProof`] under the name some circom tooling
/// uses for the same record.
pub type TransactionInfo = CircomProcessorProof;

impl CircomProcessorProof {
    pub fn to_json(&self) -> JsonValue {
        let siblings: Vec<JsonValue> =
            self.siblings.iter().map(|s| JsonValue::String(s.to_integer().to_string())).collect();

        JsonValue::Object(HashMap::from([
            ("oldRoot".to_string(), JsonValue::String(self.old_root.to_integer().to_string())),
            ("newRoot".to_string(), JsonValue::String(self.new_root.to_integer().to_string())),
            ("siblings".to_string(), JsonValue::Array(siblings)),
            ("oldKey".to_string(), JsonValue::String(self.old_key.to_integer().to_string())),
            ("oldValue".to_string(), JsonValue::String(self.old_value.to_integer().to_string())),
            ("newKey".to_string(), JsonValue::String(self.new_key.to_integer().to_string())),
            ("newValue".to_string(), JsonValue::String(self.new_value.to_integer().to_string())),
            ("isOld0".to_string(), JsonValue::Boolean(self.is_old0)),
            ("fnc".to_string(), JsonValue::Number(self.fnc as f64)),
        ]))
    }

    pub fn to_json_string(&self) -> crate::error::Result<String> {
        self.to_json().stringify().map_err(|e| crate::error::Error::InvalidProofJson(e.to_string()))
    }
}
