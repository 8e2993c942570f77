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

//! A sparse Merkle tree over the BN254 scalar field, wire- and
//! hash-compatible with circom's `smt.js` reference and its accompanying
//! zk-SNARK verification circuits.
//!
//! The tree ([`tree::Tree`]) owns a root key and a pluggable
//! [`storage::Storage`] backend; mutating operations (`add`, `update`,
//! `delete`) and lookups (`get`, `generate_proof`) are documented on
//! [`tree::Tree`] directly. [`proof::Proof`] is the inclusion/non-inclusion
//! proof object with its wire and JSON codecs and [`proof::verify_proof`]
//! verifier; [`circom`] reshapes proofs and state transitions into the
//! form circom circuits expect; [`dump`] and [`viz`] round out the
//! component list.

pub mod circom;
pub mod dump;
pub mod error;
pub mod field;
pub mod hash;
pub mod node;
pub mod path;
pub mod proof;
pub mod storage;
pub mod tree;
pub mod viz;

pub use error::{Error, Result};
pub use field::{Hash, HASH_SIZE, HASH_ZERO};
pub use node::{Node, NodeKey};
pub use proof::{root_from_proof, verify_proof, Proof};
pub use storage::{CancelToken, MemoryStorage, Storage, StorageConfig};
pub use tree::{Entry, GetResult, Tree};
