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

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the sparse Merkle tree engine, its storage backends,
/// and the proof (de)serializers. Please sort them sensefully.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Field / Hash errors
    #[error("Value `{0}` is not in the scalar field")]
    ValueNotInField(String),

    #[error("Invalid hex string for a hash: `{0}`")]
    InvalidHex(String),

    // Node errors
    #[error("Malformed node bytes")]
    BadNodeBytes,

    #[error("Invalid node tag or structure")]
    InvalidNode,

    // Tree engine errors
    #[error("Tree is not writable")]
    NotWritable,

    #[error("Key not found")]
    KeyNotFound,

    #[error("Entry index already exists")]
    EntryIndexAlreadyExists,

    #[error("Node key already exists in storage")]
    NodeKeyAlreadyExists,

    #[error("Reached max tree level")]
    ReachedMaxLevel,

    // Proof errors
    #[error("Invalid proof bytes")]
    InvalidProofBytes,

    #[error("Non-existence proof's auxiliary node matches the claimed key")]
    NonExistenceAgainstMatchingAux,

    #[error("Invalid proof JSON: `{0}`")]
    InvalidProofJson(String),

    // Storage errors
    #[error("Storage entry not found")]
    NotFound,

    #[error("Storage error: `{0}`")]
    StorageError(String),

    // Hash primitive errors
    #[error("Poseidon hash error: `{0}`")]
    HashError(String),

    #[error("IO error: `{0}`")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(feature = "sql")]
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StorageError(err.to_string())
    }
}
