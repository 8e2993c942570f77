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

//! In-memory [`Storage`] backend: a `HashMap` plus a root cell, guarded by
//! a plain `RwLock` since there is no I/O to suspend on.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use log::trace;

use super::{CancelToken, Storage};
use crate::error::{Error, Result};
use crate::field::Hash;
use crate::node::{Node, NodeKey};

/// A RAM-backed node store. The root slot starts unset (`get_root`
/// returns [`Error::NotFound`]) until [`crate::tree::Tree::new`]
/// initializes it to `HashZero`.
#[derive(Default)]
pub struct MemoryStorage {
    nodes: RwLock<HashMap<NodeKey, Node>>,
    root: RwLock<Option<Hash>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self { nodes: RwLock::new(HashMap::new()), root: RwLock::new(None) }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, ctx: &CancelToken, key: &NodeKey) -> Result<Node> {
        ctx.check()?;
        let nodes = self.nodes.read().unwrap();
        match nodes.get(key) {
            Some(n) => Ok(*n),
            None => {
                trace!(target: "smt::storage::memory::get", "key not found: {key}");
                Err(Error::NotFound)
            }
        }
    }

    async fn put(&self, ctx: &CancelToken, key: NodeKey, node: Node) -> Result<()> {
        ctx.check()?;
        self.nodes.write().unwrap().insert(key, node);
        Ok(())
    }

    async fn get_root(&self, ctx: &CancelToken) -> Result<Hash> {
        ctx.check()?;
        self.root.read().unwrap().ok_or(Error::NotFound)
    }

    async fn set_root(&self, ctx: &CancelToken, root: Hash) -> Result<()> {
        ctx.check()?;
        *self.root.write().unwrap() = Some(root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_storage_root_is_unset() {
        smol::block_on(async {
            let storage = MemoryStorage::new();
            let ctx = CancelToken::new();
            assert!(matches!(storage.get_root(&ctx).await, Err(Error::NotFound)));
        });
    }

    #[test]
    fn put_then_get_round_trips() {
        smol::block_on(async {
            let storage = MemoryStorage::new();
            let ctx = CancelToken::new();
            let node = Node::Leaf { k: Hash::from_u64(1), v: Hash::from_u64(2) };
            let key = NodeKey::from(node.hash().unwrap());
            storage.put(&ctx, key, node).await.unwrap();
            assert_eq!(storage.get(&ctx, &key).await.unwrap(), node);
        });
    }

    #[test]
    fn get_missing_key_is_not_found() {
        smol::block_on(async {
            let storage = MemoryStorage::new();
            let ctx = CancelToken::new();
            let key = NodeKey::from(Hash::from_u64(99));
            assert!(matches!(storage.get(&ctx, &key).await, Err(Error::NotFound)));
        });
    }
}
