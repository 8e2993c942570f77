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

//! Dump every leaf under a root to a flat byte stream, and rebuild a tree
//! from one. SMT roots don't depend on insertion order, so re-importing a
//! dump always reproduces the source root, regardless of the order
//! `dump_leaves` happened to walk them in.

use crate::error::{Error, Result};
use crate::field::{Hash, HASH_SIZE};
use crate::node::Node;
use crate::storage::CancelToken;
use crate::tree::Tree;

/// Walk every `Leaf` reachable from `root_key` (or the tree's current
/// root) and emit `k(32) || v(32)` for each, in walk order.
pub async fn dump_leaves(tree: &Tree, ctx: &CancelToken, root_key: Option<Hash>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    tree.walk(ctx, root_key, |_key, node| {
        if let Node::Leaf { k, v } = node {
            out.extend_from_slice(k.as_bytes());
            out.extend_from_slice(v.as_bytes());
        }
    })
    .await?;
    Ok(out)
}

/// Insert every `k||v` pair from a [`dump_leaves`] byte stream via
/// [`Tree::add`]. `bytes.len()` must be a multiple of 64.
pub async fn import_dumped_leaves(tree: &Tree, ctx: &CancelToken, bytes: &[u8]) -> Result<()> {
    if bytes.len() % (HASH_SIZE * 2) != 0 {
        return Err(Error::BadNodeBytes)
    }

    for chunk in bytes.chunks(HASH_SIZE * 2) {
        let mut kb = [0u8; HASH_SIZE];
        let mut vb = [0u8; HASH_SIZE];
        kb.copy_from_slice(&chunk[..HASH_SIZE]);
        vb.copy_from_slice(&chunk[HASH_SIZE..]);
        tree.add(ctx, &Hash::from_bytes(kb), &Hash::from_bytes(vb)).await?;
    }

    Ok(())
}
