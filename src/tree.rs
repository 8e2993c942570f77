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

//! The tree engine: `Add`, `AddEntry`, `Update`, `Delete`, `Get`,
//! `GetNode`, `Snapshot`, `Walk`, plus the recursive `addLeaf`/`pushLeaf`
//! insertion helpers and the `rmAndUpload` deletion/compaction path.

use std::sync::Arc;

use async_recursion::async_recursion;
use log::{debug, trace};
use smol::lock::RwLock;

use crate::circom::{CircomProcessorProof, CircomVerifierProof};
use crate::error::{Error, Result};
use crate::field::{Hash, HASH_ZERO};
use crate::node::{Node, NodeKey};
use crate::path::path;
use crate::proof::Proof;
use crate::storage::{CancelToken, Storage};

/// Outcome of [`Tree::get`]. `found` distinguishes the three cases a
/// lookup can land on: traversal ended at `Empty` (`found = false`,
/// `k = v = HashZero`), at a matching `Leaf` (`found = true`), or at a
/// non-matching `Leaf` — the "intruder" — whose `(k, v)` are still
/// carried through with `found = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult {
    pub k: Hash,
    pub v: Hash,
    pub siblings: Vec<Hash>,
    pub found: bool,
}

/// A precomputed `(hIndex, hValue)` pair, as inserted by
/// [`Tree::add_entry`]. Both elements are validated in-field before
/// insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub h_index: Hash,
    pub h_value: Hash,
}

/// A persistent key→value mapping authenticated by a single root hash.
/// Mutators require `writable`; a [`Tree::snapshot`] is always read-only.
pub struct Tree {
    storage: Arc<dyn Storage>,
    root_key: RwLock<Hash>,
    max_levels: usize,
    writable: bool,
}

impl Tree {
    /// Create (or attach to) a tree over `storage`. If the storage's root
    /// slot is absent, it is initialized to `HashZero`.
    pub async fn new(storage: Arc<dyn Storage>, max_levels: usize, ctx: &CancelToken) -> Result<Self> {
        let root = match storage.get_root(ctx).await {
            Ok(r) => r,
            Err(Error::NotFound) => {
                storage.set_root(ctx, HASH_ZERO).await?;
                HASH_ZERO
            }
            Err(e) => return Err(e),
        };
        Ok(Self { storage, root_key: RwLock::new(root), max_levels, writable: true })
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub async fn root(&self) -> Hash {
        *self.root_key.read().await
    }

    /// A read-only [`Tree`] pinned to `root_key`. The caller must ensure
    /// the nodes under that root still exist in `storage`; this
    /// constructor eagerly checks that `root_key` itself resolves (unless
    /// it's `HashZero`, the empty tree).
    pub async fn snapshot(&self, ctx: &CancelToken, root_key: Hash) -> Result<Tree> {
        if !root_key.is_zero() {
            self.storage.get(ctx, &NodeKey::from(root_key)).await?;
        }
        Ok(Tree {
            storage: self.storage.clone(),
            root_key: RwLock::new(root_key),
            max_levels: self.max_levels,
            writable: false,
        })
    }

    /// Fetch a raw stored node by its content-address.
    pub async fn get_node(&self, ctx: &CancelToken, key: &NodeKey) -> Result<Node> {
        if key.is_zero() {
            return Ok(Node::Empty)
        }
        self.storage.get(ctx, key).await
    }

    fn require_writable(&self) -> Result<()> {
        if !self.writable {
            return Err(Error::NotWritable)
        }
        Ok(())
    }

    // ---- Add -------------------------------------------------------

    /// Insert a brand-new `(k, v)` mapping.
    pub async fn add(&self, ctx: &CancelToken, k: &Hash, v: &Hash) -> Result<()> {
        self.require_writable()?;
        let mut root_key = self.root_key.write().await;

        let new_leaf = Node::Leaf { k: *k, v: *v };
        let path = path(k, self.max_levels);
        let new_root = self.add_leaf(ctx, new_leaf, *root_key, 0, &path).await?;

        self.storage.set_root(ctx, new_root).await?;
        *root_key = new_root;
        debug!(target: "smt::tree::add", "[Tree] added entry, new root {new_root}");
        Ok(())
    }

    /// Insert a precomputed [`Entry`], validating both elements are
    /// in-field first.
    pub async fn add_entry(&self, ctx: &CancelToken, entry: &Entry) -> Result<()> {
        entry.h_index.check_in_field()?;
        entry.h_value.check_in_field()?;
        self.add(ctx, &entry.h_index, &entry.h_value).await
    }

    /// Like [`Tree::add`] but also returns a [`CircomProcessorProof`]
    /// describing the insertion (`Fnc = 2`), siblings zero-padded to
    /// `max_levels + 1`. The lookup of any prior "intruder" leaf at `k`'s
    /// path and the insertion itself happen under a single held write
    /// lock, so a concurrent mutator can't interleave between the two and
    /// leave the returned proof describing a transition that never
    /// actually happened.
    pub async fn add_and_get_proof(
        &self,
        ctx: &CancelToken,
        k: &Hash,
        v: &Hash,
    ) -> Result<CircomProcessorProof> {
        self.require_writable()?;
        let mut root_key = self.root_key.write().await;
        let old_root = *root_key;

        let path_bits = path(k, self.max_levels);
        let before = self.traverse(ctx, old_root, k, &path_bits).await?;

        let (old_key, old_value, is_old0) = match (before.found, before.k.is_zero()) {
            (true, _) => (HASH_ZERO, HASH_ZERO, false),
            (false, true) => (HASH_ZERO, HASH_ZERO, true),
            (false, false) => (before.k, before.v, false),
        };

        let new_leaf = Node::Leaf { k: *k, v: *v };
        let new_root = self.add_leaf(ctx, new_leaf, old_root, 0, &path_bits).await?;
        self.storage.set_root(ctx, new_root).await?;
        *root_key = new_root;

        let mut siblings = before.siblings;
        siblings.resize(self.max_levels + 1, HASH_ZERO);

        debug!(target: "smt::tree::add_and_get_proof", "[Tree] added entry, new root {new_root}");

        Ok(CircomProcessorProof {
            old_root,
            new_root,
            siblings,
            old_key,
            old_value,
            new_key: *k,
            new_value: *v,
            is_old0,
            fnc: 2,
        })
    }

    #[async_recursion]
    async fn add_leaf(
        &self,
        ctx: &CancelToken,
        new_leaf: Node,
        key: Hash,
        lvl: usize,
        path: &[bool],
    ) -> Result<Hash> {
        if lvl > self.max_levels - 1 {
            return Err(Error::ReachedMaxLevel)
        }

        let node = if key.is_zero() {
            Node::Empty
        } else {
            self.storage.get(ctx, &NodeKey::from(key)).await?
        };

        let Node::Leaf { k: new_k, .. } = new_leaf else {
            unreachable!("add_leaf is only ever called with a Leaf node")
        };

        match node {
            Node::Empty => {
                let new_key = new_leaf.hash()?;
                self.add_node(ctx, new_key, new_leaf).await?;
                Ok(new_key)
            }
            Node::Leaf { k: old_k, .. } if old_k == new_k => Err(Error::EntryIndexAlreadyExists),
            old_leaf @ Node::Leaf { k: old_k, .. } => {
                let path_new = self::path(&new_k, self.max_levels);
                let path_old = self::path(&old_k, self.max_levels);
                self.push_leaf(ctx, new_leaf, old_leaf, lvl, &path_new, &path_old).await
            }
            Node::Middle { l, r } => {
                let child = if path[lvl] { r } else { l };
                let new_child = self.add_leaf(ctx, new_leaf, child, lvl + 1, path).await?;
                let new_middle = if path[lvl] {
                    Node::Middle { l, r: new_child }
                } else {
                    Node::Middle { l: new_child, r }
                };
                let new_key = new_middle.hash()?;
                self.add_node(ctx, new_key, new_middle).await?;
                Ok(new_key)
            }
        }
    }

    #[async_recursion]
    async fn push_leaf(
        &self,
        ctx: &CancelToken,
        new_leaf: Node,
        old_leaf: Node,
        lvl: usize,
        path_new: &[bool],
        path_old: &[bool],
    ) -> Result<Hash> {
        if lvl > self.max_levels - 2 {
            return Err(Error::ReachedMaxLevel)
        }

        if path_new[lvl] == path_old[lvl] {
            let next = self.push_leaf(ctx, new_leaf, old_leaf, lvl + 1, path_new, path_old).await?;
            let middle = if path_new[lvl] {
                Node::Middle { l: HASH_ZERO, r: next }
            } else {
                Node::Middle { l: next, r: HASH_ZERO }
            };
            let key = middle.hash()?;
            self.add_node(ctx, key, middle).await?;
            Ok(key)
        } else {
            let old_key = old_leaf.hash()?;
            let new_key = new_leaf.hash()?;
            // old_leaf is already in storage from a prior insertion.
            self.add_node(ctx, new_key, new_leaf).await?;
            let middle = if path_new[lvl] {
                Node::Middle { l: old_key, r: new_key }
            } else {
                Node::Middle { l: new_key, r: old_key }
            };
            let key = middle.hash()?;
            self.add_node(ctx, key, middle).await?;
            Ok(key)
        }
    }

    /// Store a brand-new node, content-addressed by its own hash. Storing
    /// a node whose key is already present is tolerated as a no-op: by
    /// construction the existing content must be identical (it's the same
    /// hash), which happens routinely when recompaction recreates a
    /// subtree that an earlier, still-orphaned write already produced.
    async fn add_node(&self, ctx: &CancelToken, key: Hash, node: Node) -> Result<()> {
        if node.is_empty() {
            return Ok(())
        }
        let node_key = NodeKey::from(key);
        let result = match self.storage.get(ctx, &node_key).await {
            Ok(_) => Err(Error::NodeKeyAlreadyExists),
            Err(Error::NotFound) => self.storage.put(ctx, node_key, node).await,
            Err(e) => Err(e),
        };
        match result {
            Err(Error::NodeKeyAlreadyExists) => {
                trace!(target: "smt::tree::add_node", "key {key} already stored, skipping");
                Ok(())
            }
            other => other,
        }
    }

    /// Overwrite (or create) a node unconditionally.
    async fn update_node(&self, ctx: &CancelToken, key: Hash, node: Node) -> Result<()> {
        if node.is_empty() {
            return Ok(())
        }
        self.storage.put(ctx, NodeKey::from(key), node).await
    }

    // ---- Get ---------------------------------------------------------

    /// Descend from `root_key` along `k`'s path, collecting siblings
    /// until the traversal lands on `Empty` or a `Leaf`. Shared by
    /// [`Tree::get`] (against the tree's current root) and
    /// [`Tree::add_and_get_proof`] (against a root already captured under
    /// a held write lock — it must never itself try to acquire the lock).
    async fn traverse(&self, ctx: &CancelToken, root_key: Hash, k: &Hash, path: &[bool]) -> Result<GetResult> {
        let mut siblings = Vec::new();
        let mut next_key = root_key;

        for lvl in 0..self.max_levels {
            if next_key.is_zero() {
                return Ok(GetResult { k: HASH_ZERO, v: HASH_ZERO, siblings, found: false })
            }

            match self.storage.get(ctx, &NodeKey::from(next_key)).await? {
                Node::Leaf { k: lk, v: lv } => {
                    return Ok(GetResult { k: lk, v: lv, siblings, found: lk == *k })
                }
                Node::Middle { l, r } => {
                    let (sibling, child) = if path[lvl] { (l, r) } else { (r, l) };
                    siblings.push(sibling);
                    next_key = child;
                }
                Node::Empty => unreachable!("zero keys are handled before the storage lookup"),
            }
        }

        Err(Error::ReachedMaxLevel)
    }

    /// Look up `k`. See [`GetResult`] for what each outcome carries.
    pub async fn get(&self, ctx: &CancelToken, k: &Hash) -> Result<GetResult> {
        let root_key = self.root().await;
        let path = path(k, self.max_levels);
        self.traverse(ctx, root_key, k, &path).await
    }

    // ---- Update --------------------------------------------------------

    /// Overwrite the value stored at `k`. Fails with `KeyNotFound` if `k`
    /// is absent. Returns a [`CircomProcessorProof`] (`Fnc = 1`). Holds
    /// the write lock for the whole operation, including every
    /// `Storage` call, so a concurrent mutator can never observe (or
    /// clobber) a root this call is still in the middle of recomputing.
    pub async fn update(&self, ctx: &CancelToken, k: &Hash, v: &Hash) -> Result<CircomProcessorProof> {
        self.require_writable()?;
        let mut root_key = self.root_key.write().await;
        let old_root = *root_key;
        let path = path(k, self.max_levels);

        let mut siblings = Vec::new();
        let mut next_key = old_root;

        let old_value = loop {
            if next_key.is_zero() {
                return Err(Error::KeyNotFound)
            }

            match self.storage.get(ctx, &NodeKey::from(next_key)).await? {
                Node::Leaf { k: lk, v: lv } if lk == *k => break lv,
                Node::Leaf { .. } => return Err(Error::KeyNotFound),
                Node::Middle { l, r } => {
                    let lvl = siblings.len();
                    let (sibling, child) = if path[lvl] { (l, r) } else { (r, l) };
                    siblings.push(sibling);
                    next_key = child;
                }
                Node::Empty => unreachable!(),
            }

            if siblings.len() > self.max_levels {
                return Err(Error::ReachedMaxLevel)
            }
        };

        let new_leaf = Node::Leaf { k: *k, v: *v };
        let new_leaf_key = new_leaf.hash()?;
        self.update_node(ctx, new_leaf_key, new_leaf).await?;

        let new_root = self.recalculate_path_until_root(ctx, new_leaf_key, &siblings, &path).await?;
        self.storage.set_root(ctx, new_root).await?;
        *root_key = new_root;

        let mut padded = siblings.clone();
        padded.resize(self.max_levels + 1, HASH_ZERO);

        debug!(target: "smt::tree::update", "[Tree] updated entry, new root {new_root}");

        Ok(CircomProcessorProof {
            old_root,
            new_root,
            siblings: padded,
            old_key: *k,
            old_value,
            new_key: *k,
            new_value: *v,
            is_old0: false,
            fnc: 1,
        })
    }

    /// Rebuild the chain of `Middle` nodes from `leaf_key` up through
    /// `siblings` (index 0 nearest the root) to a new root hash.
    async fn recalculate_path_until_root(
        &self,
        ctx: &CancelToken,
        leaf_key: Hash,
        siblings: &[Hash],
        path: &[bool],
    ) -> Result<Hash> {
        let mut key = leaf_key;
        for lvl in (0..siblings.len()).rev() {
            let sibling = siblings[lvl];
            let middle = if path[lvl] {
                Node::Middle { l: sibling, r: key }
            } else {
                Node::Middle { l: key, r: sibling }
            };
            let middle_key = middle.hash()?;
            self.add_node(ctx, middle_key, middle).await?;
            key = middle_key;
        }
        Ok(key)
    }

    // ---- Delete --------------------------------------------------------

    /// Remove the leaf at `k`, recompacting the path above it
    /// (`rmAndUpload`). Fails with `KeyNotFound` if `k` is absent. Holds
    /// the write lock for the whole operation, same rationale as
    /// [`Tree::update`].
    pub async fn delete(&self, ctx: &CancelToken, k: &Hash) -> Result<()> {
        self.require_writable()?;
        let mut root_key = self.root_key.write().await;
        let path = path(k, self.max_levels);

        let mut siblings = Vec::new();
        let mut next_key = *root_key;

        loop {
            if next_key.is_zero() {
                return Err(Error::KeyNotFound)
            }

            match self.storage.get(ctx, &NodeKey::from(next_key)).await? {
                Node::Leaf { k: lk, .. } if lk == *k => break,
                Node::Leaf { .. } => return Err(Error::KeyNotFound),
                Node::Middle { l, r } => {
                    let lvl = siblings.len();
                    let (sibling, child) = if path[lvl] { (l, r) } else { (r, l) };
                    siblings.push(sibling);
                    next_key = child;
                }
                Node::Empty => unreachable!(),
            }

            if siblings.len() > self.max_levels {
                return Err(Error::ReachedMaxLevel)
            }
        }

        let new_root = self.rm_and_upload(ctx, &siblings, &path).await?;
        self.storage.set_root(ctx, new_root).await?;
        *root_key = new_root;
        debug!(target: "smt::tree::delete", "[Tree] deleted entry, new root {new_root}");
        Ok(())
    }

    /// Compact the path above a just-deleted leaf. `siblings`/`path` are
    /// the deleted leaf's full root-to-leaf sibling vector (index 0
    /// nearest the root). A lone leaf sibling can be promoted all the way
    /// up through any empty levels above it — a `Leaf`'s hash doesn't
    /// encode its depth, and traversal always stops at the first `Leaf`
    /// it meets regardless of level, so moving one up is transparent to
    /// future lookups. A `Middle` sibling can't be promoted the same way
    /// — its own children were partitioned on a bit index tied to its
    /// current depth — so it's left exactly where it is, with the
    /// deleted leaf's slot simply zeroed.
    async fn rm_and_upload(&self, ctx: &CancelToken, siblings: &[Hash], path: &[bool]) -> Result<Hash> {
        if siblings.is_empty() {
            return Ok(HASH_ZERO)
        }

        let to_upload = *siblings.last().unwrap();
        let deepest = siblings.len() - 1;
        let to_upload_node = if to_upload.is_zero() {
            Node::Empty
        } else {
            self.storage.get(ctx, &NodeKey::from(to_upload)).await?
        };

        if matches!(to_upload_node, Node::Leaf { .. }) {
            for i in (0..deepest).rev() {
                if siblings[i].is_zero() {
                    continue
                }

                let middle = if path[i] {
                    Node::Middle { l: siblings[i], r: to_upload }
                } else {
                    Node::Middle { l: to_upload, r: siblings[i] }
                };
                let middle_key = middle.hash()?;
                self.add_node(ctx, middle_key, middle).await?;
                return self.recalculate_path_until_root(ctx, middle_key, &siblings[..i], &path[..i]).await
            }
            return Ok(to_upload)
        }

        let middle = if path[deepest] {
            Node::Middle { l: to_upload, r: HASH_ZERO }
        } else {
            Node::Middle { l: HASH_ZERO, r: to_upload }
        };
        let middle_key = middle.hash()?;
        self.add_node(ctx, middle_key, middle).await?;
        self.recalculate_path_until_root(ctx, middle_key, &siblings[..deepest], &path[..deepest]).await
    }

    // ---- Proof generation ----------------------------------------------

    /// Build a [`Proof`] of (non-)existence of `k` under `root_key` (or
    /// the tree's current root), and the value found (`HashZero` on
    /// non-existence).
    pub async fn generate_proof(
        &self,
        ctx: &CancelToken,
        k: &Hash,
        root_key: Option<Hash>,
    ) -> Result<(Proof, Hash)> {
        let root_key = match root_key {
            Some(r) => r,
            None => self.root().await,
        };
        let path = path(k, self.max_levels);

        let mut siblings = Vec::new();
        let mut next_key = root_key;

        loop {
            if next_key.is_zero() {
                let proof = Proof { existence: false, siblings, node_aux: None };
                return Ok((proof, HASH_ZERO))
            }

            match self.storage.get(ctx, &NodeKey::from(next_key)).await? {
                Node::Leaf { k: lk, v: lv } => {
                    if lk == *k {
                        let proof = Proof { existence: true, siblings, node_aux: None };
                        return Ok((proof, lv))
                    }
                    let proof = Proof { existence: false, siblings, node_aux: Some((lk, lv)) };
                    return Ok((proof, HASH_ZERO))
                }
                Node::Middle { l, r } => {
                    let lvl = siblings.len();
                    let (sibling, child) = if path[lvl] { (l, r) } else { (r, l) };
                    siblings.push(sibling);
                    next_key = child;
                }
                Node::Empty => unreachable!(),
            }

            if siblings.len() > self.max_levels {
                return Err(Error::ReachedMaxLevel)
            }
        }
    }

    /// [`generate_proof`](Tree::generate_proof) reshaped into a
    /// [`CircomVerifierProof`], siblings truncated exactly as the proof
    /// produced them — no zero padding (the "smart-contract" shape).
    pub async fn generate_sc_verifier_proof(
        &self,
        ctx: &CancelToken,
        k: &Hash,
        root_key: Option<Hash>,
    ) -> Result<CircomVerifierProof> {
        let root = match root_key {
            Some(r) => r,
            None => self.root().await,
        };
        let (proof, v) = self.generate_proof(ctx, k, Some(root)).await?;
        Ok(CircomVerifierProof::from_proof_sc(&proof, root, *k, v))
    }

    /// Same as [`Tree::generate_sc_verifier_proof`] but zero-pads
    /// `siblings` to `max_levels + 1` — the shape circom circuits expect.
    pub async fn generate_circom_verifier_proof(
        &self,
        ctx: &CancelToken,
        k: &Hash,
        root_key: Option<Hash>,
    ) -> Result<CircomVerifierProof> {
        let root = match root_key {
            Some(r) => r,
            None => self.root().await,
        };
        let (proof, v) = self.generate_proof(ctx, k, Some(root)).await?;
        Ok(CircomVerifierProof::from_proof_circom(&proof, root, *k, v, self.max_levels))
    }

    // ---- Walk ------------------------------------------------------------

    /// Visit every stored `Leaf`/`Middle` node reachable from `root_key`
    /// (or the current root), depth-first, calling `f(key, node)` on each.
    pub async fn walk<F>(&self, ctx: &CancelToken, root_key: Option<Hash>, mut f: F) -> Result<()>
    where
        F: FnMut(Hash, Node) + Send,
    {
        let root_key = match root_key {
            Some(r) => r,
            None => self.root().await,
        };
        self.walk_rec(ctx, root_key, &mut f).await
    }

    #[async_recursion]
    async fn walk_rec<F>(&self, ctx: &CancelToken, key: Hash, f: &mut F) -> Result<()>
    where
        F: FnMut(Hash, Node) + Send,
    {
        if key.is_zero() {
            return Ok(())
        }
        let node = self.storage.get(ctx, &NodeKey::from(key)).await?;
        f(key, node);
        if let Node::Middle { l, r } = node {
            self.walk_rec(ctx, l, f).await?;
            self.walk_rec(ctx, r, f).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    async fn empty_tree(max_levels: usize) -> Tree {
        let ctx = CancelToken::new();
        Tree::new(Arc::new(MemoryStorage::new()), max_levels, &ctx).await.unwrap()
    }

    #[test]
    fn empty_tree_has_zero_root() {
        smol::block_on(async {
            let tree = empty_tree(10).await;
            assert_eq!(tree.root().await, HASH_ZERO);
        });
    }

    #[test]
    fn add_then_get_round_trips() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            let k = Hash::from_u64(1);
            let v = Hash::from_u64(2);
            tree.add(&ctx, &k, &v).await.unwrap();

            let result = tree.get(&ctx, &k).await.unwrap();
            assert!(result.found);
            assert_eq!(result.v, v);
        });
    }

    #[test]
    fn add_duplicate_key_fails() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            let k = Hash::from_u64(1);
            tree.add(&ctx, &k, &Hash::from_u64(2)).await.unwrap();
            assert!(matches!(
                tree.add(&ctx, &k, &Hash::from_u64(3)).await,
                Err(Error::EntryIndexAlreadyExists)
            ));
        });
    }

    #[test]
    fn get_missing_key_returns_not_found_with_zeros() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            let result = tree.get(&ctx, &Hash::from_u64(42)).await.unwrap();
            assert!(!result.found);
            assert!(result.k.is_zero());
            assert!(result.v.is_zero());
        });
    }

    #[test]
    fn get_intruder_key_carries_through() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            let k1 = Hash::from_u64(1);
            let v1 = Hash::from_u64(2);
            tree.add(&ctx, &k1, &v1).await.unwrap();

            // A single-leaf tree's only leaf sits directly at the root, so
            // any other key's traversal lands on it immediately: this is
            // the "intruder" case — found = false, but (k, v) carried
            // through are the stored leaf's, not HashZero.
            let result = tree.get(&ctx, &Hash::from_u64(999)).await.unwrap();
            assert!(!result.found);
            assert_eq!(result.k, k1);
            assert_eq!(result.v, v1);

            // An absent key sharing no leaf (truly empty tree) still
            // returns zeros.
            let empty = empty_tree(10).await;
            let miss = empty.get(&ctx, &Hash::from_u64(999)).await.unwrap();
            assert!(!miss.found);
            assert!(miss.k.is_zero());
            assert!(miss.v.is_zero());
        });
    }

    #[test]
    fn update_round_trip() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            let k = Hash::from_u64(1);
            tree.add(&ctx, &k, &Hash::from_u64(2)).await.unwrap();
            let proof = tree.update(&ctx, &k, &Hash::from_u64(3)).await.unwrap();
            assert_eq!(proof.fnc, 1);
            assert_eq!(proof.old_value, Hash::from_u64(2));
            assert_eq!(proof.new_value, Hash::from_u64(3));

            let result = tree.get(&ctx, &k).await.unwrap();
            assert_eq!(result.v, Hash::from_u64(3));
        });
    }

    #[test]
    fn update_missing_key_fails() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            assert!(matches!(
                tree.update(&ctx, &Hash::from_u64(1), &Hash::from_u64(2)).await,
                Err(Error::KeyNotFound)
            ));
        });
    }

    #[test]
    fn add_then_delete_restores_empty_root() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            let k = Hash::from_u64(1);
            let v = Hash::from_u64(2);
            tree.add(&ctx, &k, &v).await.unwrap();
            tree.delete(&ctx, &k).await.unwrap();
            assert_eq!(tree.root().await, HASH_ZERO);
        });
    }

    #[test]
    fn delete_missing_key_fails() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            assert!(matches!(tree.delete(&ctx, &Hash::from_u64(1)).await, Err(Error::KeyNotFound)));
        });
    }

    #[test]
    fn add_delete_identity_with_multiple_entries() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(16).await;
            tree.add(&ctx, &Hash::from_u64(1), &Hash::from_u64(2)).await.unwrap();
            tree.add(&ctx, &Hash::from_u64(33), &Hash::from_u64(44)).await.unwrap();
            let root_before = tree.root().await;

            tree.add(&ctx, &Hash::from_u64(1234), &Hash::from_u64(9876)).await.unwrap();
            tree.delete(&ctx, &Hash::from_u64(1234)).await.unwrap();

            assert_eq!(tree.root().await, root_before);
        });
    }

    #[test]
    fn order_independence_of_root() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree_a = empty_tree(16).await;
            tree_a.add(&ctx, &Hash::from_u64(1), &Hash::from_u64(2)).await.unwrap();
            tree_a.add(&ctx, &Hash::from_u64(33), &Hash::from_u64(44)).await.unwrap();
            tree_a.add(&ctx, &Hash::from_u64(1234), &Hash::from_u64(9876)).await.unwrap();

            let tree_b = empty_tree(16).await;
            tree_b.add(&ctx, &Hash::from_u64(1234), &Hash::from_u64(9876)).await.unwrap();
            tree_b.add(&ctx, &Hash::from_u64(1), &Hash::from_u64(2)).await.unwrap();
            tree_b.add(&ctx, &Hash::from_u64(33), &Hash::from_u64(44)).await.unwrap();

            assert_eq!(tree_a.root().await, tree_b.root().await);
        });
    }

    #[test]
    fn snapshot_is_not_writable() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            tree.add(&ctx, &Hash::from_u64(1), &Hash::from_u64(2)).await.unwrap();
            let root = tree.root().await;
            let snap = tree.snapshot(&ctx, root).await.unwrap();
            assert!(!snap.is_writable());
            assert!(matches!(
                snap.add(&ctx, &Hash::from_u64(2), &Hash::from_u64(3)).await,
                Err(Error::NotWritable)
            ));
        });
    }

    #[test]
    fn snapshot_of_missing_root_fails() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(10).await;
            let bogus_root = Hash::from_u64(123456789);
            assert!(tree.snapshot(&ctx, bogus_root).await.is_err());
        });
    }

    #[test]
    fn max_level_guard_on_deep_collision() {
        smol::block_on(async {
            // max_levels = 4: keys 1 and 17 (= 1 + 2^4) agree on bits 0..3,
            // so pushLeaf must recurse past lvl = max_levels - 2 trying to
            // separate them.
            let ctx = CancelToken::new();
            let tree = Tree::new(Arc::new(MemoryStorage::new()), 4, &ctx).await.unwrap();
            tree.add(&ctx, &Hash::from_u64(1), &Hash::from_u64(2)).await.unwrap();
            assert!(matches!(
                tree.add(&ctx, &Hash::from_u64(17), &Hash::from_u64(22)).await,
                Err(Error::ReachedMaxLevel)
            ));
        });
    }

    #[test]
    fn walk_visits_every_stored_node() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(16).await;
            tree.add(&ctx, &Hash::from_u64(1), &Hash::from_u64(2)).await.unwrap();
            tree.add(&ctx, &Hash::from_u64(33), &Hash::from_u64(44)).await.unwrap();

            let mut leaves = Vec::new();
            tree.walk(&ctx, None, |_key, node| {
                if let Node::Leaf { k, v } = node {
                    leaves.push((k, v));
                }
            })
            .await
            .unwrap();

            assert_eq!(leaves.len(), 2);
        });
    }

    #[test]
    fn add_and_get_proof_matches_separate_add_then_proof() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(16).await;
            tree.add(&ctx, &Hash::from_u64(1), &Hash::from_u64(2)).await.unwrap();
            let old_root = tree.root().await;

            let proof = tree.add_and_get_proof(&ctx, &Hash::from_u64(33), &Hash::from_u64(44)).await.unwrap();
            assert_eq!(proof.fnc, 2);
            assert_eq!(proof.old_root, old_root);
            assert_eq!(proof.new_root, tree.root().await);
            assert!(proof.is_old0);

            let result = tree.get(&ctx, &Hash::from_u64(33)).await.unwrap();
            assert!(result.found);
            assert_eq!(result.v, Hash::from_u64(44));
        });
    }

    #[test]
    fn add_entry_validates_field_range() {
        smol::block_on(async {
            let ctx = CancelToken::new();
            let tree = empty_tree(16).await;
            let mut raw = [0u8; 32];
            raw[31] = 0xFF;
            let out_of_field = Hash::from_bytes(raw);
            let entry = Entry { h_index: out_of_field, h_value: Hash::from_u64(1) };
            assert!(tree.add_entry(&ctx, &entry).await.is_err());
        });
    }
}
