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

//! The content-addressed node store plus a singleton "current root" slot.
//! Concrete backends live in submodules; [`memory`] is always available,
//! [`sql`] is gated behind the `sql` feature.

pub mod memory;
#[cfg(feature = "sql")]
pub mod sql;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::field::Hash;
use crate::node::{Node, NodeKey};

pub use memory::MemoryStorage;
#[cfg(feature = "sql")]
pub use sql::SqliteStorage;

/// Cooperative cancellation flag, checked at each [`Storage`] call
/// boundary so a long-running operation can be interrupted from another
/// task. Cloning shares the same underlying flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::StorageError("operation cancelled".into()))
        }
        Ok(())
    }
}

/// The content-addressable node store plus a singleton "current root"
/// slot. Implementations may be shared across multiple
/// [`crate::tree::Tree`] instances (e.g. the SQL backend scopes rows by a
/// caller-supplied `mt_id`); each tree is the sole writer to its own root
/// slot.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, ctx: &CancelToken, key: &NodeKey) -> Result<Node>;
    async fn put(&self, ctx: &CancelToken, key: NodeKey, node: Node) -> Result<()>;
    async fn get_root(&self, ctx: &CancelToken) -> Result<Hash>;
    async fn set_root(&self, ctx: &CancelToken, root: Hash) -> Result<()>;
}

/// Selects among the backends compiled into this crate.
pub enum StorageConfig {
    /// An in-memory node store; contents don't survive process exit.
    Memory,
    /// A SQLite-backed node store scoped by `mt_id`, sharing one database
    /// file (or an in-memory connection if `path` is `None`) across
    /// however many trees pass distinct `mt_id`s.
    #[cfg(feature = "sql")]
    Sqlite { path: Option<PathBuf>, mt_id: i64 },
}

impl StorageConfig {
    /// Build the configured backend, boxed as a trait object ready to
    /// hand to [`crate::tree::Tree::new`].
    pub fn build(self) -> Result<Arc<dyn Storage>> {
        match self {
            StorageConfig::Memory => Ok(Arc::new(MemoryStorage::new())),
            #[cfg(feature = "sql")]
            StorageConfig::Sqlite { path, mt_id } => Ok(Arc::new(SqliteStorage::new(path, mt_id)?)),
        }
    }
}
