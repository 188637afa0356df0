// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Per-table DDL locks.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::names::TableId;

/// The table locks of one node.
///
/// Every statement that propagates DDL on a table's statistics objects
/// takes the table's share-update-exclusive lock before it classifies the
/// statement, and keeps it until its transaction ends. The lock conflicts
/// with itself, so two sessions never plan conflicting changes to the same
/// table at once.
#[derive(Debug, Clone, Default)]
pub struct TableLocks {
    locks: Arc<Mutex<BTreeMap<TableId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl TableLocks {
    /// Acquires the share-update-exclusive lock on `table`, waiting for any
    /// other holder to release it.
    pub async fn lock_share_update_exclusive(&self, table: TableId) -> TableLockGuard {
        let lock = {
            let mut locks = self.locks.lock().expect("lock poisoned");
            Arc::clone(locks.entry(table).or_default())
        };
        let guard = match Arc::clone(&lock).try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(%table, "waiting for table lock");
                lock.lock_owned().await
            }
        };
        TableLockGuard {
            table,
            _guard: guard,
        }
    }

    /// Acquires the lock on `table` if no other session holds it.
    pub fn try_lock_share_update_exclusive(&self, table: TableId) -> Option<TableLockGuard> {
        let lock = {
            let mut locks = self.locks.lock().expect("lock poisoned");
            Arc::clone(locks.entry(table).or_default())
        };
        lock.try_lock_owned().ok().map(|guard| TableLockGuard {
            table,
            _guard: guard,
        })
    }
}

/// A held table lock. The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct TableLockGuard {
    table: TableId,
    _guard: OwnedMutexGuard<()>,
}

impl TableLockGuard {
    pub fn table(&self) -> TableId {
        self.table
    }
}
