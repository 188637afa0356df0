// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The transaction that encloses a propagated DDL statement.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::catalog::PropagationCatalog;
use crate::locks::TableLockGuard;
use crate::names::{ObjectAddress, TableId};
use crate::session::SessionContext;

/// The local transaction a DDL statement executes in.
///
/// The transaction owns the table locks its statements took and the catalog
/// effects that become visible only once it commits. Dropping it without
/// calling [`DdlTransaction::commit`] aborts it: the locks are released and
/// the pending effects discarded. Remote effects are rolled back by the
/// execution engine's distributed transaction, not here.
#[derive(Debug)]
pub struct DdlTransaction {
    session: SessionContext,
    locks: BTreeMap<TableId, TableLockGuard>,
    pending_distributed: BTreeSet<ObjectAddress>,
}

impl DdlTransaction {
    pub fn new(session: SessionContext) -> DdlTransaction {
        DdlTransaction {
            session,
            locks: BTreeMap::new(),
            pending_distributed: BTreeSet::new(),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionContext {
        &mut self.session
    }

    /// Reports whether the transaction already holds the lock on `table`.
    pub fn holds_lock(&self, table: TableId) -> bool {
        self.locks.contains_key(&table)
    }

    /// Hands a table lock to the transaction, which holds it until it ends.
    pub fn add_lock(&mut self, guard: TableLockGuard) {
        self.locks.entry(guard.table()).or_insert(guard);
    }

    /// Records that `object` now exists on every worker node. The record is
    /// written to the catalog when the transaction commits.
    pub fn mark_distributed(&mut self, object: ObjectAddress) {
        self.pending_distributed.insert(object);
    }

    pub fn is_pending_distributed(&self, object: ObjectAddress) -> bool {
        self.pending_distributed.contains(&object)
    }

    /// Commits the transaction's catalog effects and releases its locks.
    pub fn commit(self, catalog: &dyn PropagationCatalog) {
        for object in &self.pending_distributed {
            catalog.mark_object_distributed(*object);
        }
        debug!(
            locks = self.locks.len(),
            distributed = self.pending_distributed.len(),
            "committed ddl transaction"
        );
    }

    /// Aborts the transaction, discarding its catalog effects and releasing
    /// its locks.
    pub fn abort(self) {
        debug!(
            locks = self.locks.len(),
            discarded = self.pending_distributed.len(),
            "aborted ddl transaction"
        );
    }
}
