// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Decides whether DDL on a table is propagated.

use std::fmt;

use crate::catalog::PropagationCatalog;
use crate::error::PropagationError;
use crate::names::TableId;
use crate::session::{CommandOrigin, NodeRole, SessionContext};

/// The outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// The DDL must be propagated to every worker node.
    Propagate,
    /// The DDL stays local.
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The table is not distributed.
    LocalTable,
    /// The session disabled DDL propagation.
    PropagationDisabled,
    /// The statement was itself propagated from another node.
    PropagatedCommand,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            SkipReason::LocalTable => "table is not distributed",
            SkipReason::PropagationDisabled => "ddl propagation is disabled",
            SkipReason::PropagatedCommand => "statement was propagated",
        })
    }
}

/// Classifies DDL that affects `table`.
///
/// Has no side effects, so it may be called before the table is locked. A
/// result obtained without the lock is only a hint; callers classify again
/// once they hold it.
pub fn classify(
    session: &SessionContext,
    catalog: &dyn PropagationCatalog,
    table: TableId,
) -> Eligibility {
    if !catalog.is_distributed_table(table) {
        Eligibility::Skip(SkipReason::LocalTable)
    } else if session.origin == CommandOrigin::Propagated {
        Eligibility::Skip(SkipReason::PropagatedCommand)
    } else if !session.enable_ddl_propagation {
        Eligibility::Skip(SkipReason::PropagationDisabled)
    } else {
        Eligibility::Propagate
    }
}

/// Fails unless the session may originate cluster-wide DDL.
pub fn ensure_coordinator(session: &SessionContext) -> Result<(), PropagationError> {
    match session.node_role {
        NodeRole::Coordinator => Ok(()),
        NodeRole::Worker => Err(PropagationError::NotCoordinator),
    }
}
