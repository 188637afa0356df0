// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Planning of propagation units.

use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

use crate::names::{NodeId, TableId};

/// A worker node of the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerNode {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
}

/// Provides the current members of the cluster.
pub trait ClusterMembership: Debug + Send + Sync {
    /// Returns the worker nodes that are currently part of the cluster.
    fn current_worker_nodes(&self) -> Vec<WorkerNode>;
}

/// How the execution engine runs a unit's command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionFlags {
    /// Whether the command must run in a transaction of its own, outside
    /// the one of the statement that planned it.
    pub start_new_transaction: bool,
    /// Whether the command concurrently builds an index, which forbids
    /// running it in a transaction block.
    pub concurrent_index_cmd: bool,
}

impl fmt::Display for ExecutionFlags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "start_new_transaction={}, concurrent_index_cmd={}",
            self.start_new_transaction, self.concurrent_index_cmd
        )
    }
}

/// The kinds of objects whose DDL is propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectKind {
    Statistics,
    Schema,
}

impl ObjectKind {
    /// The execution flags of commands on objects of this kind.
    ///
    /// Neither kind needs a transaction of its own, so the effects of their
    /// commands are visible to the rest of the distributed transaction.
    pub fn execution_flags(&self) -> ExecutionFlags {
        match self {
            ObjectKind::Statistics | ObjectKind::Schema => ExecutionFlags {
                start_new_transaction: false,
                concurrent_index_cmd: false,
            },
        }
    }
}

/// One command to run on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    node: WorkerNode,
    command: String,
}

impl Task {
    pub fn node(&self) -> &WorkerNode {
        &self.node
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// A command, planned for execution on every worker node.
///
/// Units are immutable. Ownership passes to the execution engine, which
/// consumes each unit exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationUnit {
    target_table: Option<TableId>,
    command: String,
    flags: ExecutionFlags,
    tasks: Vec<Task>,
}

impl PropagationUnit {
    /// The table whose DDL the unit propagates, or `None` for units that
    /// create dependencies rather than act on a table.
    pub fn target_table(&self) -> Option<TableId> {
        self.target_table
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn flags(&self) -> ExecutionFlags {
        self.flags
    }

    /// The per-node tasks, in the order of the membership snapshot the unit
    /// was planned against.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }
}

/// Wraps commands into propagation units.
#[derive(Debug, Clone, Copy)]
pub struct JobPlanner<'a> {
    membership: &'a dyn ClusterMembership,
}

impl<'a> JobPlanner<'a> {
    pub fn new(membership: &'a dyn ClusterMembership) -> Self {
        JobPlanner { membership }
    }

    /// Plans `command` for every worker node that is currently a member of
    /// the cluster. Nodes that join later do not receive the unit.
    pub fn plan(
        &self,
        target_table: Option<TableId>,
        command: String,
        flags: ExecutionFlags,
    ) -> PropagationUnit {
        let tasks = self
            .membership
            .current_worker_nodes()
            .into_iter()
            .map(|node| Task {
                node,
                command: command.clone(),
            })
            .collect();
        PropagationUnit {
            target_table,
            command,
            flags,
            tasks,
        }
    }

    /// Plans a command on an object of the given kind.
    pub fn plan_for_kind(
        &self,
        target_table: Option<TableId>,
        kind: ObjectKind,
        command: String,
    ) -> PropagationUnit {
        self.plan(target_table, command, kind.execution_flags())
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::StaticMembership;

    use super::*;

    #[test]
    fn units_snapshot_the_membership() {
        let membership = StaticMembership::default();
        membership.add(WorkerNode {
            id: NodeId(1),
            host: "w1".into(),
            port: 5432,
        });
        let planner = JobPlanner::new(&membership);
        let unit = planner.plan_for_kind(
            Some(TableId(4)),
            ObjectKind::Statistics,
            "DROP STATISTICS s.st".into(),
        );
        membership.add(WorkerNode {
            id: NodeId(2),
            host: "w2".into(),
            port: 5432,
        });

        assert_eq!(unit.target_table(), Some(TableId(4)));
        assert_eq!(unit.flags(), ExecutionFlags::default());
        assert_eq!(unit.tasks().len(), 1);
        assert_eq!(unit.tasks()[0].node().id, NodeId(1));
        assert_eq!(unit.tasks()[0].command(), "DROP STATISTICS s.st");
    }

    #[test]
    fn flags_are_carried_verbatim() {
        let membership = StaticMembership::default();
        let flags = ExecutionFlags {
            start_new_transaction: true,
            concurrent_index_cmd: true,
        };
        let unit = JobPlanner::new(&membership).plan(None, "CREATE SCHEMA s".into(), flags);
        assert_eq!(unit.flags(), flags);
        assert!(unit.tasks().is_empty());
        assert_eq!(
            flags.to_string(),
            "start_new_transaction=true, concurrent_index_cmd=true"
        );
    }

    #[test]
    fn units_serialize() {
        let membership = StaticMembership::default();
        membership.add(WorkerNode {
            id: NodeId(3),
            host: "w3".into(),
            port: 6432,
        });
        let unit = JobPlanner::new(&membership).plan_for_kind(
            None,
            ObjectKind::Schema,
            "CREATE SCHEMA IF NOT EXISTS s AUTHORIZATION a".into(),
        );
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json["tasks"][0]["node"]["port"], 6432);
        let back: PropagationUnit = serde_json::from_value(json).unwrap();
        assert_eq!(back, unit);
    }
}
