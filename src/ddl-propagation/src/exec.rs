// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The seam to the execution engine.

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PropagationError;
use crate::names::NodeId;
use crate::plan::PropagationUnit;

/// A failure reported by the execution engine.
///
/// The message is the one reported by the failing node, unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ExecutionError {
    /// The node that failed, if the failure is attributable to one.
    pub node: Option<NodeId>,
    pub message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> ExecutionError {
        ExecutionError {
            node: None,
            message: message.into(),
        }
    }

    pub fn on_node(node: NodeId, message: impl Into<String>) -> ExecutionError {
        ExecutionError {
            node: Some(node),
            message: message.into(),
        }
    }
}

/// The outcome of a unit's task on one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub node: NodeId,
    pub result: Result<(), String>,
}

/// The per-node outcomes of executing a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOutcome {
    pub nodes: Vec<NodeOutcome>,
}

impl UnitOutcome {
    /// Collapses the per-node outcomes into the unit's outcome. A unit fails
    /// if any of its nodes failed.
    pub fn into_result(self) -> Result<(), ExecutionError> {
        match self.nodes.into_iter().find(|outcome| outcome.result.is_err()) {
            Some(NodeOutcome {
                node,
                result: Err(message),
            }) => Err(ExecutionError::on_node(node, message)),
            _ => Ok(()),
        }
    }
}

/// Runs propagation units on worker nodes.
///
/// An implementation runs all of a unit's tasks within the distributed
/// transaction of the statement that planned it, so that aborting the
/// statement rolls back the unit's effects on every node.
#[async_trait]
pub trait ExecutionEngine: Debug + Send + Sync {
    async fn execute(&self, unit: PropagationUnit) -> Result<UnitOutcome, ExecutionError>;
}

/// Executes a single unit, failing if any of its nodes failed.
pub async fn execute_unit(
    engine: &dyn ExecutionEngine,
    unit: PropagationUnit,
) -> Result<(), ExecutionError> {
    debug!(command = unit.command(), tasks = unit.tasks().len(), "executing unit");
    engine.execute(unit).await?.into_result()
}

/// Executes units in order, stopping at the first unit that fails.
pub async fn execute_units(
    engine: &dyn ExecutionEngine,
    units: Vec<PropagationUnit>,
) -> Result<(), PropagationError> {
    for unit in units {
        execute_unit(engine, unit).await?;
    }
    Ok(())
}
