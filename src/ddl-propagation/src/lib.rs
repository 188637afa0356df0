// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Propagation of DDL on distributed tables.
//!
//! A distributed table exists on the coordinator and on every worker node.
//! When DDL changes one of the table's statistics objects on the
//! coordinator, the same change has to be applied on every worker. This
//! crate decides whether a statement must be propagated, synthesizes the
//! fully qualified command that reproduces it, makes sure the command's
//! dependencies exist on the workers and plans the command for execution
//! on every worker node. It also reconstructs the statistics objects of a
//! table that becomes distributed after they drifted from their defaults.
//!
//! The entry point is [`Propagator`]. The catalog, the cluster membership,
//! the execution engine and the deparser are collaborators behind traits;
//! [`memory`] provides in-process implementations of them.

pub mod catalog;
pub mod config;
pub mod dedup;
pub mod dependency;
pub mod eligibility;
pub mod error;
pub mod exec;
pub mod locks;
pub mod memory;
pub mod names;
pub mod plan;
pub mod propagator;
pub mod reconcile;
pub mod resolve;
pub mod session;
pub mod synthesize;
pub mod txn;

pub use crate::error::PropagationError;
pub use crate::exec::{execute_units, ExecutionEngine, ExecutionError};
pub use crate::plan::{ClusterMembership, PropagationUnit, Task, WorkerNode};
pub use crate::propagator::{Propagator, PropagatorConfig};
pub use crate::session::{CommandOrigin, NodeRole, SessionContext};
pub use crate::txn::DdlTransaction;
