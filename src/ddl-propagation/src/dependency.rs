// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Creation of dependencies on worker nodes.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::catalog::PropagationCatalog;
use crate::error::PropagationError;
use crate::exec::{self, ExecutionEngine};
use crate::names::{ObjectAddress, ObjectType, QualifiedName};
use crate::plan::{JobPlanner, ObjectKind};
use crate::synthesize::CommandSynthesizer;
use crate::txn::DdlTransaction;

/// States that `dependent` cannot be created on a worker node unless
/// `required` exists there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub dependent: QualifiedName,
    pub required: ObjectAddress,
}

/// Makes sure the dependencies of an object exist on every worker node.
#[derive(Debug)]
pub struct DependencyPropagator<'a> {
    catalog: &'a dyn PropagationCatalog,
    synthesizer: CommandSynthesizer<'a>,
    planner: JobPlanner<'a>,
    engine: &'a dyn ExecutionEngine,
}

impl<'a> DependencyPropagator<'a> {
    pub fn new(
        catalog: &'a dyn PropagationCatalog,
        synthesizer: CommandSynthesizer<'a>,
        planner: JobPlanner<'a>,
        engine: &'a dyn ExecutionEngine,
    ) -> Self {
        DependencyPropagator {
            catalog,
            synthesizer,
            planner,
            engine,
        }
    }

    /// Creates every required object of `edges` on the worker nodes, unless
    /// it is already distributed.
    ///
    /// The created objects are recorded as distributed once `txn` commits.
    /// Calling this again for the same edges, in the same transaction or a
    /// later one, executes nothing.
    pub async fn ensure_dependencies(
        &self,
        txn: &mut DdlTransaction,
        edges: &[DependencyEdge],
    ) -> Result<(), PropagationError> {
        let mut required = BTreeSet::new();
        for edge in edges {
            let object = edge.required;
            if !required.insert(object) {
                continue;
            }
            if self.catalog.is_object_distributed(object) || txn.is_pending_distributed(object) {
                debug!(%object, dependent = %edge.dependent, "dependency already distributed");
                continue;
            }
            self.create(object).await?;
            txn.mark_distributed(object);
        }
        Ok(())
    }

    async fn create(&self, object: ObjectAddress) -> Result<(), PropagationError> {
        match object {
            ObjectAddress::Schema(id) => {
                let schema =
                    self.catalog
                        .schema_by_id(id)
                        .ok_or_else(|| PropagationError::ObjectNotFound {
                            kind: ObjectType::Schema,
                            name: id.to_string(),
                        })?;
                let owner = self.catalog.role_name(schema.owner).ok_or_else(|| {
                    PropagationError::ObjectNotFound {
                        kind: ObjectType::Role,
                        name: schema.owner.to_string(),
                    }
                })?;
                let command = self.synthesizer.create_schema(&schema.name, &owner);
                let unit = self.planner.plan_for_kind(None, ObjectKind::Schema, command);
                exec::execute_unit(self.engine, unit).await.map_err(|source| {
                    PropagationError::DependencyUnsatisfiable {
                        object: format!("schema \"{}\"", schema.name),
                        source,
                    }
                })?;
                info!(schema = %schema.name, "created schema on worker nodes");
                Ok(())
            }
        }
    }
}
