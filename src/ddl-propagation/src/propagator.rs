// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Orchestration of DDL propagation.

use std::collections::BTreeSet;
use std::sync::Arc;

use mz_ddl_parser::ast::display::AstDisplay;
use mz_ddl_parser::ast::{
    AlterStatisticsAction, AlterStatisticsStatement, CreateStatisticsStatement, DropStatisticsStatement, Statement,
    UnresolvedItemName,
};
use tracing::{debug, instrument};

use crate::catalog::{PropagationCatalog, StatisticsObject, TableEntry};
use crate::config::{ConfigSet, DDL_LOCK_REVALIDATION_ATTEMPTS, ENABLE_ALTER_STATISTICS_TARGET};
use crate::dedup::ProcessedSet;
use crate::dependency::{DependencyEdge, DependencyPropagator};
use crate::eligibility::{classify, ensure_coordinator, Eligibility};
use crate::error::PropagationError;
use crate::exec::ExecutionEngine;
use crate::locks::TableLocks;
use crate::names::{ObjectAddress, ObjectType, QualifiedName, SchemaId, StatisticsId, TableId};
use crate::plan::{ClusterMembership, JobPlanner, ObjectKind, PropagationUnit};
use crate::reconcile::DriftSynthesizer;
use crate::resolve::ObjectResolver;
use crate::session::SessionContext;
use crate::synthesize::{AstDeparser, Capabilities, CommandSynthesizer, Deparser};
use crate::txn::DdlTransaction;

/// Settings of a [`Propagator`], fixed when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagatorConfig {
    pub capabilities: Capabilities,
    /// How many times a statement re-resolves a name whose object changed
    /// while it waited for the table lock.
    pub lock_revalidation_attempts: u32,
}

impl PropagatorConfig {
    /// Reads the current values of the propagation configs.
    pub fn from_config_set(configs: &ConfigSet) -> PropagatorConfig {
        PropagatorConfig {
            capabilities: Capabilities {
                alter_statistics_target: ENABLE_ALTER_STATISTICS_TARGET.get(configs),
            },
            lock_revalidation_attempts: DDL_LOCK_REVALIDATION_ATTEMPTS.get(configs),
        }
    }
}

impl Default for PropagatorConfig {
    fn default() -> Self {
        PropagatorConfig {
            capabilities: Capabilities::default(),
            lock_revalidation_attempts: *DDL_LOCK_REVALIDATION_ATTEMPTS.default(),
        }
    }
}

/// Plans the propagation of DDL on statistics objects from the coordinator
/// to the worker nodes.
///
/// Each entry point runs within a [`DdlTransaction`] and returns the units
/// to hand to the execution engine, in execution order. Creating the
/// dependencies of new objects happens as a side effect of planning. The
/// table locks the entry points take are held by the transaction.
#[derive(Debug, Clone)]
pub struct Propagator {
    catalog: Arc<dyn PropagationCatalog>,
    membership: Arc<dyn ClusterMembership>,
    engine: Arc<dyn ExecutionEngine>,
    deparser: Arc<dyn Deparser>,
    locks: TableLocks,
    config: PropagatorConfig,
}

impl Propagator {
    pub fn new(
        catalog: Arc<dyn PropagationCatalog>,
        membership: Arc<dyn ClusterMembership>,
        engine: Arc<dyn ExecutionEngine>,
        config: PropagatorConfig,
    ) -> Propagator {
        Propagator {
            catalog,
            membership,
            engine,
            deparser: Arc::new(AstDeparser),
            locks: TableLocks::default(),
            config,
        }
    }

    /// Replaces the deparser commands are rendered with.
    pub fn with_deparser(mut self, deparser: Arc<dyn Deparser>) -> Propagator {
        self.deparser = deparser;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn PropagationCatalog> {
        &self.catalog
    }

    pub fn engine(&self) -> &Arc<dyn ExecutionEngine> {
        &self.engine
    }

    pub fn locks(&self) -> &TableLocks {
        &self.locks
    }

    /// Plans the propagation of `stmt`, which the session of `txn` is about
    /// to execute locally.
    ///
    /// Returns no units if the statement does not affect a distributed table
    /// or the session does not propagate DDL.
    #[instrument(level = "debug", skip_all, fields(kind = stmt.kind()))]
    pub async fn plan_for_event(
        &self,
        txn: &mut DdlTransaction,
        stmt: &Statement,
    ) -> Result<Vec<PropagationUnit>, PropagationError> {
        match stmt {
            Statement::CreateStatistics(stmt) => self.plan_create(txn, stmt).await,
            Statement::AlterStatistics(stmt) => self.plan_alter(txn, stmt).await,
            Statement::DropStatistics(stmt) => self.plan_drop(txn, stmt).await,
            Statement::CreateSchema(_) => {
                debug!("schemas are propagated only as dependencies");
                Ok(vec![])
            }
        }
    }

    /// Plans the commands that correct the attributes of the statistics
    /// objects on `table`, which is being distributed.
    ///
    /// Only the corrections are returned. The objects themselves are created
    /// by the distribution workflow, ahead of these units.
    #[instrument(level = "debug", skip_all, fields(%table))]
    pub async fn reconcile_on_distribution(
        &self,
        txn: &mut DdlTransaction,
        table: TableId,
    ) -> Result<Vec<PropagationUnit>, PropagationError> {
        let session = txn.session().clone();
        ensure_coordinator(&session)?;
        self.lock_table(txn, table).await;
        let commands = self.drift(&session).corrective_commands(table)?;
        Ok(self.plan_statistics_commands(table, commands))
    }

    /// Returns the commands that recreate the statistics objects on `table`
    /// on another node: every creation, then every correction.
    pub async fn statistics_creation_commands(
        &self,
        txn: &mut DdlTransaction,
        table: TableId,
    ) -> Result<Vec<String>, PropagationError> {
        let session = txn.session().clone();
        let entry = self.table_by_id(table)?;
        self.lock_table(txn, table).await;
        self.drift(&session).creation_commands(&entry)
    }

    /// Returns the schemas of the statistics objects on `table`.
    pub fn explicit_statistics_schemas(&self, txn: &DdlTransaction, table: TableId) -> Vec<SchemaId> {
        self.drift(txn.session()).explicit_statistics_schemas(table)
    }

    /// Plans the creation of the statistics objects on `table` for a table
    /// that is being distributed, creating their schemas on the worker
    /// nodes first.
    #[instrument(level = "debug", skip_all, fields(%table))]
    pub async fn plan_table_distribution(
        &self,
        txn: &mut DdlTransaction,
        table: TableId,
    ) -> Result<Vec<PropagationUnit>, PropagationError> {
        let session = txn.session().clone();
        ensure_coordinator(&session)?;
        let entry = self.table_by_id(table)?;
        self.lock_table(txn, table).await;
        let edges: Vec<_> = self
            .explicit_statistics_schemas(txn, table)
            .into_iter()
            .map(|schema| DependencyEdge {
                dependent: entry.name.clone(),
                required: ObjectAddress::Schema(schema),
            })
            .collect();
        self.dependencies().ensure_dependencies(txn, &edges).await?;
        let commands = self.drift(&session).creation_commands(&entry)?;
        Ok(self.plan_statistics_commands(table, commands))
    }

    async fn plan_create(
        &self,
        txn: &mut DdlTransaction,
        stmt: &CreateStatisticsStatement,
    ) -> Result<Vec<PropagationUnit>, PropagationError> {
        let table = self.lock_table_by_name(txn, &stmt.table).await?;
        let session = txn.session().clone();
        if let Eligibility::Skip(reason) = classify(&session, &*self.catalog, table.id) {
            debug!(%reason, table = %table.name, "not propagating");
            return Ok(vec![]);
        }
        ensure_coordinator(&session)?;

        let schema = ObjectResolver::new(&*self.catalog, &session).creation_schema(&stmt.name)?;
        let command = self.synthesizer().create_statistics(stmt, &schema, &table);
        let edges = [DependencyEdge {
            dependent: QualifiedName::new(&schema.name, stmt.name.item().as_str()),
            required: ObjectAddress::Schema(schema.id),
        }];
        self.dependencies().ensure_dependencies(txn, &edges).await?;

        Ok(vec![self.planner().plan_for_kind(
            Some(table.id),
            ObjectKind::Statistics,
            command,
        )])
    }

    async fn plan_alter(
        &self,
        txn: &mut DdlTransaction,
        stmt: &AlterStatisticsStatement,
    ) -> Result<Vec<PropagationUnit>, PropagationError> {
        let Some(stats) = self
            .lock_statistics_by_name(txn, &stmt.name, stmt.if_exists)
            .await?
        else {
            debug!(name = %stmt.name, "statistics object does not exist, skipping");
            return Ok(vec![]);
        };
        let session = txn.session().clone();
        let table = stats.identity.table;
        if let Eligibility::Skip(reason) = classify(&session, &*self.catalog, table) {
            debug!(%reason, %table, "not propagating");
            return Ok(vec![]);
        }
        ensure_coordinator(&session)?;

        let command = self.synthesizer().alter_statistics(stmt, &stats.identity)?;
        if let AlterStatisticsAction::SetSchema(schema) = &stmt.action {
            let schema = self.catalog.schema_by_name(schema.as_str()).ok_or_else(|| {
                PropagationError::ObjectNotFound {
                    kind: ObjectType::Schema,
                    name: schema.as_str().into(),
                }
            })?;
            let edges = [DependencyEdge {
                dependent: QualifiedName::new(&schema.name, &stats.identity.name.item),
                required: ObjectAddress::Schema(schema.id),
            }];
            self.dependencies().ensure_dependencies(txn, &edges).await?;
        }
        Ok(vec![self.planner().plan_for_kind(
            Some(table),
            ObjectKind::Statistics,
            command,
        )])
    }

    async fn plan_drop(
        &self,
        txn: &mut DdlTransaction,
        stmt: &DropStatisticsStatement,
    ) -> Result<Vec<PropagationUnit>, PropagationError> {
        let session = txn.session().clone();
        if !session.should_propagate() {
            return Ok(vec![]);
        }
        let resolver = ObjectResolver::new(&*self.catalog, &session);

        let mut resolved = resolve_drop_names(&resolver, stmt)?;
        for _ in 0..self.config.lock_revalidation_attempts.max(1) {
            // Lock in ID order, so that concurrent drops of overlapping sets
            // of objects cannot deadlock.
            let tables: BTreeSet<_> = resolved
                .iter()
                .flatten()
                .filter_map(|id| resolver.owning_table(*id))
                .collect();
            for table in tables {
                self.lock_table(txn, table).await;
            }

            let current = resolve_drop_names(&resolver, stmt)?;
            let changed = resolved
                .iter()
                .zip(&current)
                .zip(&stmt.names)
                .find(|((before, now), _)| match (before, now) {
                    (_, None) => false,
                    (Some(before), Some(now)) => before != now,
                    (None, Some(_)) => true,
                });
            match changed {
                None => return self.plan_drop_units(&session, stmt, &current),
                Some((_, name)) => {
                    debug!(%name, "statistics object changed while waiting for its lock, retrying");
                }
            }
            resolved = current;
        }
        Err(PropagationError::ConcurrentDdl {
            kind: ObjectType::Statistics,
            name: stmt
                .names
                .iter()
                .map(|name| name.to_ast_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Plans one drop unit per distinct object of `stmt`, in the order the
    /// objects are named. `resolved` holds the object each name resolved to
    /// under the table locks.
    fn plan_drop_units(
        &self,
        session: &SessionContext,
        stmt: &DropStatisticsStatement,
        resolved: &[Option<StatisticsId>],
    ) -> Result<Vec<PropagationUnit>, PropagationError> {
        let resolver = ObjectResolver::new(&*self.catalog, session);
        let mut processed = ProcessedSet::default();
        let mut units = vec![];
        for (name, id) in stmt.names.iter().zip(resolved) {
            let Some(id) = *id else {
                debug!(%name, "statistics object does not exist, skipping");
                continue;
            };
            if !processed.first_visit(id) {
                continue;
            }
            let Some(stats) = resolver.statistics_by_id(id) else {
                if stmt.if_exists {
                    debug!(%name, "statistics object dropped concurrently, skipping");
                    continue;
                }
                return Err(PropagationError::ObjectNotFound {
                    kind: ObjectType::Statistics,
                    name: name.to_ast_string(),
                });
            };
            let table = stats.identity.table;
            if let Eligibility::Skip(reason) = classify(session, &*self.catalog, table) {
                debug!(%reason, %table, %name, "not propagating");
                continue;
            }
            ensure_coordinator(session)?;
            let command =
                self.synthesizer()
                    .drop_statistics(&stats.identity, stmt.if_exists, stmt.cascade);
            units.push(
                self.planner()
                    .plan_for_kind(Some(table), ObjectKind::Statistics, command),
            );
        }
        Ok(units)
    }

    /// Resolves a table name and locks the table. The name is resolved again
    /// once the lock is held and the process repeats if it now names another
    /// table.
    async fn lock_table_by_name(
        &self,
        txn: &mut DdlTransaction,
        name: &UnresolvedItemName,
    ) -> Result<TableEntry, PropagationError> {
        let session = txn.session().clone();
        let resolver = ObjectResolver::new(&*self.catalog, &session);
        let mut table = resolver.resolve_table_name(name)?;
        for _ in 0..self.config.lock_revalidation_attempts.max(1) {
            let guard = match txn.holds_lock(table.id) {
                true => None,
                false => Some(self.locks.lock_share_update_exclusive(table.id).await),
            };
            let current = resolver.resolve_table_name(name)?;
            if current.id == table.id {
                if let Some(guard) = guard {
                    txn.add_lock(guard);
                }
                return Ok(current);
            }
            debug!(%name, "table changed while waiting for its lock, retrying");
            table = current;
        }
        Err(PropagationError::ConcurrentDdl {
            kind: ObjectType::Table,
            name: name.to_ast_string(),
        })
    }

    /// Resolves the name of a statistics object and locks its table. The
    /// name is resolved again once the lock is held and the process repeats
    /// if it now names another object.
    async fn lock_statistics_by_name(
        &self,
        txn: &mut DdlTransaction,
        name: &UnresolvedItemName,
        missing_ok: bool,
    ) -> Result<Option<StatisticsObject>, PropagationError> {
        let session = txn.session().clone();
        let resolver = ObjectResolver::new(&*self.catalog, &session);
        for _ in 0..self.config.lock_revalidation_attempts.max(1) {
            let Some(id) = resolver.resolve_statistics_name(name, missing_ok)? else {
                return Ok(None);
            };
            let Some(stats) = resolver.statistics_by_id(id) else {
                continue;
            };
            let table = stats.identity.table;
            let guard = match txn.holds_lock(table) {
                true => None,
                false => Some(self.locks.lock_share_update_exclusive(table).await),
            };
            match resolver.resolve_statistics_name(name, missing_ok)? {
                Some(current) if current == id => {
                    if let Some(stats) = resolver.statistics_by_id(id) {
                        if let Some(guard) = guard {
                            txn.add_lock(guard);
                        }
                        return Ok(Some(stats));
                    }
                }
                None => return Ok(None),
                Some(_) => {}
            }
            debug!(%name, "statistics object changed while waiting for its lock, retrying");
        }
        Err(PropagationError::ConcurrentDdl {
            kind: ObjectType::Statistics,
            name: name.to_ast_string(),
        })
    }

    async fn lock_table(&self, txn: &mut DdlTransaction, table: TableId) {
        if !txn.holds_lock(table) {
            let guard = self.locks.lock_share_update_exclusive(table).await;
            txn.add_lock(guard);
        }
    }

    fn table_by_id(&self, table: TableId) -> Result<TableEntry, PropagationError> {
        self.catalog
            .table_by_id(table)
            .ok_or_else(|| PropagationError::ObjectNotFound {
                kind: ObjectType::Table,
                name: table.to_string(),
            })
    }

    fn plan_statistics_commands(
        &self,
        table: TableId,
        commands: Vec<String>,
    ) -> Vec<PropagationUnit> {
        let planner = self.planner();
        commands
            .into_iter()
            .map(|command| planner.plan_for_kind(Some(table), ObjectKind::Statistics, command))
            .collect()
    }

    fn synthesizer(&self) -> CommandSynthesizer<'_> {
        CommandSynthesizer::new(&*self.deparser, self.config.capabilities)
    }

    fn planner(&self) -> JobPlanner<'_> {
        JobPlanner::new(&*self.membership)
    }

    fn drift<'a>(&'a self, session: &'a SessionContext) -> DriftSynthesizer<'a> {
        DriftSynthesizer::new(&*self.catalog, session, self.synthesizer())
    }

    fn dependencies(&self) -> DependencyPropagator<'_> {
        DependencyPropagator::new(
            &*self.catalog,
            self.synthesizer(),
            self.planner(),
            &*self.engine,
        )
    }
}

/// Resolves every name a drop statement lists. Names of missing objects
/// resolve to `None` under `IF EXISTS`.
fn resolve_drop_names(
    resolver: &ObjectResolver<'_>,
    stmt: &DropStatisticsStatement,
) -> Result<Vec<Option<StatisticsId>>, PropagationError> {
    stmt.names
        .iter()
        .map(|name| resolver.resolve_statistics_name(name, stmt.if_exists))
        .collect()
}
