// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! In-memory implementations of the collaborators of the propagation core.
//!
//! These are complete enough to run the core end to end in a single
//! process: [`MemoryCatalog`] applies statistics DDL the way the host
//! database would after the statement is planned, [`StaticMembership`]
//! holds a fixed but mutable set of workers and [`RecordingEngine`] records
//! what it was asked to execute instead of connecting to anything.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use mz_ddl_parser::ast::{AlterStatisticsAction, Statement};

use crate::catalog::{
    ObjectIdentity, ObjectState, PropagationCatalog, SchemaEntry, StatisticsDefinition,
    StatisticsObject, TableEntry,
};
use crate::error::PropagationError;
use crate::exec::{ExecutionEngine, ExecutionError, NodeOutcome, UnitOutcome};
use crate::names::{
    NodeId, ObjectAddress, ObjectType, QualifiedName, RoleId, SchemaId, StatisticsId, TableId,
};
use crate::plan::{ClusterMembership, PropagationUnit, WorkerNode};
use crate::resolve::ObjectResolver;
use crate::session::SessionContext;

/// Errors from applying a statement to a [`MemoryCatalog`].
#[derive(Debug, thiserror::Error)]
pub enum MemoryCatalogError {
    #[error(transparent)]
    Resolve(#[from] PropagationError),
    #[error("{kind} \"{name}\" already exists")]
    AlreadyExists { kind: ObjectType, name: String },
    #[error("statistics target {0} is too low")]
    TargetTooLow(i32),
}

/// A catalog that lives in memory.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

#[derive(Debug, Default)]
struct CatalogState {
    next_id: u32,
    roles: BTreeMap<RoleId, String>,
    schemas: BTreeMap<SchemaId, SchemaEntry>,
    tables: BTreeMap<TableId, TableEntry>,
    statistics: BTreeMap<StatisticsId, StatisticsObject>,
    distributed_tables: BTreeSet<TableId>,
    distributed_objects: BTreeSet<ObjectAddress>,
}

impl CatalogState {
    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn statistics_named(&self, schema: SchemaId, name: &str) -> Option<StatisticsId> {
        self.statistics
            .values()
            .find(|stats| stats.identity.schema == schema && stats.identity.name.item == name)
            .map(|stats| stats.identity.id)
    }
}

impl MemoryCatalog {
    fn state(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().expect("lock poisoned")
    }

    pub fn create_role(&self, name: &str) -> RoleId {
        let mut state = self.state();
        let id = RoleId(state.allocate_id());
        state.roles.insert(id, name.into());
        id
    }

    pub fn role_id(&self, name: &str) -> Option<RoleId> {
        self.state()
            .roles
            .iter()
            .find(|(_, role)| *role == name)
            .map(|(id, _)| *id)
    }

    pub fn create_schema(&self, name: &str, owner: RoleId) -> SchemaId {
        let mut state = self.state();
        let id = SchemaId(state.allocate_id());
        state.schemas.insert(
            id,
            SchemaEntry {
                id,
                name: name.into(),
                owner,
            },
        );
        id
    }

    /// Creates a table.
    ///
    /// Panics if `schema` does not exist.
    pub fn create_table(&self, schema: SchemaId, name: &str) -> TableId {
        let mut state = self.state();
        let schema_name = state.schemas[&schema].name.clone();
        let id = TableId(state.allocate_id());
        state.tables.insert(
            id,
            TableEntry {
                id,
                name: QualifiedName::new(schema_name, name),
                schema,
            },
        );
        id
    }

    /// Marks a table as distributed across the cluster.
    pub fn distribute_table(&self, table: TableId) {
        self.state().distributed_tables.insert(table);
    }

    /// Creates a statistics object the way the database does on its own,
    /// e.g. while building an index on an expression.
    ///
    /// Panics if `table` does not exist.
    pub fn create_implicit_statistics(
        &self,
        table: TableId,
        name: &str,
        owner: RoleId,
    ) -> StatisticsId {
        let mut state = self.state();
        let entry = state.tables[&table].clone();
        let id = StatisticsId(state.allocate_id());
        state.statistics.insert(
            id,
            StatisticsObject {
                identity: ObjectIdentity {
                    id,
                    name: QualifiedName::new(entry.name.schema, name),
                    schema: entry.schema,
                    table,
                    implicit: true,
                },
                state: ObjectState {
                    owner,
                    target: None,
                },
                definition: StatisticsDefinition {
                    kinds: vec![],
                    columns: vec![],
                },
            },
        );
        id
    }

    /// Applies `stmt` to the catalog on behalf of `session`.
    pub fn execute(
        &self,
        session: &SessionContext,
        stmt: &Statement,
    ) -> Result<(), MemoryCatalogError> {
        let resolver = ObjectResolver::new(self, session);
        match stmt {
            Statement::CreateStatistics(stmt) => {
                let table = resolver.resolve_table_name(&stmt.table)?;
                let schema = resolver.creation_schema(&stmt.name)?;
                let name = QualifiedName::new(schema.name, stmt.name.item().as_str());
                let mut state = self.state();
                if state.statistics_named(schema.id, &name.item).is_some() {
                    if stmt.if_not_exists {
                        return Ok(());
                    }
                    return Err(MemoryCatalogError::AlreadyExists {
                        kind: ObjectType::Statistics,
                        name: name.to_string(),
                    });
                }
                let id = StatisticsId(state.allocate_id());
                state.statistics.insert(
                    id,
                    StatisticsObject {
                        identity: ObjectIdentity {
                            id,
                            name,
                            schema: schema.id,
                            table: table.id,
                            implicit: false,
                        },
                        state: ObjectState {
                            owner: session.current_role,
                            target: None,
                        },
                        definition: StatisticsDefinition {
                            kinds: stmt.kinds.clone(),
                            columns: stmt.columns.iter().map(|c| c.as_str().into()).collect(),
                        },
                    },
                );
            }
            Statement::AlterStatistics(stmt) => {
                let Some(id) = resolver.resolve_statistics_name(&stmt.name, stmt.if_exists)?
                else {
                    return Ok(());
                };
                match &stmt.action {
                    AlterStatisticsAction::RenameTo(new_name) => {
                        let mut state = self.state();
                        let Some(current) = state.statistics.get(&id).map(|s| s.identity.clone())
                        else {
                            return Ok(());
                        };
                        let name = QualifiedName::new(current.name.schema, new_name.as_str());
                        if state.statistics_named(current.schema, &name.item).is_some() {
                            return Err(MemoryCatalogError::AlreadyExists {
                                kind: ObjectType::Statistics,
                                name: name.to_string(),
                            });
                        }
                        if let Some(stats) = state.statistics.get_mut(&id) {
                            stats.identity.name = name;
                        }
                    }
                    AlterStatisticsAction::SetSchema(schema) => {
                        let schema = self.schema_by_name(schema.as_str()).ok_or_else(|| {
                            PropagationError::ObjectNotFound {
                                kind: ObjectType::Schema,
                                name: schema.as_str().into(),
                            }
                        })?;
                        let mut state = self.state();
                        let Some(current) = state.statistics.get(&id).map(|s| s.identity.clone())
                        else {
                            return Ok(());
                        };
                        let name = QualifiedName::new(schema.name, current.name.item);
                        if state.statistics_named(schema.id, &name.item).is_some() {
                            return Err(MemoryCatalogError::AlreadyExists {
                                kind: ObjectType::Statistics,
                                name: name.to_string(),
                            });
                        }
                        if let Some(stats) = state.statistics.get_mut(&id) {
                            stats.identity.schema = schema.id;
                            stats.identity.name = name;
                        }
                    }
                    AlterStatisticsAction::OwnerTo(role) => {
                        let owner = self.role_id(role.as_str()).ok_or_else(|| {
                            PropagationError::ObjectNotFound {
                                kind: ObjectType::Role,
                                name: role.as_str().into(),
                            }
                        })?;
                        if let Some(stats) = self.state().statistics.get_mut(&id) {
                            stats.state.owner = owner;
                        }
                    }
                    AlterStatisticsAction::SetStatistics(target) => {
                        let target = match *target {
                            -1 => None,
                            t if t < -1 => return Err(MemoryCatalogError::TargetTooLow(t)),
                            t => Some(t),
                        };
                        if let Some(stats) = self.state().statistics.get_mut(&id) {
                            stats.state.target = target;
                        }
                    }
                }
            }
            Statement::DropStatistics(stmt) => {
                let mut ids = BTreeSet::new();
                for name in &stmt.names {
                    ids.extend(resolver.resolve_statistics_name(name, stmt.if_exists)?);
                }
                let mut state = self.state();
                for id in ids {
                    state.statistics.remove(&id);
                }
            }
            Statement::CreateSchema(stmt) => {
                let owner = match &stmt.authorization {
                    Some(role) => self.role_id(role.as_str()).ok_or_else(|| {
                        PropagationError::ObjectNotFound {
                            kind: ObjectType::Role,
                            name: role.as_str().into(),
                        }
                    })?,
                    None => session.current_role,
                };
                if self.schema_by_name(stmt.name.as_str()).is_some() {
                    if stmt.if_not_exists {
                        return Ok(());
                    }
                    return Err(MemoryCatalogError::AlreadyExists {
                        kind: ObjectType::Schema,
                        name: stmt.name.as_str().into(),
                    });
                }
                self.create_schema(stmt.name.as_str(), owner);
            }
        }
        Ok(())
    }
}

impl PropagationCatalog for MemoryCatalog {
    fn schema_by_name(&self, name: &str) -> Option<SchemaEntry> {
        self.state()
            .schemas
            .values()
            .find(|schema| schema.name == name)
            .cloned()
    }

    fn schema_by_id(&self, id: SchemaId) -> Option<SchemaEntry> {
        self.state().schemas.get(&id).cloned()
    }

    fn role_name(&self, id: RoleId) -> Option<String> {
        self.state().roles.get(&id).cloned()
    }

    fn table_by_name(&self, schema: SchemaId, name: &str) -> Option<TableEntry> {
        self.state()
            .tables
            .values()
            .find(|table| table.schema == schema && table.name.item == name)
            .cloned()
    }

    fn table_by_id(&self, id: TableId) -> Option<TableEntry> {
        self.state().tables.get(&id).cloned()
    }

    fn statistics_by_name(&self, schema: SchemaId, name: &str) -> Option<StatisticsId> {
        self.state().statistics_named(schema, name)
    }

    fn statistics_by_id(&self, id: StatisticsId) -> Option<StatisticsObject> {
        self.state().statistics.get(&id).cloned()
    }

    fn list_statistics_by_table(&self, table: TableId) -> Vec<ObjectIdentity> {
        self.state()
            .statistics
            .values()
            .filter(|stats| stats.identity.table == table)
            .map(|stats| stats.identity.clone())
            .collect()
    }

    fn is_distributed_table(&self, table: TableId) -> bool {
        self.state().distributed_tables.contains(&table)
    }

    fn is_object_distributed(&self, object: ObjectAddress) -> bool {
        self.state().distributed_objects.contains(&object)
    }

    fn mark_object_distributed(&self, object: ObjectAddress) {
        self.state().distributed_objects.insert(object);
    }
}

/// A cluster whose members change only when told to.
#[derive(Debug, Default)]
pub struct StaticMembership {
    nodes: Mutex<Vec<WorkerNode>>,
}

impl StaticMembership {
    pub fn add(&self, node: WorkerNode) {
        self.nodes.lock().expect("lock poisoned").push(node);
    }

    pub fn remove(&self, id: NodeId) {
        self.nodes
            .lock()
            .expect("lock poisoned")
            .retain(|node| node.id != id);
    }
}

impl ClusterMembership for StaticMembership {
    fn current_worker_nodes(&self) -> Vec<WorkerNode> {
        self.nodes.lock().expect("lock poisoned").clone()
    }
}

/// An execution engine that records the tasks it executes.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    executed: Mutex<Vec<(NodeId, String)>>,
    failures: Mutex<BTreeMap<NodeId, String>>,
}

impl RecordingEngine {
    /// Makes every later task on `node` fail with `message`.
    pub fn fail_on(&self, node: NodeId, message: &str) {
        self.failures
            .lock()
            .expect("lock poisoned")
            .insert(node, message.into());
    }

    pub fn clear_failures(&self) {
        self.failures.lock().expect("lock poisoned").clear();
    }

    /// The tasks that executed successfully, in execution order.
    pub fn executed(&self) -> Vec<(NodeId, String)> {
        self.executed.lock().expect("lock poisoned").clone()
    }

    pub fn commands_on(&self, node: NodeId) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|(n, _)| *n == node)
            .map(|(_, command)| command)
            .collect()
    }
}

#[async_trait]
impl ExecutionEngine for RecordingEngine {
    async fn execute(&self, unit: PropagationUnit) -> Result<UnitOutcome, ExecutionError> {
        let failures = self.failures.lock().expect("lock poisoned").clone();
        let mut executed = self.executed.lock().expect("lock poisoned");
        let nodes = unit
            .tasks()
            .iter()
            .map(|task| {
                let node = task.node().id;
                let result = match failures.get(&node) {
                    Some(message) => Err(message.clone()),
                    None => {
                        executed.push((node, task.command().into()));
                        Ok(())
                    }
                };
                NodeOutcome { node, result }
            })
            .collect();
        Ok(UnitOutcome { nodes })
    }
}

#[cfg(test)]
mod tests {
    use mz_ddl_parser::parser::parse_statement;

    use crate::config::{all_propagation_configs, ConfigSet};
    use crate::session::NodeRole;

    use super::*;

    fn exec(catalog: &MemoryCatalog, session: &SessionContext, sql: &str) {
        catalog
            .execute(session, &parse_statement(sql).unwrap())
            .unwrap();
    }

    #[test]
    fn statistics_lifecycle() {
        let catalog = MemoryCatalog::default();
        let postgres = catalog.create_role("postgres");
        let alice = catalog.create_role("alice");
        let s1 = catalog.create_schema("s1", postgres);
        let table = catalog.create_table(s1, "t");
        let session = SessionContext::new(
            &all_propagation_configs(ConfigSet::default()),
            NodeRole::Coordinator,
            postgres,
        )
        .with_search_path(["s1"]);

        exec(&catalog, &session, "CREATE SCHEMA s2");
        exec(&catalog, &session, "CREATE STATISTICS st (ndistinct) ON a, b FROM t");
        exec(&catalog, &session, "CREATE STATISTICS IF NOT EXISTS st ON a FROM t");
        let id = catalog.statistics_by_name(s1, "st").unwrap();

        exec(&catalog, &session, "ALTER STATISTICS st RENAME TO st2");
        exec(&catalog, &session, "ALTER STATISTICS st2 SET SCHEMA s2");
        exec(&catalog, &session, "ALTER STATISTICS s2.st2 OWNER TO alice");
        exec(&catalog, &session, "ALTER STATISTICS s2.st2 SET STATISTICS 7");

        let stats = catalog.statistics_by_id(id).unwrap();
        assert_eq!(stats.identity.name, QualifiedName::new("s2", "st2"));
        assert_eq!(stats.identity.table, table);
        assert_eq!(stats.state.owner, alice);
        assert_eq!(stats.state.target, Some(7));
        assert_eq!(
            stats.definition.kinds,
            vec![mz_ddl_parser::ast::StatisticsKind::Ndistinct]
        );

        exec(&catalog, &session, "ALTER STATISTICS s2.st2 SET STATISTICS -1");
        assert_eq!(catalog.statistics_by_id(id).unwrap().state.target, None);

        exec(&catalog, &session, "DROP STATISTICS s2.st2, s2.st2");
        assert!(catalog.statistics_by_id(id).is_none());
        exec(&catalog, &session, "DROP STATISTICS IF EXISTS s2.st2");
        let err = catalog
            .execute(&session, &parse_statement("DROP STATISTICS s2.st2").unwrap())
            .unwrap_err();
        assert_eq!(err.to_string(), "statistics object \"s2.st2\" does not exist");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let catalog = MemoryCatalog::default();
        let postgres = catalog.create_role("postgres");
        let s1 = catalog.create_schema("public", postgres);
        catalog.create_table(s1, "t");
        let session = SessionContext::new(
            &all_propagation_configs(ConfigSet::default()),
            NodeRole::Coordinator,
            postgres,
        );
        exec(&catalog, &session, "CREATE STATISTICS a ON x FROM t");
        exec(&catalog, &session, "CREATE STATISTICS b ON x FROM t");
        let err = catalog
            .execute(
                &session,
                &parse_statement("ALTER STATISTICS a RENAME TO b").unwrap(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "statistics object \"public.b\" already exists");
        let err = catalog
            .execute(
                &session,
                &parse_statement("ALTER STATISTICS a SET STATISTICS -5").unwrap(),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "statistics target -5 is too low");
    }
}
