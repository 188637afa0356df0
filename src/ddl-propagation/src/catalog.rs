// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Catalog abstraction.
//!
//! The propagation core reads the catalog exclusively through
//! [`PropagationCatalog`], a key-value interface of point lookups. The only
//! scan it exposes, [`PropagationCatalog::list_statistics_by_table`], is
//! used when a table becomes distributed.
//!
//! Everything returned by the catalog is an owned snapshot. Snapshots go
//! stale as soon as a concurrent transaction commits, which is acceptable
//! because every caller holds the owning table's lock while it reads them.

use std::fmt::Debug;

use mz_ddl_parser::ast::StatisticsKind;
use serde::{Deserialize, Serialize};

use crate::names::{ObjectAddress, QualifiedName, RoleId, SchemaId, StatisticsId, TableId};

/// The identity of a statistics object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectIdentity {
    pub id: StatisticsId,
    pub name: QualifiedName,
    pub schema: SchemaId,
    /// The table the statistics are computed on.
    pub table: TableId,
    /// Whether the database created the object on its own, rather than a
    /// user with `CREATE STATISTICS`.
    pub implicit: bool,
}

/// The mutable attributes of a statistics object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectState {
    pub owner: RoleId,
    /// The statistics target. `None` means the default target.
    pub target: Option<i32>,
}

/// What a statistics object computes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsDefinition {
    /// The computed kinds. Empty means all kinds.
    pub kinds: Vec<StatisticsKind>,
    pub columns: Vec<String>,
}

/// A statistics object, as of the moment it was read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsObject {
    pub identity: ObjectIdentity,
    pub state: ObjectState,
    pub definition: StatisticsDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub id: TableId,
    pub name: QualifiedName,
    pub schema: SchemaId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub id: SchemaId,
    pub name: String,
    pub owner: RoleId,
}

/// A catalog, as seen by the DDL propagation core.
pub trait PropagationCatalog: Debug + Send + Sync {
    /// Finds a schema by name.
    fn schema_by_name(&self, name: &str) -> Option<SchemaEntry>;

    /// Finds a schema by ID.
    fn schema_by_id(&self, id: SchemaId) -> Option<SchemaEntry>;

    /// Returns the name of a role.
    fn role_name(&self, id: RoleId) -> Option<String>;

    /// Finds a table by name within a schema.
    fn table_by_name(&self, schema: SchemaId, name: &str) -> Option<TableEntry>;

    fn table_by_id(&self, id: TableId) -> Option<TableEntry>;

    /// Finds the ID of a statistics object by name within a schema.
    fn statistics_by_name(&self, schema: SchemaId, name: &str) -> Option<StatisticsId>;

    /// Returns the current identity, state and definition of a statistics
    /// object.
    fn statistics_by_id(&self, id: StatisticsId) -> Option<StatisticsObject>;

    /// Lists the statistics objects on a table, in ID order.
    fn list_statistics_by_table(&self, table: TableId) -> Vec<ObjectIdentity>;

    /// Reports whether the table is distributed across the cluster.
    fn is_distributed_table(&self, table: TableId) -> bool;

    /// Reports whether the object is known to exist on every worker node.
    fn is_object_distributed(&self, object: ObjectAddress) -> bool;

    /// Records that the object exists on every worker node.
    fn mark_object_distributed(&self, object: ObjectAddress);
}
