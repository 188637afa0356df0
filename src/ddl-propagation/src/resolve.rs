// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Name and ID resolution.
//!
//! A statement names objects by path. Those paths are resolved to stable IDs
//! once, and everything afterwards, including command synthesis, works from
//! the IDs. A rename or schema move therefore never confuses the core about
//! which object it is looking at.

use mz_ddl_parser::ast::display::AstDisplay;
use mz_ddl_parser::ast::UnresolvedItemName;

use crate::catalog::{PropagationCatalog, SchemaEntry, StatisticsObject, TableEntry};
use crate::error::PropagationError;
use crate::names::{ObjectType, RoleId, StatisticsId, TableId};
use crate::session::SessionContext;

/// Resolves names against the catalog on behalf of one session.
#[derive(Debug, Clone, Copy)]
pub struct ObjectResolver<'a> {
    catalog: &'a dyn PropagationCatalog,
    session: &'a SessionContext,
}

impl<'a> ObjectResolver<'a> {
    pub fn new(catalog: &'a dyn PropagationCatalog, session: &'a SessionContext) -> Self {
        ObjectResolver { catalog, session }
    }

    /// Resolves the name of a statistics object to its ID.
    ///
    /// Unqualified names are looked up in each schema of the search path in
    /// turn. If nothing is found, returns `Ok(None)` when `missing_ok` is set
    /// and [`PropagationError::ObjectNotFound`] otherwise.
    pub fn resolve_statistics_name(
        &self,
        name: &UnresolvedItemName,
        missing_ok: bool,
    ) -> Result<Option<StatisticsId>, PropagationError> {
        let item = name.item().as_str();
        let found = match name.schema() {
            Some(schema) => match self.catalog.schema_by_name(schema.as_str()) {
                Some(schema) => self.catalog.statistics_by_name(schema.id, item),
                None if missing_ok => None,
                None => {
                    return Err(PropagationError::ObjectNotFound {
                        kind: ObjectType::Schema,
                        name: schema.as_str().into(),
                    })
                }
            },
            None => self
                .search_path()
                .find_map(|schema| self.catalog.statistics_by_name(schema.id, item)),
        };
        match found {
            Some(id) => Ok(Some(id)),
            None if missing_ok => Ok(None),
            None => Err(PropagationError::ObjectNotFound {
                kind: ObjectType::Statistics,
                name: name.to_ast_string(),
            }),
        }
    }

    /// Resolves the name of a table.
    pub fn resolve_table_name(
        &self,
        name: &UnresolvedItemName,
    ) -> Result<TableEntry, PropagationError> {
        let item = name.item().as_str();
        let found = match name.schema() {
            Some(schema) => {
                let schema = self.schema(schema.as_str())?;
                self.catalog.table_by_name(schema.id, item)
            }
            None => self
                .search_path()
                .find_map(|schema| self.catalog.table_by_name(schema.id, item)),
        };
        found.ok_or_else(|| PropagationError::ObjectNotFound {
            kind: ObjectType::Table,
            name: name.to_ast_string(),
        })
    }

    /// Determines the schema a new object called `name` is created in: the
    /// schema it is qualified with, or else the first schema on the search
    /// path that exists.
    pub fn creation_schema(
        &self,
        name: &UnresolvedItemName,
    ) -> Result<SchemaEntry, PropagationError> {
        match name.schema() {
            Some(schema) => self.schema(schema.as_str()),
            None => self
                .search_path()
                .next()
                .ok_or(PropagationError::NoCreationSchema),
        }
    }

    /// Returns the current state of a statistics object.
    pub fn statistics_by_id(&self, id: StatisticsId) -> Option<StatisticsObject> {
        self.catalog.statistics_by_id(id)
    }

    /// Returns the table a statistics object is defined on.
    pub fn owning_table(&self, id: StatisticsId) -> Option<TableId> {
        self.catalog
            .statistics_by_id(id)
            .map(|stats| stats.identity.table)
    }

    pub fn role_name(&self, id: RoleId) -> Result<String, PropagationError> {
        self.catalog
            .role_name(id)
            .ok_or_else(|| PropagationError::ObjectNotFound {
                kind: ObjectType::Role,
                name: id.to_string(),
            })
    }

    fn schema(&self, name: &str) -> Result<SchemaEntry, PropagationError> {
        self.catalog
            .schema_by_name(name)
            .ok_or_else(|| PropagationError::ObjectNotFound {
                kind: ObjectType::Schema,
                name: name.into(),
            })
    }

    /// The schemas on the search path that exist, in search order.
    fn search_path(&self) -> impl Iterator<Item = SchemaEntry> + 'a {
        let catalog = self.catalog;
        let session = self.session;
        session
            .search_path
            .iter()
            .filter_map(move |name| catalog.schema_by_name(name))
    }
}
