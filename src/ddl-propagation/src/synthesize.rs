// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Synthesis of the commands sent to worker nodes.
//!
//! Every command names its objects with fully qualified names. A worker
//! executes it with its own search path, which need not match the one of
//! the session that issued the original statement.

use std::fmt::Debug;

use mz_ddl_parser::ast::display::AstDisplay;
use mz_ddl_parser::ast::{
    AlterStatisticsAction, AlterStatisticsStatement, CreateSchemaStatement,
    CreateStatisticsStatement, DropStatisticsStatement, Ident, Statement,
};

use crate::catalog::{ObjectIdentity, SchemaEntry, StatisticsObject, TableEntry};
use crate::error::PropagationError;
use crate::names::QualifiedName;

/// Renders statements into command text.
pub trait Deparser: Debug + Send + Sync {
    /// Renders `stmt`. Parsing the result must yield `stmt` again.
    fn render(&self, stmt: &Statement) -> String;
}

/// A [`Deparser`] that renders statements with [`AstDisplay`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AstDeparser;

impl Deparser for AstDeparser {
    fn render(&self, stmt: &Statement) -> String {
        stmt.to_ast_string()
    }
}

/// Optional features of the host database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether `ALTER STATISTICS .. SET STATISTICS` is supported.
    pub alter_statistics_target: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            alter_statistics_target: true,
        }
    }
}

/// Turns resolved DDL into command text.
#[derive(Debug, Clone, Copy)]
pub struct CommandSynthesizer<'a> {
    deparser: &'a dyn Deparser,
    capabilities: Capabilities,
}

impl<'a> CommandSynthesizer<'a> {
    pub fn new(deparser: &'a dyn Deparser, capabilities: Capabilities) -> Self {
        CommandSynthesizer {
            deparser,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Synthesizes the creation of a statistics object, qualifying its name
    /// with `schema` and the name of its table.
    pub fn create_statistics(
        &self,
        stmt: &CreateStatisticsStatement,
        schema: &SchemaEntry,
        table: &TableEntry,
    ) -> String {
        let name = QualifiedName::new(&schema.name, stmt.name.item().as_str());
        self.render(Statement::CreateStatistics(CreateStatisticsStatement {
            if_not_exists: stmt.if_not_exists,
            name: name.to_unresolved(),
            kinds: stmt.kinds.clone(),
            columns: stmt.columns.clone(),
            table: table.name.to_unresolved(),
        }))
    }

    /// Synthesizes the creation of an existing statistics object from its
    /// catalog definition. The object is created with default attributes.
    pub fn create_from_catalog(&self, stats: &StatisticsObject, table: &TableEntry) -> String {
        self.render(Statement::CreateStatistics(CreateStatisticsStatement {
            if_not_exists: false,
            name: stats.identity.name.to_unresolved(),
            kinds: stats.definition.kinds.clone(),
            columns: stats
                .definition
                .columns
                .iter()
                .map(|c| Ident::new(c.as_str()))
                .collect(),
            table: table.name.to_unresolved(),
        }))
    }

    /// Synthesizes an `ALTER STATISTICS` that applies `stmt`'s action to the
    /// object identified by `current`.
    ///
    /// `current` is the object's identity before the statement executes, so
    /// a rename or schema move names the object by the path it has now.
    pub fn alter_statistics(
        &self,
        stmt: &AlterStatisticsStatement,
        current: &ObjectIdentity,
    ) -> Result<String, PropagationError> {
        if let AlterStatisticsAction::SetStatistics(_) = stmt.action {
            self.ensure_alter_target()?;
        }
        Ok(self.render(Statement::AlterStatistics(AlterStatisticsStatement {
            if_exists: stmt.if_exists,
            name: current.name.to_unresolved(),
            action: stmt.action.clone(),
        })))
    }

    /// Synthesizes the drop of a single statistics object.
    pub fn drop_statistics(&self, current: &ObjectIdentity, if_exists: bool, cascade: bool) -> String {
        self.render(Statement::DropStatistics(DropStatisticsStatement {
            if_exists,
            names: vec![current.name.to_unresolved()],
            cascade,
        }))
    }

    pub fn owner_to(&self, name: &QualifiedName, role: &str) -> String {
        self.render(Statement::AlterStatistics(AlterStatisticsStatement {
            if_exists: false,
            name: name.to_unresolved(),
            action: AlterStatisticsAction::OwnerTo(Ident::new(role)),
        }))
    }

    pub fn set_statistics(
        &self,
        name: &QualifiedName,
        target: i32,
    ) -> Result<String, PropagationError> {
        self.ensure_alter_target()?;
        Ok(self.render(Statement::AlterStatistics(AlterStatisticsStatement {
            if_exists: false,
            name: name.to_unresolved(),
            action: AlterStatisticsAction::SetStatistics(target),
        })))
    }

    /// Synthesizes the idempotent creation of a schema owned by `owner`.
    pub fn create_schema(&self, schema: &str, owner: &str) -> String {
        self.render(Statement::CreateSchema(CreateSchemaStatement {
            if_not_exists: true,
            name: Ident::new(schema),
            authorization: Some(Ident::new(owner)),
        }))
    }

    fn ensure_alter_target(&self) -> Result<(), PropagationError> {
        if self.capabilities.alter_statistics_target {
            Ok(())
        } else {
            Err(PropagationError::Unsupported("ALTER STATISTICS .. SET STATISTICS"))
        }
    }

    fn render(&self, stmt: Statement) -> String {
        self.deparser.render(&stmt)
    }
}
