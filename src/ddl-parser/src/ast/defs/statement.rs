// Copyright 2018 sqlparser-rs contributors. All rights reserved.
// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// This file is derived from the sqlparser-rs project, available at
// https://github.com/andygrove/sqlparser-rs. It was incorporated
// directly into Materialize on December 21, 2019.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository, or online at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

use crate::ast::display::{self, AstDisplay, AstFormatter};
use crate::ast::{Ident, UnresolvedItemName};

/// A top-level DDL statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    /// `CREATE STATISTICS`
    CreateStatistics(CreateStatisticsStatement),
    /// `ALTER STATISTICS`
    AlterStatistics(AlterStatisticsStatement),
    /// `DROP STATISTICS`
    DropStatistics(DropStatisticsStatement),
    /// `CREATE SCHEMA`
    CreateSchema(CreateSchemaStatement),
}

impl Statement {
    /// A short, human readable description of the statement kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::CreateStatistics(_) => "CREATE STATISTICS",
            Statement::AlterStatistics(stmt) => match stmt.action {
                AlterStatisticsAction::RenameTo(_) => "ALTER STATISTICS RENAME",
                AlterStatisticsAction::SetSchema(_) => "ALTER STATISTICS SET SCHEMA",
                AlterStatisticsAction::OwnerTo(_) => "ALTER STATISTICS OWNER",
                AlterStatisticsAction::SetStatistics(_) => "ALTER STATISTICS SET STATISTICS",
            },
            Statement::DropStatistics(_) => "DROP STATISTICS",
            Statement::CreateSchema(_) => "CREATE SCHEMA",
        }
    }
}

impl AstDisplay for Statement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        match self {
            Statement::CreateStatistics(stmt) => f.write_node(stmt),
            Statement::AlterStatistics(stmt) => f.write_node(stmt),
            Statement::DropStatistics(stmt) => f.write_node(stmt),
            Statement::CreateSchema(stmt) => f.write_node(stmt),
        }
    }
}
impl_display!(Statement);

/// The kind of an extended statistics object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatisticsKind {
    /// N-distinct counts.
    Ndistinct,
    /// Functional dependencies.
    Dependencies,
    /// Most common value lists.
    Mcv,
}

impl StatisticsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticsKind::Ndistinct => "ndistinct",
            StatisticsKind::Dependencies => "dependencies",
            StatisticsKind::Mcv => "mcv",
        }
    }

    pub fn from_ident(ident: &Ident) -> Option<StatisticsKind> {
        match ident.as_str() {
            "ndistinct" => Some(StatisticsKind::Ndistinct),
            "dependencies" => Some(StatisticsKind::Dependencies),
            "mcv" => Some(StatisticsKind::Mcv),
            _ => None,
        }
    }
}

impl AstDisplay for StatisticsKind {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str(self.as_str());
    }
}
impl_display!(StatisticsKind);

/// `CREATE STATISTICS [IF NOT EXISTS] <name> [(<kind>, ...)] ON <column>, ... FROM <table>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreateStatisticsStatement {
    pub if_not_exists: bool,
    pub name: UnresolvedItemName,
    /// The requested statistics kinds. Empty means all kinds.
    pub kinds: Vec<StatisticsKind>,
    pub columns: Vec<Ident>,
    pub table: UnresolvedItemName,
}

impl AstDisplay for CreateStatisticsStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("CREATE STATISTICS ");
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ");
        }
        f.write_node(&self.name);
        if !self.kinds.is_empty() {
            f.write_str(" (");
            f.write_node(&display::comma_separated(&self.kinds));
            f.write_str(")");
        }
        f.write_str(" ON ");
        f.write_node(&display::comma_separated(&self.columns));
        f.write_str(" FROM ");
        f.write_node(&self.table);
    }
}
impl_display!(CreateStatisticsStatement);

/// `ALTER STATISTICS [IF EXISTS] <name> <action>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlterStatisticsStatement {
    pub if_exists: bool,
    pub name: UnresolvedItemName,
    pub action: AlterStatisticsAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlterStatisticsAction {
    /// `RENAME TO <ident>`
    RenameTo(Ident),
    /// `SET SCHEMA <ident>`
    SetSchema(Ident),
    /// `OWNER TO <role>`
    OwnerTo(Ident),
    /// `SET STATISTICS <target>`, where `-1` restores the default target.
    SetStatistics(i32),
}

impl AstDisplay for AlterStatisticsStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("ALTER STATISTICS ");
        if self.if_exists {
            f.write_str("IF EXISTS ");
        }
        f.write_node(&self.name);
        match &self.action {
            AlterStatisticsAction::RenameTo(new_name) => {
                f.write_str(" RENAME TO ");
                f.write_node(new_name);
            }
            AlterStatisticsAction::SetSchema(schema) => {
                f.write_str(" SET SCHEMA ");
                f.write_node(schema);
            }
            AlterStatisticsAction::OwnerTo(role) => {
                f.write_str(" OWNER TO ");
                f.write_node(role);
            }
            AlterStatisticsAction::SetStatistics(target) => {
                f.write_str(" SET STATISTICS ");
                f.write_str(target);
            }
        }
    }
}
impl_display!(AlterStatisticsStatement);

/// `DROP STATISTICS [IF EXISTS] <name>, ... [CASCADE | RESTRICT]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DropStatisticsStatement {
    pub if_exists: bool,
    pub names: Vec<UnresolvedItemName>,
    /// Whether `CASCADE` was specified. This will be `false` when
    /// `RESTRICT` or no drop behavior at all was specified.
    pub cascade: bool,
}

impl AstDisplay for DropStatisticsStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("DROP STATISTICS ");
        if self.if_exists {
            f.write_str("IF EXISTS ");
        }
        f.write_node(&display::comma_separated(&self.names));
        if self.cascade {
            f.write_str(" CASCADE");
        }
    }
}
impl_display!(DropStatisticsStatement);

/// `CREATE SCHEMA [IF NOT EXISTS] <name> [AUTHORIZATION <role>]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CreateSchemaStatement {
    pub if_not_exists: bool,
    pub name: Ident,
    pub authorization: Option<Ident>,
}

impl AstDisplay for CreateSchemaStatement {
    fn fmt<W: fmt::Write>(&self, f: &mut AstFormatter<W>) {
        f.write_str("CREATE SCHEMA ");
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ");
        }
        f.write_node(&self.name);
        if let Some(role) = &self.authorization {
            f.write_str(" AUTHORIZATION ");
            f.write_node(role);
        }
    }
}
impl_display!(CreateSchemaStatement);
