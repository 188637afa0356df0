// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Identifiers and names of catalog objects.

use std::fmt;

use mz_ddl_parser::ast::display::AstDisplay;
use mz_ddl_parser::ast::UnresolvedItemName;
use serde::{Deserialize, Serialize};

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

catalog_id!(
    /// The stable identifier of a statistics object.
    ///
    /// Unlike its name, the identifier survives renames and schema moves.
    StatisticsId
);
catalog_id!(
    /// The identifier of a table.
    TableId
);
catalog_id!(
    /// The identifier of a schema.
    SchemaId
);
catalog_id!(
    /// The identifier of a role.
    RoleId
);
catalog_id!(
    /// The identifier of a worker node in the cluster.
    NodeId
);

/// A fully qualified item name, as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: String,
    pub item: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, item: impl Into<String>) -> QualifiedName {
        QualifiedName {
            schema: schema.into(),
            item: item.into(),
        }
    }

    /// Converts the name into its AST form, which is always schema
    /// qualified.
    pub fn to_unresolved(&self) -> UnresolvedItemName {
        UnresolvedItemName::qualified(&self.schema, &self.item)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_unresolved().to_ast_string())
    }
}

/// The address of an object that statistics objects depend on and that is
/// created on worker nodes ahead of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectAddress {
    Schema(SchemaId),
}

impl fmt::Display for ObjectAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ObjectAddress::Schema(id) => write!(f, "schema {}", id),
        }
    }
}

/// The kinds of catalog objects that names can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Role,
    Schema,
    Statistics,
    Table,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ObjectType::Role => "role",
            ObjectType::Schema => "schema",
            ObjectType::Statistics => "statistics object",
            ObjectType::Table => "table",
        })
    }
}
