// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Per-session state consulted by the propagation core.

use crate::config::{ConfigSet, ENABLE_DDL_PROPAGATION};
use crate::names::RoleId;

/// The role a node plays in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// The node that originates cluster-wide schema changes.
    Coordinator,
    /// A node that applies propagated schema changes.
    Worker,
}

/// Where the statement a session is executing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOrigin {
    /// A client issued the statement.
    Client,
    /// Another node propagated the statement to this one.
    Propagated,
}

/// The state of the session that issued a DDL statement.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub node_role: NodeRole,
    pub origin: CommandOrigin,
    /// The role that owns objects the session creates.
    pub current_role: RoleId,
    /// Schemas searched, in order, for unqualified names.
    pub search_path: Vec<String>,
    /// Whether the session propagates DDL on distributed tables.
    pub enable_ddl_propagation: bool,
}

impl SessionContext {
    /// Creates a client session whose defaults come from `configs`.
    pub fn new(configs: &ConfigSet, node_role: NodeRole, current_role: RoleId) -> SessionContext {
        SessionContext {
            node_role,
            origin: CommandOrigin::Client,
            current_role,
            search_path: vec!["public".into()],
            enable_ddl_propagation: ENABLE_DDL_PROPAGATION.get(configs),
        }
    }

    pub fn with_search_path<I, S>(mut self, search_path: I) -> SessionContext
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_path = search_path.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_origin(mut self, origin: CommandOrigin) -> SessionContext {
        self.origin = origin;
        self
    }

    /// Reports whether DDL executed by this session may be propagated.
    ///
    /// Statements that were themselves propagated never are, or they would
    /// bounce between nodes forever.
    pub fn should_propagate(&self) -> bool {
        self.enable_ddl_propagation && self.origin == CommandOrigin::Client
    }
}
