// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Reconstruction of statistics objects on a table that becomes distributed.
//!
//! When a table is distributed, its statistics objects are created on the
//! worker nodes from their definitions, which yields objects with default
//! attributes. Any attribute that drifted from its default on the
//! coordinator is then replayed with a corrective command.

use itertools::Itertools;
use tracing::debug;

use crate::catalog::{PropagationCatalog, StatisticsObject, TableEntry};
use crate::error::PropagationError;
use crate::names::{SchemaId, TableId};
use crate::resolve::ObjectResolver;
use crate::session::SessionContext;
use crate::synthesize::CommandSynthesizer;

/// Synthesizes the commands that reproduce a table's statistics objects.
#[derive(Debug, Clone, Copy)]
pub struct DriftSynthesizer<'a> {
    catalog: &'a dyn PropagationCatalog,
    session: &'a SessionContext,
    synthesizer: CommandSynthesizer<'a>,
}

impl<'a> DriftSynthesizer<'a> {
    pub fn new(
        catalog: &'a dyn PropagationCatalog,
        session: &'a SessionContext,
        synthesizer: CommandSynthesizer<'a>,
    ) -> Self {
        DriftSynthesizer {
            catalog,
            session,
            synthesizer,
        }
    }

    /// Returns the commands that correct the attributes of the statistics
    /// objects on `table` that differ from the defaults they are created
    /// with, in ID order. For each object the owner comes before the target.
    pub fn corrective_commands(&self, table: TableId) -> Result<Vec<String>, PropagationError> {
        let mut commands = vec![];
        for stats in self.explicit_statistics(table) {
            commands.extend(self.corrections(&stats)?);
        }
        Ok(commands)
    }

    /// Returns the commands that create the statistics objects on `table`
    /// followed by all of their corrective commands.
    pub fn creation_commands(&self, table: &TableEntry) -> Result<Vec<String>, PropagationError> {
        let stats = self.explicit_statistics(table.id);
        let mut commands: Vec<_> = stats
            .iter()
            .map(|stats| self.synthesizer.create_from_catalog(stats, table))
            .collect();
        for stats in &stats {
            commands.extend(self.corrections(stats)?);
        }
        Ok(commands)
    }

    /// Returns the schemas that contain statistics objects on `table`.
    pub fn explicit_statistics_schemas(&self, table: TableId) -> Vec<SchemaId> {
        self.explicit_statistics(table)
            .into_iter()
            .map(|stats| stats.identity.schema)
            .unique()
            .collect()
    }

    /// The explicitly created statistics objects on `table`, in ID order.
    ///
    /// Implicit objects are skipped; worker nodes generate their own. So are
    /// objects that vanish between listing and lookup, which another
    /// session dropped concurrently.
    fn explicit_statistics(&self, table: TableId) -> Vec<StatisticsObject> {
        self.catalog
            .list_statistics_by_table(table)
            .into_iter()
            .filter(|identity| !identity.implicit)
            .filter_map(|identity| match self.catalog.statistics_by_id(identity.id) {
                Some(stats) => Some(stats),
                None => {
                    debug!(id = %identity.id, %table, "skipping vanished statistics object");
                    None
                }
            })
            .collect()
    }

    fn corrections(&self, stats: &StatisticsObject) -> Result<Vec<String>, PropagationError> {
        let mut commands = vec![];
        let name = &stats.identity.name;
        if stats.state.owner != self.session.current_role {
            let owner =
                ObjectResolver::new(self.catalog, self.session).role_name(stats.state.owner)?;
            commands.push(self.synthesizer.owner_to(name, &owner));
        }
        if let Some(target) = stats.state.target {
            if self.synthesizer.capabilities().alter_statistics_target {
                commands.push(self.synthesizer.set_statistics(name, target)?);
            }
        }
        Ok(commands)
    }
}
