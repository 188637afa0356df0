// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Scenario tests of DDL propagation, driven by the files in
//! `tests/testdata`.
//!
//! Each file runs against its own in-memory catalog, cluster and recording
//! execution engine. The directives are:
//!
//! * `catalog`: sets up the catalog and cluster, one object per line.
//! * `config`: applies `name=value` config updates.
//! * `ddl`: plans a statement, applies it locally, executes the planned
//!   units on the workers and commits. Prints the planned units.
//! * `reconcile`, `distribute`, `creation-commands`: the entry points used
//!   when a table becomes distributed.
//! * `executed`: prints the tasks the engine executed since the last
//!   `executed`.
//! * `fail` and `heal`: make the engine fail on a node, or stop failing.

use std::collections::HashMap;
use std::sync::Arc;

use datadriven::{walk, TestCase};
use mz_ddl_parser::parser;
use mz_ddl_propagation::catalog::PropagationCatalog;
use mz_ddl_propagation::config::{all_propagation_configs, ConfigSet, ConfigType, ConfigUpdates};
use mz_ddl_propagation::memory::{MemoryCatalog, RecordingEngine, StaticMembership};
use mz_ddl_propagation::names::{NodeId, ObjectAddress, TableId};
use mz_ddl_propagation::{
    execute_units, ClusterMembership, CommandOrigin, DdlTransaction, ExecutionEngine, NodeRole,
    PropagationError, PropagationUnit, Propagator, PropagatorConfig, SessionContext, WorkerNode,
};

struct Harness {
    runtime: tokio::runtime::Runtime,
    catalog: Arc<MemoryCatalog>,
    membership: Arc<StaticMembership>,
    engine: Arc<RecordingEngine>,
    configs: ConfigSet,
    reported: usize,
}

impl Harness {
    fn new() -> Harness {
        Harness {
            runtime: tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap(),
            catalog: Arc::new(MemoryCatalog::default()),
            membership: Arc::new(StaticMembership::default()),
            engine: Arc::new(RecordingEngine::default()),
            configs: all_propagation_configs(ConfigSet::default()),
            reported: 0,
        }
    }

    fn propagator(&self) -> Propagator {
        Propagator::new(
            Arc::clone(&self.catalog) as Arc<dyn PropagationCatalog>,
            Arc::clone(&self.membership) as Arc<dyn ClusterMembership>,
            Arc::clone(&self.engine) as Arc<dyn ExecutionEngine>,
            PropagatorConfig::from_config_set(&self.configs),
        )
    }

    fn run(&mut self, tc: &TestCase) -> String {
        match tc.directive.as_str() {
            "catalog" => self.define_catalog(&tc.input),
            "config" => self.update_config(&tc.input),
            "ddl" => self.ddl(tc),
            "reconcile" => self.reconcile(tc),
            "distribute" => self.distribute(tc),
            "creation-commands" => self.creation_commands(tc),
            "executed" => self.executed(),
            "fail" => {
                let node = NodeId(arg(&tc.args, "node").parse().unwrap());
                self.engine.fail_on(node, tc.input.trim());
                "ok\n".into()
            }
            "heal" => {
                self.engine.clear_failures();
                "ok\n".into()
            }
            dir => panic!("unhandled directive {}", dir),
        }
    }

    fn define_catalog(&mut self, input: &str) -> String {
        for line in input.lines() {
            let words: Vec<_> = line.split_whitespace().collect();
            match words.as_slice() {
                ["role", name] => {
                    self.catalog.create_role(name);
                }
                ["schema", name, owner] => {
                    let owner = owner.strip_prefix("owner=").unwrap();
                    let owner = self.catalog.role_id(owner).unwrap();
                    self.catalog.create_schema(name, owner);
                }
                ["distributed-schema", name] => {
                    let schema = self.catalog.schema_by_name(name).unwrap();
                    self.catalog
                        .mark_object_distributed(ObjectAddress::Schema(schema.id));
                }
                ["table", name] => {
                    let (schema, name) = name.split_once('.').unwrap();
                    let schema = self.catalog.schema_by_name(schema).unwrap();
                    self.catalog.create_table(schema.id, name);
                }
                ["distribute", name] => {
                    let table = self.table(name);
                    self.catalog.distribute_table(table);
                }
                ["implicit", table, name, owner] => {
                    let table = self.table(table);
                    let owner = owner.strip_prefix("owner=").unwrap();
                    let owner = self.catalog.role_id(owner).unwrap();
                    self.catalog.create_implicit_statistics(table, name, owner);
                }
                ["worker", id, host, port] => self.membership.add(WorkerNode {
                    id: NodeId(id.parse().unwrap()),
                    host: host.to_string(),
                    port: port.parse().unwrap(),
                }),
                _ => panic!("unknown catalog line: {}", line),
            }
        }
        "ok\n".into()
    }

    fn update_config(&mut self, input: &str) -> String {
        let mut updates = ConfigUpdates::default();
        for line in input.lines() {
            let (name, value) = line.split_once('=').unwrap();
            let value = match value {
                "true" | "false" => (value == "true").share(),
                n => n.parse::<u32>().unwrap().share(),
            };
            updates.add_dynamic(name, value);
        }
        updates.apply(&self.configs);
        "ok\n".into()
    }

    fn session(&self, args: &HashMap<String, Vec<String>>) -> SessionContext {
        let role = args
            .get("role")
            .map(|role| role[0].as_str())
            .unwrap_or("postgres");
        let node_role = match args.get("node").map(|node| node[0].as_str()) {
            Some("worker") => NodeRole::Worker,
            _ => NodeRole::Coordinator,
        };
        let mut session =
            SessionContext::new(&self.configs, node_role, self.catalog.role_id(role).unwrap());
        if let Some(search_path) = args.get("search_path") {
            session = session.with_search_path(
                search_path
                    .iter()
                    .flat_map(|s| s.split(','))
                    .map(|s| s.trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace()))
                    .map(String::from),
            );
        }
        if args.contains_key("propagated") {
            session = session.with_origin(CommandOrigin::Propagated);
        }
        if args.contains_key("no-propagation") {
            session.enable_ddl_propagation = false;
        }
        session
    }

    fn ddl(&mut self, tc: &TestCase) -> String {
        let session = self.session(&tc.args);
        let stmt = parser::parse_statement(tc.input.trim()).unwrap();
        let propagator = self.propagator();
        let mut txn = DdlTransaction::new(session.clone());

        let units = match self.runtime.block_on(propagator.plan_for_event(&mut txn, &stmt)) {
            Ok(units) => units,
            Err(e) => return render_error(&e),
        };
        let mut out = self.render_units(&units);
        if let Err(e) = self.catalog.execute(&session, &stmt) {
            out.push_str(&format!("error: {}\n", e));
            return out;
        }
        if let Err(e) = self.runtime.block_on(execute_units(&**propagator.engine(), units)) {
            out.push_str(&render_error(&e));
            return out;
        }
        txn.commit(&*self.catalog);
        out
    }

    fn reconcile(&mut self, tc: &TestCase) -> String {
        let table = self.table(&arg(&tc.args, "table"));
        let propagator = self.propagator();
        let mut txn = DdlTransaction::new(self.session(&tc.args));
        match self
            .runtime
            .block_on(propagator.reconcile_on_distribution(&mut txn, table))
        {
            Ok(units) => {
                txn.commit(&*self.catalog);
                self.render_units(&units)
            }
            Err(e) => render_error(&e),
        }
    }

    fn distribute(&mut self, tc: &TestCase) -> String {
        let table = self.table(&arg(&tc.args, "table"));
        self.catalog.distribute_table(table);
        let propagator = self.propagator();
        let mut txn = DdlTransaction::new(self.session(&tc.args));
        let units = match self
            .runtime
            .block_on(propagator.plan_table_distribution(&mut txn, table))
        {
            Ok(units) => units,
            Err(e) => return render_error(&e),
        };
        let mut out = self.render_units(&units);
        if let Err(e) = self.runtime.block_on(execute_units(&**propagator.engine(), units)) {
            out.push_str(&render_error(&e));
            return out;
        }
        txn.commit(&*self.catalog);
        out
    }

    fn creation_commands(&mut self, tc: &TestCase) -> String {
        let table = self.table(&arg(&tc.args, "table"));
        let propagator = self.propagator();
        let mut txn = DdlTransaction::new(self.session(&tc.args));
        let commands = match self
            .runtime
            .block_on(propagator.statistics_creation_commands(&mut txn, table))
        {
            Ok(commands) => commands,
            Err(e) => return render_error(&e),
        };
        let schemas: Vec<_> = propagator
            .explicit_statistics_schemas(&txn, table)
            .into_iter()
            .map(|id| self.catalog.schema_by_id(id).unwrap().name)
            .collect();
        txn.commit(&*self.catalog);

        let mut out = format!("schemas: {}\n", schemas.join(", "));
        for command in commands {
            out.push_str(&command);
            out.push('\n');
        }
        out
    }

    fn executed(&mut self) -> String {
        let executed = self.engine.executed();
        let new = &executed[self.reported..];
        self.reported = executed.len();
        if new.is_empty() {
            return "(nothing)\n".into();
        }
        new.iter()
            .map(|(node, command)| format!("node {}: {}\n", node, command))
            .collect()
    }

    fn render_units(&self, units: &[PropagationUnit]) -> String {
        if units.is_empty() {
            return "(no units)\n".into();
        }
        let mut out = String::new();
        for unit in units {
            let table = match unit.target_table() {
                Some(id) => self.catalog.table_by_id(id).unwrap().name.to_string(),
                None => "none".into(),
            };
            out.push_str(&format!("unit table={} flags=({})\n", table, unit.flags()));
            for task in unit.tasks() {
                out.push_str(&format!("node {}: {}\n", task.node().id, task.command()));
            }
        }
        out
    }

    fn table(&self, name: &str) -> TableId {
        let (schema, name) = name.split_once('.').unwrap();
        let schema = self.catalog.schema_by_name(schema).unwrap();
        self.catalog.table_by_name(schema.id, name).unwrap().id
    }
}

fn arg(args: &HashMap<String, Vec<String>>, name: &str) -> String {
    args.get(name)
        .and_then(|values| values.first())
        .unwrap_or_else(|| panic!("missing argument {}", name))
        .clone()
}

fn render_error(e: &PropagationError) -> String {
    let mut out = format!("error: {}\n", e);
    if let Some(detail) = e.detail() {
        out.push_str(&format!("detail: {}\n", detail));
    }
    if let Some(hint) = e.hint() {
        out.push_str(&format!("hint: {}\n", hint));
    }
    out
}

#[test]
fn datadriven() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    walk("tests/testdata", |f| {
        let mut harness = Harness::new();
        f.run(|tc| harness.run(tc))
    });
}
