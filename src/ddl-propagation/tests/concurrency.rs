// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Tests of statements that run concurrently with other statements on the
//! same tables.

use std::sync::Arc;
use std::time::Duration;

use mz_ddl_parser::parser::parse_statement;
use mz_ddl_propagation::catalog::{
    ObjectIdentity, PropagationCatalog, SchemaEntry, StatisticsObject, TableEntry,
};
use mz_ddl_propagation::config::{all_propagation_configs, ConfigSet};
use mz_ddl_propagation::memory::{MemoryCatalog, RecordingEngine, StaticMembership};
use mz_ddl_propagation::names::{NodeId, ObjectAddress, RoleId, SchemaId, StatisticsId, TableId};
use mz_ddl_propagation::{
    ClusterMembership, DdlTransaction, ExecutionEngine, NodeRole, PropagationError,
    PropagationUnit, Propagator, PropagatorConfig, SessionContext, WorkerNode,
};

struct Cluster {
    catalog: Arc<MemoryCatalog>,
    membership: Arc<StaticMembership>,
    engine: Arc<RecordingEngine>,
    propagator: Propagator,
    postgres: RoleId,
    table: TableId,
}

impl Cluster {
    /// A distributed table `s1.t` with a statistics object `s1.st`, in a
    /// distributed schema, on a cluster of two workers.
    fn new() -> Cluster {
        let catalog = Arc::new(MemoryCatalog::default());
        let postgres = catalog.create_role("postgres");
        catalog.create_role("bob");
        let s1 = catalog.create_schema("s1", postgres);
        catalog.create_schema("s2", postgres);
        catalog.mark_object_distributed(ObjectAddress::Schema(s1));
        let table = catalog.create_table(s1, "t");
        catalog.distribute_table(table);

        let membership = Arc::new(StaticMembership::default());
        for id in 1..=2 {
            membership.add(WorkerNode {
                id: NodeId(id),
                host: format!("w{}", id),
                port: 5432,
            });
        }
        let engine = Arc::new(RecordingEngine::default());
        let propagator = Propagator::new(
            Arc::clone(&catalog) as Arc<dyn PropagationCatalog>,
            Arc::clone(&membership) as Arc<dyn ClusterMembership>,
            Arc::clone(&engine) as Arc<dyn ExecutionEngine>,
            PropagatorConfig::default(),
        );

        let cluster = Cluster {
            catalog,
            membership,
            engine,
            propagator,
            postgres,
            table,
        };
        cluster
            .catalog
            .execute(
                &cluster.session(),
                &parse_statement("CREATE STATISTICS s1.st ON a FROM s1.t").unwrap(),
            )
            .unwrap();
        cluster
    }

    fn session(&self) -> SessionContext {
        let configs = all_propagation_configs(ConfigSet::default());
        SessionContext::new(&configs, NodeRole::Coordinator, self.postgres)
    }

    async fn plan(
        &self,
        txn: &mut DdlTransaction,
        sql: &str,
    ) -> Result<Vec<PropagationUnit>, PropagationError> {
        let stmt = parse_statement(sql).unwrap();
        self.propagator.plan_for_event(txn, &stmt).await
    }

    /// Applies `sql` locally and commits `txn`, which planned it.
    fn finish(&self, txn: DdlTransaction, sql: &str) {
        self.finish_all(txn, &[sql]);
    }

    /// Applies every statement of `sqls` locally, in order, and commits
    /// `txn`.
    fn finish_all(&self, txn: DdlTransaction, sqls: &[&str]) {
        for sql in sqls {
            let stmt = parse_statement(sql).unwrap();
            self.catalog.execute(txn.session(), &stmt).unwrap();
        }
        txn.commit(&*self.catalog);
    }
}

fn commands(units: &[PropagationUnit]) -> Vec<&str> {
    units
        .iter()
        .filter_map(|unit| unit.tasks().first())
        .map(|task| task.command())
        .collect()
}

#[tokio::test]
async fn reconcile_waits_for_pending_alter() {
    let cluster = Cluster::new();
    let alter = "ALTER STATISTICS s1.st OWNER TO bob";

    let mut txn_a = DdlTransaction::new(cluster.session());
    let units = cluster.plan(&mut txn_a, alter).await.unwrap();
    assert_eq!(commands(&units), vec![alter]);
    assert!(txn_a.holds_lock(cluster.table));

    let mut txn_b = DdlTransaction::new(cluster.session());
    let a = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cluster.finish(txn_a, alter);
    };
    let b = cluster
        .propagator
        .reconcile_on_distribution(&mut txn_b, cluster.table);
    let ((), reconciled) = tokio::join!(a, b);

    assert_eq!(commands(&reconciled.unwrap()), vec![alter]);
    txn_b.commit(&*cluster.catalog);
}

#[tokio::test]
async fn alter_revalidates_name_after_waiting() {
    let cluster = Cluster::new();
    let rename = "ALTER STATISTICS s1.st RENAME TO st2";

    let mut txn_a = DdlTransaction::new(cluster.session());
    cluster.plan(&mut txn_a, rename).await.unwrap();

    let mut txn_b = DdlTransaction::new(cluster.session());
    let mut txn_c = DdlTransaction::new(cluster.session());
    let a = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cluster.finish(txn_a, rename);
    };
    let b = cluster.plan(&mut txn_b, "ALTER STATISTICS s1.st OWNER TO bob");
    let c = cluster.plan(&mut txn_c, "ALTER STATISTICS IF EXISTS s1.st OWNER TO bob");
    let ((), altered, altered_if_exists) = tokio::join!(a, b, c);

    match altered {
        Err(PropagationError::ObjectNotFound { name, .. }) => assert_eq!(name, "s1.st"),
        res => panic!("unexpected result: {:?}", res),
    }
    assert!(altered_if_exists.unwrap().is_empty());
    txn_b.abort();
    txn_c.abort();
}

#[tokio::test]
async fn drop_revalidates_names_after_waiting() {
    let cluster = Cluster::new();
    let rename = "ALTER STATISTICS s1.st RENAME TO x";
    let recreate = "CREATE STATISTICS s1.st ON b FROM s1.t";

    let mut txn_a = DdlTransaction::new(cluster.session());
    cluster.plan(&mut txn_a, rename).await.unwrap();
    cluster.plan(&mut txn_a, recreate).await.unwrap();

    let mut txn_b = DdlTransaction::new(cluster.session());
    let a = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cluster.finish_all(txn_a, &[rename, recreate]);
    };
    let b = cluster.plan(&mut txn_b, "DROP STATISTICS s1.st");
    let ((), dropped) = tokio::join!(a, b);

    // The drop applies to the object that has the name once the lock is
    // held, which is the one the coordinator drops too.
    let units = dropped.unwrap();
    assert_eq!(commands(&units), vec!["DROP STATISTICS s1.st"]);
    cluster.finish(txn_b, "DROP STATISTICS s1.st");

    let s1 = cluster.catalog.schema_by_name("s1").unwrap();
    assert!(cluster.catalog.statistics_by_name(s1.id, "x").is_some());
    assert!(cluster.catalog.statistics_by_name(s1.id, "st").is_none());
}

#[tokio::test]
async fn drop_of_object_dropped_while_waiting() {
    let cluster = Cluster::new();
    let drop_st = "DROP STATISTICS s1.st";

    let mut txn_a = DdlTransaction::new(cluster.session());
    cluster.plan(&mut txn_a, drop_st).await.unwrap();

    // Each waiting drop holds the table lock once it wakes up, so it ends its
    // transaction before the next one can proceed.
    let cluster = &cluster;
    let waiting_drop = |sql: &'static str| async move {
        let mut txn = DdlTransaction::new(cluster.session());
        let res = cluster.plan(&mut txn, sql).await;
        txn.abort();
        res
    };
    let a = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cluster.finish(txn_a, drop_st);
    };
    let ((), dropped, dropped_if_exists) = tokio::join!(
        a,
        waiting_drop(drop_st),
        waiting_drop("DROP STATISTICS IF EXISTS s1.st"),
    );

    match dropped {
        Err(PropagationError::ObjectNotFound { name, .. }) => assert_eq!(name, "s1.st"),
        res => panic!("unexpected result: {:?}", res),
    }
    assert!(dropped_if_exists.unwrap().is_empty());
}

#[tokio::test]
async fn schema_is_created_once_per_transaction() {
    let cluster = Cluster::new();
    let mut txn = DdlTransaction::new(cluster.session());
    for sql in [
        "CREATE STATISTICS s2.a ON a FROM s1.t",
        "CREATE STATISTICS s2.b ON b FROM s1.t",
    ] {
        let units = cluster.plan(&mut txn, sql).await.unwrap();
        assert_eq!(commands(&units), vec![sql]);
    }
    txn.commit(&*cluster.catalog);

    let s2 = cluster.catalog.schema_by_name("s2").unwrap();
    assert!(cluster
        .catalog
        .is_object_distributed(ObjectAddress::Schema(s2.id)));
    assert_eq!(
        cluster.engine.commands_on(NodeId(1)),
        vec!["CREATE SCHEMA IF NOT EXISTS s2 AUTHORIZATION postgres"]
    );

    let mut txn = DdlTransaction::new(cluster.session());
    cluster
        .plan(&mut txn, "CREATE STATISTICS s2.c ON c FROM s1.t")
        .await
        .unwrap();
    assert_eq!(cluster.engine.commands_on(NodeId(2)).len(), 1);
}

#[tokio::test]
async fn failed_schema_creation_is_not_recorded() {
    let cluster = Cluster::new();
    cluster.engine.fail_on(NodeId(2), "permission denied");

    let mut txn = DdlTransaction::new(cluster.session());
    let err = cluster
        .plan(&mut txn, "CREATE STATISTICS s2.a ON a FROM s1.t")
        .await
        .unwrap_err();
    assert!(matches!(err, PropagationError::DependencyUnsatisfiable { .. }));
    txn.abort();

    let s2 = cluster.catalog.schema_by_name("s2").unwrap();
    assert!(!cluster
        .catalog
        .is_object_distributed(ObjectAddress::Schema(s2.id)));
}

#[tokio::test]
async fn locks_are_released_at_transaction_end() {
    let cluster = Cluster::new();
    let locks = cluster.propagator.locks();

    let mut txn = DdlTransaction::new(cluster.session());
    cluster
        .plan(&mut txn, "ALTER STATISTICS s1.st SET STATISTICS 10")
        .await
        .unwrap();
    assert!(locks.try_lock_share_update_exclusive(cluster.table).is_none());
    txn.abort();
    assert!(locks.try_lock_share_update_exclusive(cluster.table).is_some());

    let mut txn = DdlTransaction::new(cluster.session());
    cluster.plan(&mut txn, "DROP STATISTICS s1.st").await.unwrap();
    assert!(locks.try_lock_share_update_exclusive(cluster.table).is_none());
    cluster.finish(txn, "DROP STATISTICS s1.st");
    assert!(locks.try_lock_share_update_exclusive(cluster.table).is_some());
}

/// A catalog that lists a statistics object that no longer exists, as if it
/// were dropped between listing and lookup.
#[derive(Debug)]
struct VanishingCatalog {
    inner: Arc<MemoryCatalog>,
    vanished: ObjectIdentity,
}

impl PropagationCatalog for VanishingCatalog {
    fn schema_by_name(&self, name: &str) -> Option<SchemaEntry> {
        self.inner.schema_by_name(name)
    }

    fn schema_by_id(&self, id: SchemaId) -> Option<SchemaEntry> {
        self.inner.schema_by_id(id)
    }

    fn role_name(&self, id: RoleId) -> Option<String> {
        self.inner.role_name(id)
    }

    fn table_by_name(&self, schema: SchemaId, name: &str) -> Option<TableEntry> {
        self.inner.table_by_name(schema, name)
    }

    fn table_by_id(&self, id: TableId) -> Option<TableEntry> {
        self.inner.table_by_id(id)
    }

    fn statistics_by_name(&self, schema: SchemaId, name: &str) -> Option<StatisticsId> {
        self.inner.statistics_by_name(schema, name)
    }

    fn statistics_by_id(&self, id: StatisticsId) -> Option<StatisticsObject> {
        self.inner.statistics_by_id(id)
    }

    fn list_statistics_by_table(&self, table: TableId) -> Vec<ObjectIdentity> {
        let mut listed = vec![self.vanished.clone()];
        listed.extend(self.inner.list_statistics_by_table(table));
        listed
    }

    fn is_distributed_table(&self, table: TableId) -> bool {
        self.inner.is_distributed_table(table)
    }

    fn is_object_distributed(&self, object: ObjectAddress) -> bool {
        self.inner.is_object_distributed(object)
    }

    fn mark_object_distributed(&self, object: ObjectAddress) {
        self.inner.mark_object_distributed(object)
    }
}

#[tokio::test]
async fn reconcile_skips_vanished_objects() {
    let cluster = Cluster::new();
    let session = cluster.session();
    cluster
        .catalog
        .execute(
            &session,
            &parse_statement("ALTER STATISTICS s1.st SET STATISTICS 3").unwrap(),
        )
        .unwrap();
    let mut vanished = cluster
        .catalog
        .list_statistics_by_table(cluster.table)
        .remove(0);
    vanished.id = StatisticsId(1000);

    let catalog = Arc::new(VanishingCatalog {
        inner: Arc::clone(&cluster.catalog),
        vanished,
    });
    let propagator = Propagator::new(
        catalog as Arc<dyn PropagationCatalog>,
        Arc::clone(&cluster.membership) as Arc<dyn ClusterMembership>,
        Arc::clone(&cluster.engine) as Arc<dyn ExecutionEngine>,
        PropagatorConfig::default(),
    );

    let mut txn = DdlTransaction::new(session);
    let units = propagator
        .reconcile_on_distribution(&mut txn, cluster.table)
        .await
        .unwrap();
    assert_eq!(
        commands(&units),
        vec!["ALTER STATISTICS s1.st SET STATISTICS 3"]
    );
    txn.commit(&*cluster.catalog);
}
