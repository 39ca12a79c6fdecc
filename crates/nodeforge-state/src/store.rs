//! StateStore — redb-backed persistence for clusters and nodegroups.
//!
//! All values are JSON-serialized into redb's `&[u8]` value columns. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::registry::NodeGroupRegistry;
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        txn.open_table(NODEGROUPS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic helpers ────────────────────────────────────────────

    fn get_json<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Every value whose key starts with `prefix` (empty prefix = whole table).
    fn scan_json<T: DeserializeOwned>(&self, table: JsonTable, prefix: &str) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let item = serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(item);
            }
        }
        Ok(results)
    }

    /// Write a batch of `(table, key, value)` rows in one transaction.
    fn put_json_batch(&self, rows: &[(JsonTable, String, Vec<u8>)]) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        for (table, key, value) in rows {
            let mut table = txn.open_table(*table).map_err(map_err!(Table))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn encode<T: Serialize>(value: &T) -> StateResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(map_err!(Serialize))
    }

    // ── Clusters ───────────────────────────────────────────────────

    /// Insert or update a cluster record.
    pub fn put_cluster(&self, cluster: &Cluster) -> StateResult<()> {
        let key = cluster.table_key();
        self.put_json_batch(&[(CLUSTERS, key.clone(), Self::encode(cluster)?)])?;
        debug!(cluster_id = %key, status = %cluster.status, "cluster stored");
        Ok(())
    }

    /// Get a cluster by ID.
    pub fn get_cluster(&self, cluster_id: &str) -> StateResult<Option<Cluster>> {
        self.get_json(CLUSTERS, cluster_id)
    }

    /// List all clusters.
    pub fn list_clusters(&self) -> StateResult<Vec<Cluster>> {
        self.scan_json(CLUSTERS, "")
    }

    // ── Nodegroups ─────────────────────────────────────────────────

    /// Insert or update a nodegroup record.
    pub fn put_nodegroup(&self, nodegroup: &NodeGroup) -> StateResult<()> {
        let key = nodegroup.table_key();
        self.put_json_batch(&[(NODEGROUPS, key.clone(), Self::encode(nodegroup)?)])?;
        debug!(%key, node_count = nodegroup.node_count, "nodegroup stored");
        Ok(())
    }

    /// Get a nodegroup by its owning cluster and ID.
    pub fn get_nodegroup(
        &self,
        cluster_id: &str,
        nodegroup_id: &str,
    ) -> StateResult<Option<NodeGroup>> {
        self.get_json(NODEGROUPS, &format!("{cluster_id}:{nodegroup_id}"))
    }

    /// List all nodegroups for a given cluster.
    pub fn list_nodegroups_for_cluster(&self, cluster_id: &str) -> StateResult<Vec<NodeGroup>> {
        self.scan_json(NODEGROUPS, &format!("{cluster_id}:"))
    }

    /// Load the registry view of a cluster's nodegroups.
    pub fn load_registry(&self, cluster_id: &str) -> StateResult<NodeGroupRegistry> {
        let nodegroups = self.list_nodegroups_for_cluster(cluster_id)?;
        Ok(NodeGroupRegistry::new(cluster_id, nodegroups))
    }

    /// Atomically persist a cluster together with one of its nodegroups.
    ///
    /// Used for lifecycle transitions, which always move both records.
    pub fn put_cluster_and_nodegroup(
        &self,
        cluster: &Cluster,
        nodegroup: &NodeGroup,
    ) -> StateResult<()> {
        if nodegroup.cluster_id != cluster.id {
            return Err(StateError::ForeignNodeGroup {
                nodegroup: nodegroup.id.clone(),
                owner: nodegroup.cluster_id.clone(),
                cluster: cluster.id.clone(),
            });
        }
        self.put_json_batch(&[
            (CLUSTERS, cluster.table_key(), Self::encode(cluster)?),
            (NODEGROUPS, nodegroup.table_key(), Self::encode(nodegroup)?),
        ])?;
        debug!(
            cluster_id = %cluster.id,
            nodegroup = %nodegroup.name,
            status = %cluster.status,
            node_count = nodegroup.node_count,
            "cluster and nodegroup stored"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cluster() -> Cluster {
        Cluster::new("cluster_example_A", "template-1")
    }

    fn seeded_store() -> (StateStore, Cluster) {
        let store = StateStore::open_in_memory().unwrap();
        let cluster = test_cluster();
        store.put_cluster(&cluster).unwrap();
        store
            .put_nodegroup(&NodeGroup::new(&cluster.id, "default-worker", NodeGroupRole::Worker, 3).as_default())
            .unwrap();
        store
            .put_nodegroup(&NodeGroup::new(&cluster.id, "default-master", NodeGroupRole::Master, 1).as_default())
            .unwrap();
        (store, cluster)
    }

    // ── Cluster CRUD ───────────────────────────────────────────────

    #[test]
    fn cluster_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let cluster = test_cluster();

        store.put_cluster(&cluster).unwrap();
        let retrieved = store.get_cluster(&cluster.id).unwrap();

        assert_eq!(retrieved, Some(cluster));
    }

    #[test]
    fn cluster_get_nonexistent_returns_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.get_cluster("nope").unwrap().is_none());
    }

    #[test]
    fn cluster_update_in_place() {
        let store = StateStore::open_in_memory().unwrap();
        let mut cluster = test_cluster();
        store.put_cluster(&cluster).unwrap();

        cluster.status = LifecycleStatus::Error;
        cluster.status_reason = Some("boom".to_string());
        store.put_cluster(&cluster).unwrap();

        let retrieved = store.get_cluster(&cluster.id).unwrap().unwrap();
        assert_eq!(retrieved.status, LifecycleStatus::Error);
        assert_eq!(retrieved.status_reason.as_deref(), Some("boom"));
        assert_eq!(store.list_clusters().unwrap().len(), 1);
    }

    // ── Nodegroup CRUD ─────────────────────────────────────────────

    #[test]
    fn nodegroup_put_and_get() {
        let (store, cluster) = seeded_store();
        let ng = NodeGroup::new(&cluster.id, "gpu", NodeGroupRole::Worker, 2);
        store.put_nodegroup(&ng).unwrap();

        assert_eq!(store.get_nodegroup(&cluster.id, &ng.id).unwrap(), Some(ng));
        assert!(store.get_nodegroup("other", "gpu").unwrap().is_none());
    }

    #[test]
    fn registry_reflects_store() {
        let (store, cluster) = seeded_store();
        let registry = store.load_registry(&cluster.id).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.worker_node_count(), 3);
        assert_eq!(
            registry.default_for_role(NodeGroupRole::Worker).unwrap().name,
            "default-worker"
        );
    }

    #[test]
    fn cluster_and_nodegroup_written_together() {
        let (store, mut cluster) = seeded_store();
        let registry = store.load_registry(&cluster.id).unwrap();
        let mut ng = registry.get("default-worker").unwrap().clone();

        cluster.status = LifecycleStatus::UpdateInProgress;
        ng.status = LifecycleStatus::UpdateInProgress;
        store.put_cluster_and_nodegroup(&cluster, &ng).unwrap();

        let c = store.get_cluster(&cluster.id).unwrap().unwrap();
        let n = store.get_nodegroup(&cluster.id, &ng.id).unwrap().unwrap();
        assert_eq!(c.status, LifecycleStatus::UpdateInProgress);
        assert_eq!(n.status, LifecycleStatus::UpdateInProgress);
    }

    #[test]
    fn mismatched_nodegroup_is_rejected() {
        let (store, cluster) = seeded_store();
        let foreign = NodeGroup::new("someone-else", "w", NodeGroupRole::Worker, 1);
        let result = store.put_cluster_and_nodegroup(&cluster, &foreign);
        assert!(matches!(
            result,
            Err(StateError::ForeignNodeGroup { ref owner, .. }) if owner == "someone-else"
        ));
        // Nothing was written.
        assert_eq!(store.get_cluster(&cluster.id).unwrap().unwrap().status, cluster.status);
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");
        let cluster_id;

        {
            let store = StateStore::open(&db_path).unwrap();
            let mut cluster = test_cluster();
            cluster.status = LifecycleStatus::RollbackFailed;
            cluster_id = cluster.id.clone();
            store.put_cluster(&cluster).unwrap();
            store
                .put_nodegroup(&NodeGroup::new(&cluster.id, "w", NodeGroupRole::Worker, 4))
                .unwrap();
        }

        let store = StateStore::open(&db_path).unwrap();
        let cluster = store.get_cluster(&cluster_id).unwrap().unwrap();
        assert_eq!(cluster.status, LifecycleStatus::RollbackFailed);
        assert_eq!(store.load_registry(&cluster_id).unwrap().worker_node_count(), 4);
    }

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_clusters().unwrap().is_empty());
        assert!(store.list_nodegroups_for_cluster("any").unwrap().is_empty());
        assert!(store.load_registry("any").unwrap().is_empty());
        assert!(store.get_cluster("nope").unwrap().is_none());
    }
}
