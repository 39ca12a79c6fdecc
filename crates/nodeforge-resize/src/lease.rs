//! Per-cluster leases: at most one in-flight operation per cluster.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use nodeforge_state::ClusterId;

/// The set of clusters that currently have an operation in flight.
#[derive(Debug, Clone, Default)]
pub struct ClusterLeases {
    held: Arc<Mutex<HashSet<ClusterId>>>,
}

impl ClusterLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease for `cluster_id`, or `None` if someone holds it.
    ///
    /// Never waits: a busy cluster is reported, not queued.
    pub fn try_acquire(&self, cluster_id: &str) -> Option<ClusterLease> {
        let mut held = self.lock();
        if !held.insert(cluster_id.to_string()) {
            return None;
        }
        debug!(%cluster_id, "cluster lease acquired");
        Some(ClusterLease {
            cluster_id: cluster_id.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, cluster_id: &str) -> bool {
        self.lock().contains(cluster_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ClusterId>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof of exclusive access to a cluster. Released on drop.
#[derive(Debug)]
pub struct ClusterLease {
    cluster_id: ClusterId,
    held: Arc<Mutex<HashSet<ClusterId>>>,
}

impl Drop for ClusterLease {
    fn drop(&mut self) {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.cluster_id);
        debug!(cluster_id = %self.cluster_id, "cluster lease released");
    }
}
