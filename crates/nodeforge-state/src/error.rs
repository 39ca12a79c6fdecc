//! Errors raised while reading or persisting cluster state.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

/// Failures of the redb-backed cluster store.
///
/// The storage variants carry the underlying redb message; callers only
/// ever report them, so the source error is not kept.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot open cluster state database: {0}")]
    Open(String),

    #[error("cluster state transaction failed: {0}")]
    Transaction(String),

    #[error("cluster state table unavailable: {0}")]
    Table(String),

    #[error("reading cluster state failed: {0}")]
    Read(String),

    #[error("writing cluster state failed: {0}")]
    Write(String),

    #[error("cannot encode cluster record: {0}")]
    Serialize(String),

    #[error("corrupt cluster record: {0}")]
    Deserialize(String),

    /// A record the caller relied on has disappeared.
    #[error("{0} is no longer in the cluster store")]
    NotFound(String),

    /// Lifecycle writes always pair a cluster with one of its own nodegroups.
    #[error("nodegroup {nodegroup} belongs to cluster {owner}, not {cluster}")]
    ForeignNodeGroup {
        nodegroup: String,
        owner: String,
        cluster: String,
    },
}
