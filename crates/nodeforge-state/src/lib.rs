//! nodeforge-state — persisted view of clusters and their nodegroups.
//!
//! Backed by [redb](https://docs.rs/redb). Clusters and nodegroups are
//! JSON-serialized into `&[u8]` value columns. Nodegroups use the composite
//! key `{cluster_id}:{nodegroup_id}` so a prefix scan yields one cluster's
//! groups.
//!
//! The [`NodeGroupRegistry`] is the read-only, in-memory view of a single
//! cluster's nodegroups that the resize engine reasons over.
//!
//! `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod registry;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use registry::NodeGroupRegistry;
pub use store::StateStore;
pub use types::*;
