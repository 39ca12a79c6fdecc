//! redb table definitions for the nodeforge state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Shape shared by every table: string key, JSON bytes value.
pub type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Cluster records keyed by `{cluster_id}`.
pub const CLUSTERS: JsonTable = TableDefinition::new("clusters");

/// Nodegroup records keyed by `{cluster_id}:{nodegroup_id}`.
pub const NODEGROUPS: JsonTable = TableDefinition::new("nodegroups");
