//! nodeforge-resize — the cluster scaling orchestration engine.
//!
//! Turns a declarative request ("this nodegroup should have N nodes") into
//! one asynchronous operation against an infrastructure backend, and folds
//! the backend's verdict back into persisted cluster and nodegroup state.
//!
//! # Flow
//!
//! ```text
//! Conductor::resize(cluster_id, ScalingRequest)
//!   ├── resolver::resolve    pick the target nodegroup (default worker if omitted)
//!   ├── Validator::validate  role + min/max bounds
//!   ├── planner::plan        signed delta, nodes to remove
//!   ├── ClusterLeases        one in-flight operation per cluster
//!   ├── lifecycle            stable → update_in_progress (persisted)
//!   └── tokio::spawn ──► InfraBackend::resize ──► completion
//!                              │ failure + rollback
//!                              └──► InfraBackend::rollback
//! ```
//!
//! The caller gets an [`Accepted`] back as soon as the operation is
//! dispatched; the backend outcome is only visible through the persisted
//! status (or by awaiting [`Accepted::wait`]).

pub mod backend;
pub mod conductor;
pub mod config;
pub mod error;
pub mod lease;
pub mod lifecycle;
pub mod planner;
pub mod request;
pub mod resolver;
pub mod simulated;
pub mod validator;

pub use backend::{BackendError, DispatchRequest, InfraBackend, ProvisionReport, TimeoutBackend};
pub use conductor::Conductor;
pub use config::ResizeConfig;
pub use error::{PlanError, ResizeError, ResizeResult, ResolveError, ValidationError};
pub use lease::{ClusterLease, ClusterLeases};
pub use lifecycle::{Lifecycle, LifecycleEvent, TransitionError};
pub use planner::{ScaleDirection, ScalingPlan};
pub use request::{Accepted, CompletionReport, ScalingOutcome, ScalingRequest};
pub use simulated::{SimulatedBackend, SimulatedConfig};
pub use validator::Validator;
