//! Trellis Engine - Dependency-ordered provisioning
//!
//! The executor walks a validated [`ResourceGraph`] forward (apply) or
//! backward (destroy), calling one provider adapter per node, resolving
//! cross-node references lazily, and containing failures so a partial outage
//! never cascades into destroying already-provisioned infrastructure.
//!
//! ## Key Concepts
//!
//! - **Executor**: per-node state machine driven by dependency completion
//! - **ShadowStateStore**: local record of what is already materialized
//!   remotely, keyed by node id - the source of idempotent convergence
//! - **Output propagation**: references resolve immediately before a node's
//!   create/update call, never at graph-build time
//! - **Forward-only convergence**: failures propagate along forward edges as
//!   skips; nothing already created is rolled back
//!
//! ## Architectural Boundaries
//!
//! - `trellis-graph` owns: validation, ordering, reachability
//! - `trellis-provider` owns: the control-plane verbs per resource kind
//! - `trellis-engine` owns: sequencing, retries, shadow state, reporting
//!
//! [`ResourceGraph`]: trellis_graph::ResourceGraph

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod propagator;
pub mod report;
pub mod retry;
pub mod state_store;

// Re-exports
pub use error::{EngineError, Result};
pub use executor::{ApplyOptions, DestroyOptions, Executor};
pub use fingerprint::fingerprint;
pub use propagator::{absent_outputs, resolve_node_params, RunOutputs};
pub use report::{ApplyReport, DestroyReport, NodeAction, NodeOutcome};
pub use retry::RetryPolicy;
pub use state_store::{
    FileShadowStore, InMemoryShadowStore, ShadowStateStore, StateStoreError,
};
