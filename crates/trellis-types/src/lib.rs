//! Trellis Types - Core types for agent-network provisioning
//!
//! Trellis provisions a small network of interdependent remote agent objects
//! (a coordinating agent, specialist collaborators, knowledge stores, tool
//! groups, capability toggles, publish steps, aliases) through a control
//! plane that only exposes flat create/update/delete verbs.
//!
//! ## Key Concepts
//!
//! - **StackSpec**: Ordered declaration of everything to provision
//! - **NodeDecl**: A single declared remote object (kind + parameters + edges)
//! - **ParamValue**: A literal value or a reference to another node's output
//! - **NodeState**: Per-node lifecycle driven by the executor's state machine
//! - **PhysicalResource**: The platform's view of a materialized node
//! - **Events**: Unified observability stream emitted during apply/destroy

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod events;
pub mod ids;
pub mod node;
pub mod spec;
pub mod state;

// Re-export main types
pub use events::{EngineEvent, EngineEventEnvelope};
pub use ids::{GroupId, NodeId};
pub use node::{NodeDecl, NodeKind, OutputRef, ParamValue};
pub use spec::{SpecValidationError, StackSpec};
pub use state::{NodeState, OutputValue, PhysicalResource};
