//! Trellis Graph - Declarative resource graph
//!
//! Builds a validated, acyclic dependency graph from a [`StackSpec`] and
//! computes a deterministic topological order. Edges arise explicitly
//! (`depends_on`) or implicitly (a parameter references another node's
//! output); both are validated here, before any remote call is made.
//!
//! This crate is a pure transformation: no async, no I/O, no provider.
//!
//! [`StackSpec`]: trellis_types::StackSpec

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod graph;

// Re-exports
pub use error::ValidationError;
pub use graph::ResourceGraph;
