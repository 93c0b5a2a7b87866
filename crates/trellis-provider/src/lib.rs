//! Trellis Provider - Control-plane bindings
//!
//! This crate provides the provider infrastructure for Trellis:
//!
//! - **ProviderAdapter**: Per-resource-kind binding to the remote control
//!   plane's Create/Update/Delete verbs
//! - **ProviderRegistry**: Kind-to-adapter lookup used by the executor
//! - **InMemoryControlPlane**: Simulated platform for development and testing
//! - **mock**: Scripted adapters with call logging for engine tests
//!
//! ## In-Memory vs Remote
//!
//! The crate ships an in-memory simulated control plane suitable for
//! development and testing. Bindings to a real remote platform implement the
//! same [`ProviderAdapter`] trait out of tree.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod adapter;
pub mod error;
pub mod memory;
pub mod mock;

// Re-exports
pub use adapter::{CreatedResource, ProviderAdapter, ProviderRegistry, ResolvedParams};
pub use error::{ProviderError, Result};
pub use memory::InMemoryControlPlane;
