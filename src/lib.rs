//! apicheck: API surface modeling and binary compatibility checking
//!
//! Builds a model of a Java-style API from JSON snapshots, flattens it the
//! way clients see it, and reports every incompatible change between a
//! released baseline and a candidate.

// Core infrastructure - re-exported from apicheck-core
pub use apicheck_core::compat;
pub use apicheck_core::error;
pub use apicheck_core::graph;
pub use apicheck_core::hierarchy;
pub use apicheck_core::model;
pub use apicheck_core::output;
pub use apicheck_core::overrides;
pub use apicheck_core::signature;
pub use apicheck_core::types;
pub use apicheck_core::unit;
pub use apicheck_core::visibility;

// Snapshot format and driver configuration
pub mod config;
pub mod snapshot;

// Front door
pub mod cli;
