//! Core infrastructure for apicheck.
//!
//! This crate provides the language-agnostic API model and checker:
//! - Type references, type parameters and erasure
//! - Type, member and package units owned by a single registry
//! - Graph registration, reference resolution and freezing
//! - Visibility verdicts and suppression directives
//! - Hierarchy flattening across hidden ancestors
//! - Override resolution
//! - Compatibility checks and the diagnostic taxonomy
//! - Error types and JSON output types for driver responses

pub mod compat;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod model;
pub mod output;
pub mod overrides;
pub mod signature;
pub mod types;
pub mod unit;
pub mod visibility;

pub use compat::{CheckOptions, CompatChecker, Diagnostic, DiagnosticKind, Severity};
pub use error::{ApiError, OutputErrorCode};
pub use graph::ApiGraph;
pub use model::ApiModel;
pub use visibility::{ShowLevel, VisibilityPolicy};
