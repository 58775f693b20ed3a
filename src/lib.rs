//! Keeps a synthetic flight warehouse mirrored across two SQL engines.
//!
//! Rows are generated against the reference dimensions both engines share,
//! written to both engines as a saga, and removed again newest first. See
//! [`coordinator`] for the cross-engine guarantees.

pub mod allocator;
pub mod check;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod engine;
pub mod error;
pub mod schema;
pub mod synth;

pub use error::{MirrorError, Result};
