//! Core types and error definitions for the cyberops orchestrator.
//!
//! This crate provides the foundational types shared across all cyberops
//! crates: the error taxonomy used by agents, the Decision Oracle and the
//! scheduler, plus the risk scale attached to registry tools.
//!
//! # Main types
//!
//! - [`CyberopsError`]: Unified error enum for all cyberops subsystems.
//! - [`CyberopsResult`]: Convenience alias for `Result<T, CyberopsError>`.
//! - [`RiskLevel`]: Risk classification of a security tool.

/// Error taxonomy.
pub mod error;
/// Risk classification shared by the tool registry and agents.
pub mod risk;

pub use error::{CyberopsError, CyberopsResult};
pub use risk::RiskLevel;
