//! Decision Oracle client for cyberops agents.
//!
//! Agents hand a prompt to the oracle and get back a structured JSON
//! decision. The remote service answers in free text that is expected to
//! contain a JSON document, optionally wrapped in a markdown code fence.
//!
//! # Main types
//!
//! - [`DecisionOracle`]: Backend trait (Gemini, or a test double).
//! - [`OracleClient`]: Dispatches to the configured backend and parses answers.
//! - [`OracleConfig`]: Provider, model and credentials.
//! - [`FileReference`]: Auxiliary file handed to the oracle for extra context.

pub mod backends;
pub mod client;
pub mod config;
pub mod parse;

pub use backends::{DecisionOracle, FileReference};
pub use client::OracleClient;
pub use config::{OracleConfig, OracleProvider};
pub use parse::{decision_as, parse_decision, strip_code_fence};
