//! Capability registry: the named security tools each agent type claims.
//!
//! The registry is descriptive only. Agents consult it to label their audit
//! records; nothing in cyberops ever runs these tools.

pub mod catalog;
pub mod registry;
pub mod tool;

pub use catalog::register_builtin_catalog;
pub use registry::ToolRegistry;
pub use tool::{ToolCategory, ToolDescriptor};
