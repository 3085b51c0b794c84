//! Utilities
//!
//! Cross-cutting utilities for environment and FD hygiene and result output.

pub mod env_hygiene;
pub mod fd_closure;
pub mod json_schema;
pub mod output;
