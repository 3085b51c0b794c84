//! Observability
//!
//! Resource usage sampling around the payload.

pub mod usage;
