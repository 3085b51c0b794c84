//! Thin wrappers around Linux kernel primitives.
//!
//! All `unsafe` code is concentrated here with explicit SAFETY comments.

pub mod memfd;
pub mod rlimit;
pub mod signal;
