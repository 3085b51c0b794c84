//! Judge adapters.
//!
//! The runtime core stays interpreter-agnostic. An adapter knows how to launch
//! its interpreter with the bootstrap that evaluates a submission and applies
//! the entry-point contract; the payload talks back through [`report`].

pub mod adapter;
pub mod languages;
pub mod report;

pub use adapter::InterpreterAdapter;

/// Descriptor on which the payload finds the submission text
pub const SOURCE_FD: i32 = 3;

/// Descriptor on which the payload writes its failure report
pub const REPORT_FD: i32 = 4;
