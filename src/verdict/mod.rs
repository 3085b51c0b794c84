//! Verdict classification
//!
//! Derives the run result as a pure function over the observed evidence.

pub mod verdict;

pub use verdict::{Evidence, VerdictClassifier, WaitOutcome};
