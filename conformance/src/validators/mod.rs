//! Conformance validators. Each returns a [`ConformanceReport`](crate::ConformanceReport)
//! with one result per check.

pub mod determinism;
pub mod equivalence;
pub mod matrix;
pub mod naming;
