//! Claim verification against the budget context.

pub mod consistency;
pub mod constraint;

pub use constraint::{ConstraintVerifier, Verdict};
