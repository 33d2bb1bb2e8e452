//! Domain model for scheduled items and their recurrence rules.
//!
//! # Responsibility
//! - Define canonical data structures shared by the engines and repositories.
//!
//! # Invariants
//! - Recurrence parameters are validated when a rule is constructed, never
//!   inside evaluation.

pub mod recurrence;
pub mod schedule;
