//! Recurrence engine: evaluation and textual codec for recurrence rules.
//!
//! # Responsibility
//! - Answer "does this item occur on this day" for events and habits.
//! - Persist rules as tagged text that round-trips exactly.
//!
//! # Invariants
//! - Evaluation matches every rule variant exhaustively; there is no default.

pub mod codec;
pub mod eval;

pub use codec::{
    decode_rule, decode_rule_or_today, encode_rule, today_local, try_decode_rule,
    RecurrenceDecodeError,
};
pub use eval::{
    completion_record, is_completed, local_date, occurrences_in_range, occurrences_in_range_in,
    occurs_on, occurs_on_date, occurs_on_in, Occurrences,
};
