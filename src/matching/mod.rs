pub mod engine;

pub use engine::{match_order, resting_entry_for, Fill, MatchOutcome};
