//! Core business logic abstractions

pub mod aggregate;
pub mod config;
pub mod growth;
pub mod index;
pub mod log;
pub mod period;
pub mod record;
pub mod repair;

// Re-export main types for cleaner imports
pub use index::{Currency, PeriodIndex};
pub use period::{Period, Window};
pub use record::{Concept, Record, RecordKey};
