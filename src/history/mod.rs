//! Rolling tick history
//!
//! Fixed-capacity, arrival-ordered window of recent ticks per symbol

mod buffer;

pub use buffer::HistoryBuffer;

/// Number of ticks kept per symbol unless configured otherwise
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;
