//! Temporal aggregation over dated items.
//!
//! # Responsibility
//! - Classify items into buckets relative to `now`.
//! - Format countdown and due labels.
//! - Filter, order and truncate item lists for display.
//! - Select the nearest pending item and drive countdown refreshes.
//!
//! # Invariants
//! - Everything here except `ticker` is a pure function of its inputs;
//!   `now` is always passed in, never read from the clock.

pub mod bucket;
pub mod calendar;
pub mod countdown;
pub mod filter;
pub mod nearest;
pub mod ticker;

pub use bucket::{classify, Bucket};
pub use countdown::{countdown_label, due_label, format_countdown, CountdownTarget};
pub use filter::{filter_items, FilterConfig, ItemView};
pub use nearest::nearest_pending;
pub use ticker::CountdownTicker;
