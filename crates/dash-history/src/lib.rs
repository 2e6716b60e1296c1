//! Local reading history
//!
//! Keeps a bounded, time-deduplicated series of readings built from
//! periodic polls, and derives chart series and reports from it.

pub mod cache;
pub mod projector;
pub mod report;

pub use cache::*;
pub use projector::*;
pub use report::*;
