//! Station dashboard daemon
//!
//! This crate coordinates:
//! - Periodic polling of the station account
//! - Reading history upkeep
//! - Report and metrics export

pub mod export;
pub mod poller;

pub use export::*;
pub use poller::*;
