//! Core data types for the station dashboard
//!
//! This crate provides the normalized reading model, the credential
//! format shared with the station API, and the card layout defaults.

pub mod cards;
pub mod credentials;
pub mod schedule;
pub mod types;
pub mod units;

pub use cards::*;
pub use credentials::*;
pub use schedule::*;
pub use types::*;
