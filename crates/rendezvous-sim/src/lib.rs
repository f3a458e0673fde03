//! Headless simulator for a collaborative meeting session.
//!
//! Seeds an in-memory hub with venues, runs a host and several participant
//! clients through join, search, vote and publish, and reports the final
//! meeting area, candidate order and tallies.

mod config;
mod error;
mod simulation;

pub use config::SimConfig;
pub use error::{Error, Result};
pub use simulation::{run, SimReport};
