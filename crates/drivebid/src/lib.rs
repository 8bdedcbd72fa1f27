//! Core engines for the vehicle marketplace backend: live auction bidding and
//! the user verification workflow, layered over abstract store, vault, and
//! identity capabilities so adapters can be swapped per deployment.

pub mod config;
pub mod directory;
pub mod engines;
pub mod error;
pub mod identity;
pub mod telemetry;
