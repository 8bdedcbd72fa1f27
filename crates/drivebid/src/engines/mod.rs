//! The two stateful engines layered over the CRUD surface.

pub mod auction;
pub mod verification;
