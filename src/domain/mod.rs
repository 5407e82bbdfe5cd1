//! Domain layer types and invariants.

pub mod catalog;
pub mod error;
pub mod fortune;
pub mod interaction;
pub mod payload;
