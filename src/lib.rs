//! Discord interactions bot that answers `/fortune` with a freshly rendered fortune card.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
