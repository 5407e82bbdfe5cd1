//! Application services: picking, payload building, dispatch and follow-up delivery.

pub mod commands;
pub mod dispatcher;
pub mod embed;
pub mod error;
pub mod followup;
pub mod random;
pub mod reconciler;
pub mod render;
