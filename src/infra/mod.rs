//! Infrastructure adapters and runtime bootstrap.

pub mod artifacts;
pub mod assets;
pub mod discord;
pub mod error;
pub mod http;
pub mod render;
pub mod telemetry;
