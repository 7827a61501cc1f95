pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod maze;
pub mod rng;
pub mod server_protocol;
pub mod server_utils;
pub mod telemetry;
pub mod types;
