//! rowpipe Server
//!
//! Startup wiring for the `rowpipe` daemon: builds the storage connection
//! pool, starts the lanes, binds the UDP listener and spawns the background
//! reporter and optional metrics endpoint.

pub mod config;
pub mod startup;

pub use config::Config;
pub use startup::{start, Server};
