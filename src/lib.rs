// ABOUTME: Library root for bluegreen - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod jobs;
pub mod model;
pub mod output;
pub mod rds;
pub mod ssh;
pub mod tasks;
pub mod types;
pub mod wait;
