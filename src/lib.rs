//! SPINDECK — slot machine client
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod engine;
pub mod outcome;
pub mod presentation;
pub mod input;
