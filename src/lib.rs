//! hlsgate - Token-gated HLS media delivery
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod error;
pub mod gate;
pub mod paths;
pub mod playlist;
pub mod server;
pub mod store;
pub mod token;
pub mod transcode;
