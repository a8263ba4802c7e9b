//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Cache management (clear, stats)
//! - [`config`] - Configuration management (path, init, show)
//! - [`fetch`] - Fetch one extent into a PNG

pub mod cache;
pub mod config;
pub mod fetch;
