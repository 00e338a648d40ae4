//! CLI command handlers.

pub mod config;
pub mod graph;
pub mod route;
pub mod select;
