pub mod cli;
pub mod config;
pub mod error;
pub mod init;
pub mod models;
pub mod services;
pub mod utils;
pub mod workers;

pub use error::MnemosError;
