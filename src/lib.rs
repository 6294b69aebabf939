// Core modules
pub mod backtest;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::*;
pub use strategy::Strategy;
