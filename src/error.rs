use thiserror::Error;
use uuid::Uuid;

/// Main error type for the VWAP channel bot
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Invalid bar: {0}")]
    InvalidBar(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Order execution errors
    #[error("Order {order_id} is still pending")]
    OrderAlreadyPending { order_id: Uuid },

    #[error("Broker refused order: {0}")]
    Broker(String),

    // Driver errors
    #[error("Backtest error: {0}")]
    Backtest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
