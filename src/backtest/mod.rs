pub mod metrics;
pub mod paper_broker;
pub mod runner;
pub mod synthetic;

pub use metrics::{BacktestMetrics, TradeRecord};
pub use paper_broker::{Fill, PaperBroker};
pub use runner::BacktestRunner;
pub use synthetic::{MarketScenario, SyntheticDataGenerator};
