// Trading strategy module
pub mod buy_and_hold;
pub mod decision;
pub mod vwap_channel;

pub use buy_and_hold::BuyAndHoldStrategy;
pub use decision::TradeDecisionLoop;
pub use vwap_channel::VwapChannelStrategy;

use crate::error::{Error, Result};
use crate::execution::{Broker, Notification, OrderEvent, OrderHandle};
use crate::models::{Bar, EquityPoint};

/// Base trait for all trading strategies
///
/// A driver calls `on_notify` for every pending broker notification and then
/// `on_bar` once per bar, strictly in arrival order.
pub trait Strategy {
    /// Get strategy name
    fn name(&self) -> &str;

    /// Process one bar, possibly submitting an order
    fn on_bar(&mut self, bar: &Bar, broker: &mut dyn Broker) -> Result<Option<OrderHandle>>;

    /// Apply an execution notification for the in-flight order
    fn on_notify(&mut self, notification: &Notification) -> Option<OrderEvent>;

    /// Equity observed at the start of every processed bar
    fn equity_curve(&self) -> &[EquityPoint];
}

/// Units to buy when committing `target_percent` of `equity` at `price`
///
/// Always at least one unit.
pub fn position_size(equity: f64, target_percent: f64, price: f64) -> Result<u64> {
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::InvalidBar(format!(
            "cannot size a position at price {}",
            price
        )));
    }

    let units = (equity * target_percent / price).floor();
    if !units.is_finite() || units < 1.0 {
        return Ok(1);
    }

    Ok(units as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_size() {
        // 10000 * 0.95 / 100 = 95
        assert_eq!(position_size(10_000.0, 0.95, 100.0).unwrap(), 95);
        // Floors fractional units
        assert_eq!(position_size(10_000.0, 0.95, 99.0).unwrap(), 95);
    }

    #[test]
    fn test_position_size_minimum_one() {
        assert_eq!(position_size(50.0, 0.5, 100.0).unwrap(), 1);
        assert_eq!(position_size(-500.0, 0.5, 100.0).unwrap(), 1);
    }

    #[test]
    fn test_position_size_rejects_bad_price() {
        assert!(position_size(10_000.0, 0.95, 0.0).is_err());
        assert!(position_size(10_000.0, 0.95, -3.0).is_err());
    }
}
