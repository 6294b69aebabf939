use super::{position_size, Strategy};
use crate::config::validate_target_percent;
use crate::error::Result;
use crate::execution::{Broker, Notification, OrderEvent, OrderHandle, OrderLifecycle};
use crate::models::{Bar, EquityPoint, OrderSide};

/// Buy-and-Hold baseline strategy
///
/// Used as a baseline to compare against the channel strategy.
///
/// Strategy:
/// - Buy `target_percent` of equity whenever flat with no order in flight
/// - Hold indefinitely (never sells)
#[derive(Debug)]
pub struct BuyAndHoldStrategy {
    target_percent: f64,
    lifecycle: OrderLifecycle,
    equity_curve: Vec<EquityPoint>,
}

impl BuyAndHoldStrategy {
    pub fn new(target_percent: f64) -> Result<Self> {
        validate_target_percent(target_percent)?;
        Ok(Self {
            target_percent,
            lifecycle: OrderLifecycle::new(),
            equity_curve: Vec::new(),
        })
    }
}

impl Strategy for BuyAndHoldStrategy {
    fn name(&self) -> &str {
        "BuyAndHold"
    }

    fn on_bar(&mut self, bar: &Bar, broker: &mut dyn Broker) -> Result<Option<OrderHandle>> {
        let equity = broker.current_equity();
        self.equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
        });

        if self.lifecycle.is_pending() || !broker.current_position().is_flat() {
            return Ok(None);
        }

        let size = position_size(equity, self.target_percent, bar.close)?;
        tracing::info!("Buying {} @ {:.2} and holding", size, bar.close);
        self.lifecycle
            .submit(broker, OrderSide::Buy, size)
            .map(Some)
    }

    fn on_notify(&mut self, notification: &Notification) -> Option<OrderEvent> {
        self.lifecycle.on_notify(notification)
    }

    fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }
}
