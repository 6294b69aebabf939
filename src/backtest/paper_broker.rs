use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::execution::{Broker, Notification, OrderHandle, OrderStatus};
use crate::models::{Bar, OrderSide, Position};

/// Executed order as seen by the paper broker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub price: f64,
    pub size: u64,
}

/// Minimal single-instrument broker for driving strategies over history
///
/// Market orders fill at the open of the bar after submission. No
/// commission, slippage or leverage; a buy that costs more than the
/// available cash is margin-rejected.
#[derive(Debug)]
pub struct PaperBroker {
    cash: f64,
    units: u64,
    last_price: Option<f64>,
    working: Option<OrderHandle>,
    notifications: Vec<Notification>,
    fills: Vec<Fill>,
}

impl PaperBroker {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            units: 0,
            last_price: None,
            working: None,
            notifications: Vec::new(),
            fills: Vec::new(),
        }
    }

    /// Move to the next bar: execute the working order at the open, then
    /// mark the position at the close
    pub fn advance(&mut self, bar: &Bar) {
        if let Some(order) = self.working.take() {
            self.notify(order.id, OrderStatus::Accepted);
            self.execute(order, bar);
        }
        self.last_price = Some(bar.close);
    }

    fn execute(&mut self, order: OrderHandle, bar: &Bar) {
        let price = bar.open;
        let notional = price * order.size as f64;

        match order.side {
            OrderSide::Buy => {
                if notional > self.cash {
                    tracing::debug!(
                        "Buy of {} @ {:.2} needs {:.2}, only {:.2} cash",
                        order.size,
                        price,
                        notional,
                        self.cash
                    );
                    self.notify(order.id, OrderStatus::MarginRejected);
                    return;
                }
                self.cash -= notional;
                self.units += order.size;
            }
            OrderSide::Sell => {
                if order.size > self.units {
                    self.notify(order.id, OrderStatus::Rejected);
                    return;
                }
                self.cash += notional;
                self.units -= order.size;
            }
        }

        self.fills.push(Fill {
            order_id: order.id,
            timestamp: bar.timestamp,
            side: order.side,
            price,
            size: order.size,
        });
        self.notify(
            order.id,
            OrderStatus::Completed {
                price,
                size: order.size,
            },
        );
    }

    fn notify(&mut self, order_id: Uuid, status: OrderStatus) {
        self.notifications.push(Notification { order_id, status });
    }

    /// Notifications queued since the last drain, in order
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }
}

impl Broker for PaperBroker {
    fn submit_order(&mut self, side: OrderSide, size: u64) -> Result<OrderHandle> {
        if let Some(working) = &self.working {
            return Err(Error::Broker(format!(
                "order {} is still working",
                working.id
            )));
        }

        let handle = OrderHandle {
            id: Uuid::new_v4(),
            side,
            size,
        };
        self.notify(handle.id, OrderStatus::Submitted);

        if size == 0 || (side == OrderSide::Sell && size > self.units) {
            self.notify(handle.id, OrderStatus::Rejected);
        } else {
            self.working = Some(handle);
        }

        Ok(handle)
    }

    fn current_equity(&self) -> f64 {
        self.cash + self.units as f64 * self.last_price.unwrap_or(0.0)
    }

    fn current_position(&self) -> Position {
        if self.units == 0 {
            Position::Flat
        } else {
            Position::Long { size: self.units }
        }
    }
}
