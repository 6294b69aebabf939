use crate::error::Result;
use crate::execution::order::OrderHandle;
use crate::models::{OrderSide, Position};

/// Broker capability consumed by the trading core
///
/// Submission is fire-and-forget: outcomes arrive later as
/// [`Notification`](crate::execution::order::Notification)s, never
/// synchronously from `submit_order`.
pub trait Broker {
    /// Place a market order
    fn submit_order(&mut self, side: OrderSide, size: u64) -> Result<OrderHandle>;

    /// Total portfolio value (cash plus marked position)
    fn current_equity(&self) -> f64;

    fn current_position(&self) -> Position;
}
