//! Order lifecycle state machine: at most one order in flight

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::execution::broker::Broker;
use crate::models::OrderSide;

/// Handle returned by the broker for a submitted order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    pub id: Uuid,
    pub side: OrderSide,
    pub size: u64,
}

/// Execution status reported by the broker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Received by the broker
    Submitted,
    /// Acknowledged and working
    Accepted,
    /// Completely filled
    Completed { price: f64, size: u64 },
    Canceled,
    /// Not enough cash or margin
    MarginRejected,
    Rejected,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "SUBMITTED"),
            Self::Accepted => write!(f, "ACCEPTED"),
            Self::Completed { .. } => write!(f, "COMPLETED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::MarginRejected => write!(f, "MARGIN"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Status update for a specific order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub order_id: Uuid,
    pub status: OrderStatus,
}

/// Why an order ended without a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    Canceled,
    MarginRejected,
    Rejected,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Canceled => write!(f, "canceled"),
            Self::MarginRejected => write!(f, "insufficient margin"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Terminal outcome of an order, emitted for logging and analytics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
    Filled {
        side: OrderSide,
        price: f64,
        size: u64,
    },
    Failed {
        side: OrderSide,
        reason: FailureReason,
    },
}

/// An order that has been submitted and not yet resolved
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub side: OrderSide,
    pub size: u64,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Submitted(Order),
}

#[derive(Debug, Default)]
pub struct OrderLifecycle {
    state: LifecycleState,
}

impl OrderLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, LifecycleState::Submitted(_))
    }

    pub fn pending_order(&self) -> Option<&Order> {
        match &self.state {
            LifecycleState::Submitted(order) => Some(order),
            LifecycleState::Idle => None,
        }
    }

    /// Submit an order through the broker
    ///
    /// Fails with `OrderAlreadyPending` while another order is in flight. A
    /// broker error leaves the lifecycle idle.
    pub fn submit(
        &mut self,
        broker: &mut dyn Broker,
        side: OrderSide,
        size: u64,
    ) -> Result<OrderHandle> {
        if let LifecycleState::Submitted(order) = &self.state {
            return Err(Error::OrderAlreadyPending { order_id: order.id });
        }

        let handle = broker.submit_order(side, size)?;
        tracing::info!("Submitted {} order {} for {} units", side, handle.id, size);

        self.state = LifecycleState::Submitted(Order {
            id: handle.id,
            side: handle.side,
            size: handle.size,
            status: OrderStatus::Submitted,
        });

        Ok(handle)
    }

    /// Apply an execution notification
    ///
    /// Returns an event when the in-flight order reached a terminal state.
    pub fn on_notify(&mut self, notification: &Notification) -> Option<OrderEvent> {
        let order = match &mut self.state {
            LifecycleState::Submitted(order) => order,
            LifecycleState::Idle => {
                tracing::warn!(
                    "Ignoring {} notification for order {}: no order in flight",
                    notification.status,
                    notification.order_id
                );
                return None;
            }
        };

        if order.id != notification.order_id {
            tracing::warn!(
                "Ignoring {} notification for order {}: in-flight order is {}",
                notification.status,
                notification.order_id,
                order.id
            );
            return None;
        }

        let side = order.side;
        let event = match notification.status {
            OrderStatus::Submitted | OrderStatus::Accepted => {
                order.status = notification.status;
                return None;
            }
            OrderStatus::Completed { price, size } => {
                tracing::info!("{} order filled: price={:.2}, size={}", side, price, size);
                OrderEvent::Filled { side, price, size }
            }
            OrderStatus::Canceled => Self::failed(side, FailureReason::Canceled),
            OrderStatus::MarginRejected => Self::failed(side, FailureReason::MarginRejected),
            OrderStatus::Rejected => Self::failed(side, FailureReason::Rejected),
        };

        self.state = LifecycleState::Idle;
        Some(event)
    }

    fn failed(side: OrderSide, reason: FailureReason) -> OrderEvent {
        tracing::warn!("{} order failed: {}", side, reason);
        OrderEvent::Failed { side, reason }
    }
}
