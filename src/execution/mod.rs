// Order execution module
pub mod broker;
pub mod order;

pub use broker::Broker;
pub use order::{
    FailureReason, LifecycleState, Notification, Order, OrderEvent, OrderHandle, OrderLifecycle,
    OrderStatus,
};
