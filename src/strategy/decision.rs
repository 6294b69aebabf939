use crate::config::validate_target_percent;
use crate::error::Result;
use crate::execution::{Broker, Notification, OrderEvent, OrderHandle, OrderLifecycle};
use crate::models::{Bar, ChannelState, EquityPoint, OrderSide, Position, Signal};

use super::position_size;

/// Channel-crossing rule
///
/// - Flat and close below the lower band: Buy
/// - Long and close above the upper band: Sell
/// - Anything else: Hold
pub fn decide(close: f64, channel: &ChannelState, position: Position) -> Signal {
    match position {
        Position::Flat if close < channel.lower => Signal::Buy,
        Position::Long { .. } if close > channel.upper => Signal::Sell,
        _ => Signal::Hold,
    }
}

/// Turns channel crossings into orders, one order in flight at a time
#[derive(Debug)]
pub struct TradeDecisionLoop {
    target_percent: f64,
    position: Position,
    lifecycle: OrderLifecycle,
    equity_curve: Vec<EquityPoint>,
    // Average entry price and size of the open position
    entry: Option<(f64, u64)>,
    realized_pnl: f64,
}

impl TradeDecisionLoop {
    pub fn new(target_percent: f64) -> Result<Self> {
        validate_target_percent(target_percent)?;
        Ok(Self {
            target_percent,
            position: Position::Flat,
            lifecycle: OrderLifecycle::new(),
            equity_curve: Vec::new(),
            entry: None,
            realized_pnl: 0.0,
        })
    }

    pub fn on_bar(
        &mut self,
        bar: &Bar,
        channel: &ChannelState,
        broker: &mut dyn Broker,
    ) -> Result<Option<OrderHandle>> {
        // Snapshot before anything submitted this bar can fill
        let equity = broker.current_equity();
        self.position = broker.current_position();
        self.equity_curve.push(EquityPoint {
            timestamp: bar.timestamp,
            equity,
        });

        if let Some(order) = self.lifecycle.pending_order() {
            tracing::debug!("Order {} still in flight, skipping bar", order.id);
            return Ok(None);
        }

        match decide(bar.close, channel, self.position) {
            Signal::Buy => {
                let size = position_size(equity, self.target_percent, bar.close)?;
                tracing::info!(
                    "Close {:.2} below lower band {:.2}, buying {}",
                    bar.close,
                    channel.lower,
                    size
                );
                self.lifecycle
                    .submit(broker, OrderSide::Buy, size)
                    .map(Some)
            }
            Signal::Sell => {
                tracing::info!(
                    "Close {:.2} above upper band {:.2}, selling {}",
                    bar.close,
                    channel.upper,
                    self.position.size()
                );
                self.lifecycle
                    .submit(broker, OrderSide::Sell, self.position.size())
                    .map(Some)
            }
            Signal::Hold => Ok(None),
        }
    }

    pub fn on_notify(&mut self, notification: &Notification) -> Option<OrderEvent> {
        let event = self.lifecycle.on_notify(notification);
        if let Some(OrderEvent::Filled { side, price, size }) = event {
            self.record_fill(side, price, size);
        }
        event
    }

    fn record_fill(&mut self, side: OrderSide, price: f64, size: u64) {
        match side {
            OrderSide::Buy => {
                self.entry = Some(match self.entry {
                    Some((entry_price, entry_size)) => {
                        let total = entry_size + size;
                        let avg = (entry_price * entry_size as f64 + price * size as f64)
                            / total as f64;
                        (avg, total)
                    }
                    None => (price, size),
                });
            }
            OrderSide::Sell => {
                let Some((entry_price, entry_size)) = self.entry.take() else {
                    tracing::warn!("Sell fill of {} units with no recorded entry", size);
                    return;
                };

                let pnl = (price - entry_price) * size as f64;
                self.realized_pnl += pnl;
                tracing::info!(
                    "Trade closed: entry={:.2}, exit={:.2}, size={}, gross PnL={:.2}",
                    entry_price,
                    price,
                    size,
                    pnl
                );

                if size < entry_size {
                    self.entry = Some((entry_price, entry_size - size));
                }
            }
        }
    }

    /// Position observed at the start of the latest bar
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn lifecycle(&self) -> &OrderLifecycle {
        &self.lifecycle
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn target_percent(&self) -> f64 {
        self.target_percent
    }

    /// Gross PnL summed over every closed trade
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::execution::OrderStatus;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    struct StubBroker {
        equity: f64,
        position: Position,
        orders: Vec<OrderHandle>,
    }

    impl StubBroker {
        fn new(equity: f64, position: Position) -> Self {
            Self {
                equity,
                position,
                orders: Vec::new(),
            }
        }
    }

    impl Broker for StubBroker {
        fn submit_order(&mut self, side: OrderSide, size: u64) -> Result<OrderHandle> {
            let handle = OrderHandle {
                id: Uuid::new_v4(),
                side,
                size,
            };
            self.orders.push(handle);
            Ok(handle)
        }

        fn current_equity(&self) -> f64 {
            self.equity
        }

        fn current_position(&self) -> Position {
            self.position
        }
    }

    fn bar_at(minute: i64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()
                + Duration::minutes(minute),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
        }
    }

    fn channel(lower: f64, upper: f64) -> ChannelState {
        ChannelState {
            vwap: (lower + upper) / 2.0,
            upper,
            lower,
        }
    }

    #[test]
    fn test_decide() {
        let ch = channel(95.0, 105.0);
        assert_eq!(decide(94.0, &ch, Position::Flat), Signal::Buy);
        assert_eq!(decide(95.0, &ch, Position::Flat), Signal::Hold);
        assert_eq!(decide(110.0, &ch, Position::Flat), Signal::Hold);
        assert_eq!(decide(106.0, &ch, Position::Long { size: 3 }), Signal::Sell);
        assert_eq!(decide(105.0, &ch, Position::Long { size: 3 }), Signal::Hold);
        assert_eq!(decide(90.0, &ch, Position::Long { size: 3 }), Signal::Hold);
    }

    #[test]
    fn test_invalid_target_percent() {
        assert!(matches!(
            TradeDecisionLoop::new(0.0),
            Err(Error::InvalidConfig(_))
        ));
        assert!(TradeDecisionLoop::new(1.01).is_err());
    }

    #[test]
    fn test_entry_sizes_from_equity() {
        let mut broker = StubBroker::new(10_000.0, Position::Flat);
        let mut lp = TradeDecisionLoop::new(0.95).unwrap();

        let handle = lp
            .on_bar(&bar_at(0, 90.0), &channel(95.0, 105.0), &mut broker)
            .unwrap()
            .expect("should buy below the lower band");

        assert_eq!(handle.side, OrderSide::Buy);
        // floor(10000 * 0.95 / 90) = 105
        assert_eq!(handle.size, 105);
        assert!(lp.lifecycle().is_pending());
    }

    #[test]
    fn test_exit_sells_full_position() {
        let mut broker = StubBroker::new(10_000.0, Position::Long { size: 42 });
        let mut lp = TradeDecisionLoop::new(0.5).unwrap();

        let handle = lp
            .on_bar(&bar_at(0, 110.0), &channel(95.0, 105.0), &mut broker)
            .unwrap()
            .unwrap();

        assert_eq!(handle.side, OrderSide::Sell);
        assert_eq!(handle.size, 42);
    }

    #[test]
    fn test_no_action_while_order_in_flight() {
        let mut broker = StubBroker::new(10_000.0, Position::Flat);
        let mut lp = TradeDecisionLoop::new(0.95).unwrap();
        let ch = channel(95.0, 105.0);

        lp.on_bar(&bar_at(0, 90.0), &ch, &mut broker).unwrap();
        let second = lp.on_bar(&bar_at(1, 80.0), &ch, &mut broker).unwrap();

        assert!(second.is_none());
        assert_eq!(broker.orders.len(), 1);
    }

    #[test]
    fn test_failed_order_allows_new_entry_next_bar() {
        let mut broker = StubBroker::new(10_000.0, Position::Flat);
        let mut lp = TradeDecisionLoop::new(0.95).unwrap();
        let ch = channel(95.0, 105.0);

        let first = lp.on_bar(&bar_at(0, 90.0), &ch, &mut broker).unwrap().unwrap();
        let event = lp.on_notify(&Notification {
            order_id: first.id,
            status: OrderStatus::MarginRejected,
        });
        assert!(matches!(event, Some(OrderEvent::Failed { .. })));

        let second = lp.on_bar(&bar_at(1, 90.0), &ch, &mut broker).unwrap();
        assert!(second.is_some());
        assert_eq!(broker.orders.len(), 2);
    }

    #[test]
    fn test_equity_recorded_every_bar() {
        let mut broker = StubBroker::new(10_000.0, Position::Flat);
        let mut lp = TradeDecisionLoop::new(0.95).unwrap();
        let ch = channel(95.0, 105.0);

        // Hold, buy, in flight
        lp.on_bar(&bar_at(0, 100.0), &ch, &mut broker).unwrap();
        lp.on_bar(&bar_at(1, 90.0), &ch, &mut broker).unwrap();
        broker.equity = 9_900.0;
        lp.on_bar(&bar_at(2, 91.0), &ch, &mut broker).unwrap();

        let curve = lp.equity_curve();
        assert_eq!(curve.len(), 3);
        assert_eq!(curve[0].equity, 10_000.0);
        assert_eq!(curve[1].equity, 10_000.0);
        assert_eq!(curve[2].equity, 9_900.0);
        assert_eq!(curve[2].timestamp, bar_at(2, 91.0).timestamp);
    }

    fn fill(handle: &OrderHandle, price: f64) -> Notification {
        Notification {
            order_id: handle.id,
            status: OrderStatus::Completed {
                price,
                size: handle.size,
            },
        }
    }

    #[test]
    fn test_closed_trade_realizes_gross_pnl() {
        let mut broker = StubBroker::new(10_000.0, Position::Flat);
        let mut lp = TradeDecisionLoop::new(0.5).unwrap();
        assert_eq!(lp.target_percent(), 0.5);
        let ch = channel(95.0, 105.0);

        // floor(10000 * 0.5 / 90) = 55
        let buy = lp.on_bar(&bar_at(0, 90.0), &ch, &mut broker).unwrap().unwrap();
        lp.on_notify(&fill(&buy, 91.0));
        assert_eq!(lp.realized_pnl(), 0.0);

        broker.position = Position::Long { size: buy.size };
        let sell = lp.on_bar(&bar_at(1, 110.0), &ch, &mut broker).unwrap().unwrap();
        assert_eq!(sell.size, 55);

        let event = lp.on_notify(&fill(&sell, 108.0));
        assert!(matches!(event, Some(OrderEvent::Filled { side: OrderSide::Sell, .. })));
        assert!((lp.realized_pnl() - (108.0 - 91.0) * 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_sell_realizes_nothing() {
        let mut broker = StubBroker::new(10_000.0, Position::Long { size: 10 });
        let mut lp = TradeDecisionLoop::new(0.95).unwrap();

        let sell = lp
            .on_bar(&bar_at(0, 110.0), &channel(95.0, 105.0), &mut broker)
            .unwrap()
            .unwrap();
        lp.on_notify(&Notification {
            order_id: sell.id,
            status: OrderStatus::Rejected,
        });

        assert_eq!(lp.realized_pnl(), 0.0);
    }
}
