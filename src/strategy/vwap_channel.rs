use super::decision::TradeDecisionLoop;
use super::Strategy;
use crate::config::StrategyConfig;
use crate::error::Result;
use crate::execution::{Broker, Notification, OrderEvent, OrderHandle};
use crate::indicators::WindowedVwap;
use crate::models::{Bar, ChannelState, EquityPoint};

/// VWAP channel mean-reversion strategy
///
/// Strategy:
/// - Buy when the close drops below the lower VWAP band while flat
/// - Sell the whole position when the close rises above the upper band
/// - One order in flight at a time
#[derive(Debug)]
pub struct VwapChannelStrategy {
    indicator: WindowedVwap,
    decision: TradeDecisionLoop,
    last_channel: Option<ChannelState>,
}

impl VwapChannelStrategy {
    pub fn new(config: &StrategyConfig) -> Result<Self> {
        Ok(Self {
            indicator: WindowedVwap::new(config.vwap.clone())?,
            decision: TradeDecisionLoop::new(config.target_percent)?,
            last_channel: None,
        })
    }

    /// Channel computed for the latest bar
    pub fn last_channel(&self) -> Option<ChannelState> {
        self.last_channel
    }

    pub fn indicator(&self) -> &WindowedVwap {
        &self.indicator
    }

    pub fn decision(&self) -> &TradeDecisionLoop {
        &self.decision
    }

    /// Re-initialise the indicator, e.g. when switching instruments
    pub fn reset_indicator(&mut self) {
        self.indicator.reset();
        self.last_channel = None;
    }
}

impl Strategy for VwapChannelStrategy {
    fn name(&self) -> &str {
        "VwapChannel"
    }

    fn on_bar(&mut self, bar: &Bar, broker: &mut dyn Broker) -> Result<Option<OrderHandle>> {
        let channel = self.indicator.update(bar)?;
        self.last_channel = Some(channel);

        tracing::debug!(
            "{} close={:.2}, vwap_lower={:.2}, vwap={:.2}, vwap_upper={:.2}, position={}",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bar.close,
            channel.lower,
            channel.vwap,
            channel.upper,
            broker.current_position().size()
        );

        self.decision.on_bar(bar, &channel, broker)
    }

    fn on_notify(&mut self, notification: &Notification) -> Option<OrderEvent> {
        self.decision.on_notify(notification)
    }

    fn equity_curve(&self) -> &[EquityPoint] {
        self.decision.equity_curve()
    }
}
