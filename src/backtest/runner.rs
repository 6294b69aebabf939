use crate::backtest::metrics::BacktestMetrics;
use crate::backtest::paper_broker::PaperBroker;
use crate::error::{Error, Result};
use crate::execution::{Broker, OrderEvent};
use crate::models::Bar;
use crate::strategy::Strategy;

/// Drives a strategy bar by bar against a [`PaperBroker`]
pub struct BacktestRunner {
    initial_cash: f64,
}

impl BacktestRunner {
    /// Create a new backtest runner
    pub fn new(initial_cash: f64) -> Self {
        Self { initial_cash }
    }

    /// Run a backtest over `bars` in arrival order
    ///
    /// Per bar: the broker executes any working order and marks to the
    /// close, queued notifications are delivered to the strategy, then the
    /// strategy sees the bar. Invalid bars are skipped with a warning.
    pub fn run<S, I>(&self, strategy: &mut S, bars: I) -> Result<BacktestMetrics>
    where
        S: Strategy + ?Sized,
        I: IntoIterator<Item = Bar>,
    {
        let mut broker = PaperBroker::new(self.initial_cash);
        let mut bar_count = 0usize;
        let mut skipped = 0usize;
        let mut failed_orders = 0usize;

        tracing::info!(
            "Starting backtest: strategy {}, initial cash ${:.2}",
            strategy.name(),
            self.initial_cash
        );

        for bar in bars {
            bar_count += 1;

            if let Err(e) = bar.validate() {
                tracing::warn!("Skipping bar: {}", e);
                skipped += 1;
                continue;
            }

            broker.advance(&bar);

            for notification in broker.drain_notifications() {
                if let Some(OrderEvent::Failed { .. }) = strategy.on_notify(&notification) {
                    failed_orders += 1;
                }
            }

            match strategy.on_bar(&bar, &mut broker) {
                Ok(_) => {}
                Err(e @ (Error::InvalidBar(_) | Error::Broker(_))) => {
                    tracing::warn!("Bar at {} not processed: {}", bar.timestamp, e);
                }
                Err(e) => return Err(e),
            }
        }

        if bar_count == 0 {
            return Err(Error::Backtest("No bars provided".to_string()));
        }

        let final_value = broker.current_equity();
        let metrics = BacktestMetrics::from_run(
            self.initial_cash,
            final_value,
            strategy.equity_curve(),
            broker.fills(),
            failed_orders,
        );

        tracing::info!(
            "Backtest complete: {} bars ({} skipped), {} fills, final value ${:.2} ({:+.2}%)",
            bar_count,
            skipped,
            metrics.total_fills,
            metrics.final_portfolio_value,
            metrics.total_return_pct
        );

        Ok(metrics)
    }

    /// Run backtest and print report
    pub fn run_and_report<S, I>(
        &self,
        strategy: &mut S,
        bars: I,
        scenario_name: &str,
    ) -> Result<BacktestMetrics>
    where
        S: Strategy + ?Sized,
        I: IntoIterator<Item = Bar>,
    {
        println!("\nRunning backtest: {}", scenario_name);
        println!("   Strategy: {}", strategy.name());
        println!("   Initial Cash: ${:.2}", self.initial_cash);

        let metrics = self.run(strategy, bars)?;
        metrics.print_report();

        Ok(metrics)
    }
}
