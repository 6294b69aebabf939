use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backtest::paper_broker::Fill;
use crate::models::{EquityPoint, OrderSide};

/// Record of a single round trip (entry fill to full exit fill)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u64,
    pub pnl: f64,
    pub pnl_pct: f64,
}

impl TradeRecord {
    /// Pair buy fills with the sell fills that close them
    pub fn from_fills(fills: &[Fill]) -> Vec<Self> {
        let mut trades = Vec::new();
        let mut entry: Option<(DateTime<Utc>, f64, u64)> = None;

        for fill in fills {
            match fill.side {
                OrderSide::Buy => {
                    // Average in if a second buy lands before an exit
                    entry = Some(match entry {
                        Some((time, price, size)) => {
                            let total = size + fill.size;
                            let avg = (price * size as f64 + fill.price * fill.size as f64)
                                / total as f64;
                            (time, avg, total)
                        }
                        None => (fill.timestamp, fill.price, fill.size),
                    });
                }
                OrderSide::Sell => {
                    if let Some((entry_time, entry_price, _)) = entry.take() {
                        let pnl = (fill.price - entry_price) * fill.size as f64;
                        trades.push(Self {
                            entry_time,
                            exit_time: fill.timestamp,
                            entry_price,
                            exit_price: fill.price,
                            quantity: fill.size,
                            pnl,
                            pnl_pct: (fill.price - entry_price) / entry_price * 100.0,
                        });
                    }
                }
            }
        }

        trades
    }
}

/// End-of-run performance summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    // P&L Metrics
    pub initial_portfolio_value: f64,
    pub final_portfolio_value: f64,
    pub total_pnl: f64,
    pub total_return_pct: f64,

    // Risk Metrics
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,

    // Order Statistics
    pub bars_processed: usize,
    pub total_fills: usize,
    pub failed_orders: usize,

    // Trade Statistics
    pub round_trips: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    pub trades: Vec<TradeRecord>,
}

impl BacktestMetrics {
    pub fn from_run(
        initial_portfolio_value: f64,
        final_portfolio_value: f64,
        equity_curve: &[EquityPoint],
        fills: &[Fill],
        failed_orders: usize,
    ) -> Self {
        let trades = TradeRecord::from_fills(fills);
        let round_trips = trades.len();
        let winning_trades = trades.iter().filter(|t| t.pnl > 0.0).count();
        let losing_trades = round_trips - winning_trades;
        let win_rate = if round_trips > 0 {
            (winning_trades as f64 / round_trips as f64) * 100.0
        } else {
            0.0
        };

        let total_pnl = final_portfolio_value - initial_portfolio_value;
        let total_return_pct = if initial_portfolio_value > 0.0 {
            (final_portfolio_value / initial_portfolio_value - 1.0) * 100.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_pct) =
            Self::calculate_drawdown(equity_curve, initial_portfolio_value);

        Self {
            initial_portfolio_value,
            final_portfolio_value,
            total_pnl,
            total_return_pct,
            max_drawdown,
            max_drawdown_pct,
            bars_processed: equity_curve.len(),
            total_fills: fills.len(),
            failed_orders,
            round_trips,
            winning_trades,
            losing_trades,
            win_rate,
            trades,
        }
    }

    /// Largest peak-to-trough fall of the equity curve
    fn calculate_drawdown(equity_curve: &[EquityPoint], initial_value: f64) -> (f64, f64) {
        let mut peak = initial_value;
        let mut max_dd = 0.0;
        let mut max_dd_pct = 0.0;

        for point in equity_curve {
            if point.equity > peak {
                peak = point.equity;
            }

            let drawdown = peak - point.equity;
            if drawdown > max_dd {
                max_dd = drawdown;
                max_dd_pct = if peak > 0.0 {
                    (drawdown / peak) * 100.0
                } else {
                    0.0
                };
            }
        }

        (max_dd, max_dd_pct)
    }

    /// Print a formatted report to stdout
    pub fn print_report(&self) {
        println!("\n=======================================================");
        println!("              BACKTEST PERFORMANCE REPORT");
        println!("=======================================================\n");

        println!("P&L SUMMARY");
        println!(
            "  Initial Portfolio:     ${:.2}",
            self.initial_portfolio_value
        );
        println!("  Final Portfolio:       ${:.2}", self.final_portfolio_value);
        println!(
            "  Total P&L:             ${:.2} ({:+.2}%)",
            self.total_pnl, self.total_return_pct
        );

        println!("\nORDERS");
        println!("  Bars Processed:        {}", self.bars_processed);
        println!("  Fills:                 {}", self.total_fills);
        println!("  Failed Orders:         {}", self.failed_orders);

        println!("\nTRADE STATISTICS");
        println!("  Round Trips:           {}", self.round_trips);
        println!(
            "  Winning Trades:        {} ({:.1}%)",
            self.winning_trades, self.win_rate
        );
        println!("  Losing Trades:         {}", self.losing_trades);

        println!("\nRISK METRICS");
        println!(
            "  Max Drawdown:          ${:.2} ({:.2}%)",
            self.max_drawdown, self.max_drawdown_pct
        );

        println!("\n=======================================================\n");
    }
}
