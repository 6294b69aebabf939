use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use vwapbot::backtest::{BacktestMetrics, BacktestRunner, MarketScenario, SyntheticDataGenerator};
use vwapbot::config::{AppConfig, StrategyConfig};
use vwapbot::strategy::{BuyAndHoldStrategy, Strategy, VwapChannelStrategy};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyKind {
    VwapChannel,
    BuyAndHold,
}

/// Run the VWAP channel strategy over synthetic bars
#[derive(Debug, Parser)]
#[command(name = "vwapbot", version, about)]
struct Cli {
    /// Directory holding default.toml
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = StrategyKind::VwapChannel)]
    strategy: StrategyKind,

    /// Scenario to run (uptrend, downtrend, sideways, volatile); all when omitted
    #[arg(long)]
    scenario: Option<MarketScenario>,

    /// Number of bars per scenario
    #[arg(long)]
    bars: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    initial_cash: Option<f64>,

    /// VWAP window length in bars
    #[arg(long)]
    period: Option<usize>,

    #[arg(long)]
    std_dev_mult: Option<f64>,

    #[arg(long)]
    target_percent: Option<f64>,

    /// Reset the VWAP window at each new calendar day
    #[arg(long)]
    reset_daily: bool,

    /// Use the close instead of the typical price
    #[arg(long)]
    close_only: bool,

    /// Print metrics as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(bars) = self.bars {
            config.backtest.bars = bars;
        }
        if let Some(seed) = self.seed {
            config.backtest.seed = seed;
        }
        if let Some(cash) = self.initial_cash {
            config.backtest.initial_cash = cash;
        }
        if let Some(period) = self.period {
            config.strategy.vwap.period = period;
        }
        if let Some(mult) = self.std_dev_mult {
            config.strategy.vwap.std_dev_mult = mult;
        }
        if let Some(target) = self.target_percent {
            config.strategy.target_percent = target;
        }
        if self.reset_daily {
            config.strategy.vwap.reset_daily = true;
        }
        if self.close_only {
            config.strategy.vwap.use_typical_price = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config_dir)?;
    cli.apply(&mut config);
    config.validate()?;

    setup_logging(&config.logging.level);
    tracing::info!("Configuration: {:?}", config.strategy);

    let scenarios = match cli.scenario {
        Some(scenario) => vec![scenario],
        None => MarketScenario::ALL.to_vec(),
    };

    let runner = BacktestRunner::new(config.backtest.initial_cash);
    let mut results = Vec::new();

    for scenario in scenarios {
        let bars = SyntheticDataGenerator::new(config.backtest.seed).generate(
            scenario,
            config.backtest.bars,
            config.backtest.interval_minutes,
        );
        let mut strategy = build_strategy(cli.strategy, &config.strategy)?;

        let metrics = if cli.json {
            runner.run(&mut *strategy, bars)?
        } else {
            runner.run_and_report(&mut *strategy, bars, &scenario.to_string())?
        };
        results.push((scenario.to_string(), metrics));
    }

    if cli.json {
        let report: Vec<_> = results
            .iter()
            .map(|(name, metrics)| serde_json::json!({ "scenario": name, "metrics": metrics }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary_comparison(&results);
    }

    Ok(())
}

fn build_strategy(
    kind: StrategyKind,
    config: &StrategyConfig,
) -> vwapbot::Result<Box<dyn Strategy>> {
    Ok(match kind {
        StrategyKind::VwapChannel => Box::new(VwapChannelStrategy::new(config)?),
        StrategyKind::BuyAndHold => Box::new(BuyAndHoldStrategy::new(config.target_percent)?),
    })
}

fn setup_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vwapbot={}", default_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_summary_comparison(results: &[(String, BacktestMetrics)]) {
    println!("\nSCENARIO COMPARISON\n");
    println!(
        "{:<12} {:>12} {:>10} {:>8} {:>8} {:>10}",
        "Scenario", "P&L", "Return%", "Trips", "Win%", "MaxDD%"
    );
    println!("{}", "-".repeat(64));

    for (name, metrics) in results {
        println!(
            "{:<12} {:>12.2} {:>10.2} {:>8} {:>8.1} {:>10.2}",
            name,
            metrics.total_pnl,
            metrics.total_return_pct,
            metrics.round_trips,
            metrics.win_rate,
            metrics.max_drawdown_pct
        );
    }
    println!();
}
