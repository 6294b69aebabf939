use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::Bar;

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Steady uptrend with noise (+2% daily average)
    Uptrend,
    /// Steady downtrend with noise (-2% daily average)
    Downtrend,
    /// Sideways/choppy market (±1% around mean)
    Sideways,
    /// High volatility (±5% large swings)
    Volatile,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 4] = [
        MarketScenario::Uptrend,
        MarketScenario::Downtrend,
        MarketScenario::Sideways,
        MarketScenario::Volatile,
    ];
}

impl FromStr for MarketScenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uptrend" => Ok(Self::Uptrend),
            "downtrend" => Ok(Self::Downtrend),
            "sideways" => Ok(Self::Sideways),
            "volatile" => Ok(Self::Volatile),
            other => Err(format!("unknown scenario '{}'", other)),
        }
    }
}

impl std::fmt::Display for MarketScenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uptrend => "uptrend",
            Self::Downtrend => "downtrend",
            Self::Sideways => "sideways",
            Self::Volatile => "volatile",
        };
        write!(f, "{}", name)
    }
}

/// Generates reproducible synthetic bars for backtesting
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
    start_time: DateTime<Utc>,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 150.0,
            base_volume: 10_000.0,
            start_time: Utc
                .with_ymd_and_hms(2024, 1, 2, 0, 0, 0)
                .single()
                .unwrap_or_default(),
        }
    }

    /// Generate `num_bars` bars spaced `interval_minutes` apart
    ///
    /// Bars span several calendar days once `num_bars * interval_minutes`
    /// exceeds a day, which exercises session resets.
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_bars: usize,
        interval_minutes: i64,
    ) -> Vec<Bar> {
        let mut bars = Vec::with_capacity(num_bars);
        let mut price = self.base_price;
        let intervals_per_day = 24.0 * 60.0 / interval_minutes as f64;

        for i in 0..num_bars {
            let timestamp = self.start_time + Duration::minutes(i as i64 * interval_minutes);

            let change = match scenario {
                MarketScenario::Uptrend => {
                    price * (0.02 / intervals_per_day + self.rng.gen_range(-0.001..0.001))
                }
                MarketScenario::Downtrend => {
                    price * (-0.02 / intervals_per_day + self.rng.gen_range(-0.001..0.001))
                }
                MarketScenario::Sideways => {
                    // 10% pull to the mean plus ±1% noise
                    (self.base_price - price) * 0.1 + price * self.rng.gen_range(-0.01..0.01)
                }
                MarketScenario::Volatile => price * self.rng.gen_range(-0.05..0.05),
            };
            price = (price + change).max(self.base_price * 0.5);

            bars.push(self.create_bar(price, timestamp));
        }

        bars
    }

    /// Build a bar with realistic OHLC around the close
    fn create_bar(&mut self, close: f64, timestamp: DateTime<Utc>) -> Bar {
        let noise_pct = 0.002; // ±0.2% intrabar movement

        let high = close * (1.0 + self.rng.gen_range(0.0..noise_pct));
        let low = close * (1.0 - self.rng.gen_range(0.0..noise_pct));
        let open = (close * (1.0 + self.rng.gen_range(-noise_pct..noise_pct))).clamp(low, high);

        // Vary volume ±30%
        let volume = self.base_volume * self.rng.gen_range(0.7..1.3);

        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_uptrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Uptrend, 2_000, 5);

        assert_eq!(bars.len(), 2_000);
        let first = bars.first().unwrap().close;
        let last = bars.last().unwrap().close;
        assert!(last > first, "Uptrend should end higher: {} -> {}", first, last);
    }

    #[test]
    fn test_generate_downtrend() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Downtrend, 2_000, 5);

        let first = bars.first().unwrap().close;
        let last = bars.last().unwrap().close;
        assert!(last < first, "Downtrend should end lower: {} -> {}", first, last);
    }

    #[test]
    fn test_generate_sideways() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Sideways, 500, 5);

        let base = gen.base_price;
        for bar in &bars {
            assert!(
                bar.close > base * 0.9 && bar.close < base * 1.1,
                "Sideways should stay near base: {} vs {}",
                bar.close,
                base
            );
        }
    }

    #[test]
    fn test_same_seed_same_bars() {
        let a = SyntheticDataGenerator::new(7).generate(MarketScenario::Volatile, 100, 5);
        let b = SyntheticDataGenerator::new(7).generate(MarketScenario::Volatile, 100, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bars_span_sessions() {
        let mut gen = SyntheticDataGenerator::new(42);
        let bars = gen.generate(MarketScenario::Sideways, 600, 5);

        for pair in bars.windows(2) {
            assert!(pair[1].timestamp > pair[0].timestamp);
        }
        // 600 * 5 minutes is a little over two days
        assert_ne!(bars.first().unwrap().session(), bars.last().unwrap().session());
    }

    #[test]
    fn test_ohlc_consistency() {
        let mut gen = SyntheticDataGenerator::new(42);
        for bar in gen.generate(MarketScenario::Volatile, 200, 5) {
            assert!(bar.high >= bar.close && bar.high >= bar.open);
            assert!(bar.low <= bar.close && bar.low <= bar.open);
            assert!(bar.volume > 0.0);
            assert!(bar.validate().is_ok());
        }
    }

    #[test]
    fn test_parse_scenario() {
        assert_eq!("Uptrend".parse::<MarketScenario>(), Ok(MarketScenario::Uptrend));
        assert!("crash".parse::<MarketScenario>().is_err());
        for scenario in MarketScenario::ALL {
            assert_eq!(scenario.to_string().parse::<MarketScenario>(), Ok(scenario));
        }
    }
}
