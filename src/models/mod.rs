use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// OHLCV bar, the only market input the core consumes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Typical price: (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Calendar day (UTC) used as the session key for daily resets
    pub fn session(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Reject bars the indicator cannot consume
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(Error::InvalidBar(format!(
                    "{} is not finite ({}) at {}",
                    name, value, self.timestamp
                )));
            }
        }

        if self.volume < 0.0 {
            return Err(Error::InvalidBar(format!(
                "negative volume {} at {}",
                self.volume, self.timestamp
            )));
        }

        Ok(())
    }
}

/// VWAP and its standard-deviation channel for one bar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChannelState {
    pub vwap: f64,
    pub upper: f64,
    pub lower: f64,
}

impl ChannelState {
    /// Channel collapsed onto the VWAP (undefined dispersion)
    pub fn flat(vwap: f64) -> Self {
        Self {
            vwap,
            upper: vwap,
            lower: vwap,
        }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Trading signal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Order side
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Broker-side position snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long { size: u64 },
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn size(&self) -> u64 {
        match self {
            Position::Flat => 0,
            Position::Long { size } => *size,
        }
    }
}

/// Portfolio value observed at the start of a bar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(volume: f64) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            open: 100.0,
            high: 103.0,
            low: 97.0,
            close: 102.0,
            volume,
        }
    }

    #[test]
    fn test_typical_price() {
        assert!((bar(10.0).typical_price() - 100.666_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_negative_volume() {
        let result = bar(-1.0).validate();
        assert!(matches!(result, Err(Error::InvalidBar(_))));
    }

    #[test]
    fn test_validate_rejects_nan_price() {
        let mut b = bar(10.0);
        b.close = f64::NAN;
        assert!(b.validate().is_err());

        b.close = 102.0;
        b.high = f64::INFINITY;
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_zero_volume() {
        assert!(bar(0.0).validate().is_ok());
    }

    #[test]
    fn test_channel_width() {
        let channel = ChannelState {
            vwap: 100.0,
            upper: 104.5,
            lower: 95.5,
        };
        assert_eq!(channel.width(), 9.0);
        assert_eq!(ChannelState::flat(100.0).width(), 0.0);
    }

    #[test]
    fn test_position_size() {
        assert_eq!(Position::Flat.size(), 0);
        assert!(Position::default().is_flat());
        assert_eq!(Position::Long { size: 7 }.size(), 7);
    }
}
