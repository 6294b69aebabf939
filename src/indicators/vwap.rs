use std::collections::VecDeque;

use chrono::NaiveDate;

use crate::config::VwapConfig;
use crate::error::Result;
use crate::models::{Bar, ChannelState};

/// One (price, volume) observation held by the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceVolumeSample {
    pub price: f64,
    pub volume: f64,
}

impl PriceVolumeSample {
    fn price_volume(&self) -> f64 {
        self.price * self.volume
    }
}

/// Sliding-window Volume Weighted Average Price with a standard-deviation channel
///
/// VWAP = Σ(price × volume) / Σ(volume) over the last `period` bars.
/// The channel is `vwap ± std_dev_mult × σ`, where σ is the population
/// standard deviation of the sample prices in the same window.
///
/// Running sums are updated on push and evict, so the VWAP costs O(1) per
/// update and σ costs O(period). The sums are rebuilt from the window when an
/// evicted sample carries at least half of either sum, and after every
/// `period` evictions, so cancellation error cannot build up.
#[derive(Debug, Clone)]
pub struct WindowedVwap {
    config: VwapConfig,
    window: VecDeque<PriceVolumeSample>,
    cum_volume: f64,
    cum_price_volume: f64,
    // Samples in the window with non-zero volume
    volume_samples: usize,
    evictions_since_resync: usize,
    session: Option<NaiveDate>,
}

impl WindowedVwap {
    pub fn new(config: VwapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            window: VecDeque::with_capacity(config.period + 1),
            config,
            cum_volume: 0.0,
            cum_price_volume: 0.0,
            volume_samples: 0,
            evictions_since_resync: 0,
            session: None,
        })
    }

    /// Feed one bar and return the channel for it
    ///
    /// An invalid bar leaves the indicator untouched.
    pub fn update(&mut self, bar: &Bar) -> Result<ChannelState> {
        bar.validate()?;

        let sample = PriceVolumeSample {
            price: if self.config.use_typical_price {
                bar.typical_price()
            } else {
                bar.close
            },
            volume: bar.volume,
        };

        if self.config.reset_daily {
            let session = bar.session();
            if self.session != Some(session) {
                if self.session.is_some() {
                    tracing::debug!("New session {}, resetting VWAP window", session);
                }
                self.clear();
                self.session = Some(session);
            }
        }

        self.push(sample);

        let vwap = if self.cum_volume > 0.0 {
            self.cum_price_volume / self.cum_volume
        } else {
            sample.price
        };

        let channel = match self.std_dev() {
            Some(std_dev) => ChannelState {
                vwap,
                upper: vwap + self.config.std_dev_mult * std_dev,
                lower: vwap - self.config.std_dev_mult * std_dev,
            },
            None => ChannelState::flat(vwap),
        };

        tracing::trace!(
            "VWAP {:.4} [{:.4}, {:.4}] over {} bars",
            channel.vwap,
            channel.lower,
            channel.upper,
            self.window.len()
        );

        Ok(channel)
    }

    /// Clear every accumulator and the recorded session
    pub fn reset(&mut self) {
        self.clear();
        self.session = None;
    }

    fn clear(&mut self) {
        self.window.clear();
        self.cum_volume = 0.0;
        self.cum_price_volume = 0.0;
        self.volume_samples = 0;
        self.evictions_since_resync = 0;
    }

    fn push(&mut self, sample: PriceVolumeSample) {
        self.window.push_back(sample);
        let mut resync = false;

        if self.window.len() > self.config.period {
            if let Some(old) = self.window.pop_front() {
                if old.volume != 0.0 {
                    self.volume_samples -= 1;
                }

                // Subtracting a dominant sample cancels catastrophically
                let dominant = (old.volume > 0.0 && 2.0 * old.volume >= self.cum_volume)
                    || (old.price_volume() != 0.0
                        && 2.0 * old.price_volume().abs() >= self.cum_price_volume.abs());
                self.evictions_since_resync += 1;
                resync = dominant || self.evictions_since_resync >= self.config.period;

                if !resync {
                    self.cum_volume -= old.volume;
                    self.cum_price_volume -= old.price_volume();
                }
            }
        }

        if resync {
            self.resync();
        } else {
            self.cum_volume += sample.volume;
            self.cum_price_volume += sample.price_volume();
        }
        if sample.volume != 0.0 {
            self.volume_samples += 1;
        }

        // Drop float residue left behind by evictions once no volume remains
        if self.volume_samples == 0 {
            self.cum_volume = 0.0;
            self.cum_price_volume = 0.0;
        }
    }

    /// Rebuild both running sums from the samples in the window
    fn resync(&mut self) {
        self.cum_volume = self.window.iter().map(|s| s.volume).sum();
        self.cum_price_volume = self.window.iter().map(|s| s.price_volume()).sum();
        self.evictions_since_resync = 0;
    }

    /// Population standard deviation of window prices, None below two samples
    fn std_dev(&self) -> Option<f64> {
        let n = self.window.len();
        if n < 2 {
            return None;
        }

        let mean = self.window.iter().map(|s| s.price).sum::<f64>() / n as f64;
        let variance = self
            .window
            .iter()
            .map(|s| {
                let diff = s.price - mean;
                diff * diff
            })
            .sum::<f64>()
            / n as f64;

        Some(variance.sqrt())
    }

    pub fn config(&self) -> &VwapConfig {
        &self.config
    }

    pub fn period(&self) -> usize {
        self.config.period
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn cum_volume(&self) -> f64 {
        self.cum_volume
    }

    pub fn cum_price_volume(&self) -> f64 {
        self.cum_price_volume
    }

    /// Samples currently in the window, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &PriceVolumeSample> {
        self.window.iter()
    }
}
