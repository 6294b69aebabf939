// Technical indicators module
// Sliding-window VWAP with a standard-deviation channel

pub mod vwap;

pub use vwap::{PriceVolumeSample, WindowedVwap};
