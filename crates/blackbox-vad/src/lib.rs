pub mod config;
pub mod constants;
pub mod energy;
pub mod tracker;

pub use config::SilenceConfig;
pub use constants::{CHANNELS_MONO, DEFAULT_SAMPLE_RATE_HZ};
pub use energy::EnergyMetric;
pub use tracker::SilenceTracker;
