//! Defaults for the silence-detection pipeline

/// Default capture sample rate (Hz)
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Mono capture; the energy metrics assume interleaving-free frames
pub const CHANNELS_MONO: u16 = 1;

/// Default amplitude threshold, in raw sample units, below which a frame
/// counts as silent. There is no principled derivation; deployments
/// calibrate per microphone and room (observed working range 200-300).
pub const DEFAULT_SILENCE_THRESHOLD: u16 = 250;

/// Continuous sub-threshold time required before a recording stops (ms)
pub const DEFAULT_SILENCE_DURATION_MS: u32 = 2_000;
