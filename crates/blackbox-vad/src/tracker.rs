use std::time::{Duration, Instant};

use blackbox_foundation::clock::SharedClock;

use crate::config::SilenceConfig;
use crate::energy::EnergyMetric;

/// Tracks how long the incoming signal has been below the silence
/// threshold.
///
/// One loud frame fully resets the countdown; it is never partially
/// decremented. Time comes from an injected clock so the tracker can be
/// driven on virtual time in tests.
pub struct SilenceTracker {
    threshold: f32,
    metric: EnergyMetric,
    clock: SharedClock,
    silence_start: Option<Instant>,
    last_energy: f32,
}

impl SilenceTracker {
    pub fn new(config: &SilenceConfig, clock: SharedClock) -> Self {
        Self {
            threshold: config.threshold as f32,
            metric: config.energy_metric,
            clock,
            silence_start: None,
            last_energy: 0.0,
        }
    }

    /// Feed one frame. Returns whether the tracker is currently in a
    /// silence countdown.
    pub fn observe(&mut self, frame: &[i16]) -> bool {
        let energy = self.metric.measure(frame);
        self.last_energy = energy;

        tracing::trace!(
            energy,
            threshold = self.threshold,
            samples = frame.len(),
            "silence tracker frame"
        );

        if energy < self.threshold {
            if self.silence_start.is_none() {
                self.silence_start = Some(self.clock.now());
                tracing::debug!(energy, threshold = self.threshold, "silence started");
            }
            true
        } else {
            if let Some(start) = self.silence_start.take() {
                tracing::debug!(
                    after = ?self.clock.now().duration_since(start),
                    energy,
                    "silence broken"
                );
            }
            false
        }
    }

    pub fn is_silent(&self) -> bool {
        self.silence_start.is_some()
    }

    /// Elapsed time since the silence flag was last set; zero while loud.
    pub fn silence_duration(&self) -> Duration {
        self.silence_start
            .map(|start| self.clock.now().duration_since(start))
            .unwrap_or(Duration::ZERO)
    }

    pub fn last_energy(&self) -> f32 {
        self.last_energy
    }

    pub fn reset(&mut self) {
        self.silence_start = None;
        self.last_energy = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blackbox_foundation::clock::{test_clock, TestClock};
    use std::sync::Arc;

    const FRAME_LEN: usize = 1024;

    fn tracker_with_clock() -> (SilenceTracker, Arc<TestClock>) {
        let clock = test_clock();
        let config = SilenceConfig {
            threshold: 250,
            silence_duration_ms: 2_000,
            ..Default::default()
        };
        let tracker = SilenceTracker::new(&config, clock.clone());
        (tracker, clock)
    }

    fn loud_frame() -> Vec<i16> {
        vec![3000i16; FRAME_LEN]
    }

    fn quiet_frame() -> Vec<i16> {
        vec![40i16; FRAME_LEN]
    }

    #[test]
    fn loud_frames_never_start_countdown() {
        let (mut tracker, clock) = tracker_with_clock();
        for _ in 0..200 {
            assert!(!tracker.observe(&loud_frame()));
            clock.advance(Duration::from_millis(23));
        }
        assert!(!tracker.is_silent());
        assert_eq!(tracker.silence_duration(), Duration::ZERO);
    }

    #[test]
    fn countdown_accumulates_across_quiet_frames() {
        let (mut tracker, clock) = tracker_with_clock();
        assert!(tracker.observe(&quiet_frame()));
        clock.advance(Duration::from_millis(500));
        assert!(tracker.observe(&quiet_frame()));
        clock.advance(Duration::from_millis(1500));
        assert!(tracker.is_silent());
        assert_eq!(tracker.silence_duration(), Duration::from_millis(2000));
    }

    #[test]
    fn single_loud_frame_resets_countdown_to_zero() {
        let (mut tracker, clock) = tracker_with_clock();
        tracker.observe(&quiet_frame());
        clock.advance(Duration::from_millis(1900));
        assert!(tracker.silence_duration() >= Duration::from_millis(1900));

        assert!(!tracker.observe(&loud_frame()));
        assert_eq!(tracker.silence_duration(), Duration::ZERO);

        // A fresh countdown starts from zero, not from the old tally
        tracker.observe(&quiet_frame());
        clock.advance(Duration::from_millis(100));
        assert_eq!(tracker.silence_duration(), Duration::from_millis(100));
    }

    #[test]
    fn boundary_energy_is_not_silent() {
        let config = SilenceConfig {
            threshold: 250,
            ..Default::default()
        };
        let mut tracker = SilenceTracker::new(&config, test_clock());
        // exactly at threshold counts as loud
        assert!(!tracker.observe(&vec![250i16; FRAME_LEN]));
        assert!(tracker.observe(&vec![249i16; FRAME_LEN]));
    }

    #[test]
    fn reset_clears_flag_and_energy() {
        let (mut tracker, _clock) = tracker_with_clock();
        tracker.observe(&quiet_frame());
        assert!(tracker.is_silent());
        tracker.reset();
        assert!(!tracker.is_silent());
        assert_eq!(tracker.last_energy(), 0.0);
    }

    #[test]
    fn rms_metric_flags_peaky_frames_as_loud() {
        let config = SilenceConfig {
            threshold: 250,
            energy_metric: EnergyMetric::Rms,
            ..Default::default()
        };
        let mut tracker = SilenceTracker::new(&config, test_clock());
        let mut frame = vec![0i16; FRAME_LEN];
        for s in frame.iter_mut().step_by(8) {
            *s = 2000;
        }
        // mean-abs of this frame is 250 exactly; RMS is well above
        assert!(!tracker.observe(&frame));
    }
}
