use serde::{Deserialize, Serialize};

/// Frame energy estimator.
///
/// `MeanAbs` is the default: the mean absolute sample value, a coarse
/// energy proxy that matches the behavior silence thresholds were
/// calibrated against. `Rms` is the textbook alternative; it weighs
/// outlier samples more aggressively, so a threshold tuned for `MeanAbs`
/// will read slightly hotter under `Rms` on peaky signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMetric {
    MeanAbs,
    Rms,
}

impl Default for EnergyMetric {
    fn default() -> Self {
        Self::MeanAbs
    }
}

impl EnergyMetric {
    /// Energy of a frame in raw sample units (0..=32767 for full scale).
    pub fn measure(&self, frame: &[i16]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }

        match self {
            EnergyMetric::MeanAbs => {
                let sum: i64 = frame.iter().map(|&s| (s as i64).abs()).sum();
                (sum as f64 / frame.len() as f64) as f32
            }
            EnergyMetric::Rms => {
                let sum_squares: i64 = frame
                    .iter()
                    .map(|&sample| {
                        let s = sample as i64;
                        s * s
                    })
                    .sum();
                let mean_square = sum_squares as f64 / frame.len() as f64;
                mean_square.sqrt() as f32
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_LEN: usize = 1024;

    fn sine_frame(amplitude: f32) -> Vec<i16> {
        (0..FRAME_LEN)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / 64.0;
                (phase.sin() * amplitude) as i16
            })
            .collect()
    }

    #[test]
    fn silence_measures_zero() {
        let frame = vec![0i16; FRAME_LEN];
        assert_eq!(EnergyMetric::MeanAbs.measure(&frame), 0.0);
        assert_eq!(EnergyMetric::Rms.measure(&frame), 0.0);
    }

    #[test]
    fn empty_frame_measures_zero() {
        assert_eq!(EnergyMetric::MeanAbs.measure(&[]), 0.0);
        assert_eq!(EnergyMetric::Rms.measure(&[]), 0.0);
    }

    #[test]
    fn full_scale_dc_measures_full_scale() {
        let frame = vec![32767i16; FRAME_LEN];
        assert!((EnergyMetric::MeanAbs.measure(&frame) - 32767.0).abs() < 0.5);
        assert!((EnergyMetric::Rms.measure(&frame) - 32767.0).abs() < 0.5);
    }

    #[test]
    fn sine_wave_ratios_match_theory() {
        // For a sine of amplitude A: mean |x| = 2A/pi, RMS = A/sqrt(2)
        let frame = sine_frame(16384.0);
        let mean_abs = EnergyMetric::MeanAbs.measure(&frame);
        let rms = EnergyMetric::Rms.measure(&frame);
        assert!((mean_abs - 2.0 * 16384.0 / std::f32::consts::PI).abs() < 100.0);
        assert!((rms - 16384.0 / std::f32::consts::SQRT_2).abs() < 100.0);
        assert!(rms > mean_abs);
    }

    #[test]
    fn rms_responds_more_to_outliers() {
        let mut frame = vec![0i16; FRAME_LEN];
        frame[0] = 32767;
        let mean_abs = EnergyMetric::MeanAbs.measure(&frame);
        let rms = EnergyMetric::Rms.measure(&frame);
        assert!(rms > mean_abs * 10.0);
    }

    #[test]
    fn negative_samples_count_toward_energy() {
        let frame = vec![-250i16; FRAME_LEN];
        assert!((EnergyMetric::MeanAbs.measure(&frame) - 250.0).abs() < 0.5);
    }
}
