//! Shared rate-estimation logic behind both the heart-rate and
//! respiration-rate readouts. The two original estimators differed
//! only in their band, confidence constant, and jump threshold, so
//! this crate keeps one parameterized implementation instantiated
//! twice rather than two near-duplicate structs.

use crate::fft::{magnitude_spectrum, peak_in_band};
use crate::filters::ExponentialSmoother;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBand {
    pub low_hz: f32,
    pub high_hz: f32,
}

/// Alternate estimation strategy tried alongside the FFT peak search;
/// both the original heart-rate and respiration-rate modules carried
/// one of these as a fallback/cross-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothingStrategy {
    /// Autocorrelation-based period estimate (heart rate).
    Autocorrelation,
    /// Zero-crossing / peak-counting period estimate (respiration rate).
    PeakCounting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimatorConfig {
    pub band: RateBand,
    pub sample_rate_hz: f32,
    pub confidence_k: f32,
    pub jump_threshold_per_minute: f32,
    pub zero_pad_factor: usize,
    pub strategy: SmoothingStrategy,
    pub history_smoothing_alpha: f32,
}

impl RateEstimatorConfig {
    #[must_use]
    pub fn heart_rate(sample_rate_hz: f32) -> Self {
        Self {
            band: super::HEART_RATE_BAND,
            sample_rate_hz,
            confidence_k: 5.0,
            jump_threshold_per_minute: 20.0,
            zero_pad_factor: 4,
            strategy: SmoothingStrategy::Autocorrelation,
            history_smoothing_alpha: 0.3,
        }
    }

    #[must_use]
    pub fn respiration_rate(sample_rate_hz: f32) -> Self {
        Self {
            band: super::RESPIRATION_RATE_BAND,
            sample_rate_hz,
            confidence_k: 3.0,
            jump_threshold_per_minute: 10.0,
            zero_pad_factor: 4,
            strategy: SmoothingStrategy::PeakCounting,
            history_smoothing_alpha: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimate {
    pub rate_per_minute: f32,
    pub confidence: f32,
}

pub struct RateEstimator {
    config: RateEstimatorConfig,
    last_rate: Option<f32>,
    smoother: ExponentialSmoother,
}

impl RateEstimator {
    #[must_use]
    pub fn new(config: RateEstimatorConfig) -> Self {
        let alpha = config.history_smoothing_alpha;
        Self { config, last_rate: None, smoother: ExponentialSmoother::new(alpha) }
    }

    /// Estimates a rate from a filtered waveform window via FFT peak
    /// search in the configured band, cross-checked against the
    /// configured alternate strategy, halving confidence on an
    /// implausible jump from the previous estimate.
    pub fn estimate(&mut self, filtered_window: &[f32]) -> Option<RateEstimate> {
        let spectrum =
            magnitude_spectrum(filtered_window, self.config.sample_rate_hz, self.config.zero_pad_factor);
        let (peak, mean_band_mag) = peak_in_band(&spectrum, self.config.band.low_hz, self.config.band.high_hz)?;
        if mean_band_mag <= f32::EPSILON {
            return None;
        }

        let rate_hz = peak.frequency_hz;
        let rate_per_minute = rate_hz * 60.0;

        let mut confidence =
            ((peak.magnitude / mean_band_mag - 1.0) / self.config.confidence_k).clamp(0.0, 1.0);

        if let Some(prev) = self.last_rate {
            if (rate_per_minute - prev).abs() > self.config.jump_threshold_per_minute {
                confidence *= 0.5;
            }
        }

        let alt_rate = self.alternate_estimate(filtered_window);
        if let Some(alt) = alt_rate {
            if (alt - rate_per_minute).abs() > self.config.jump_threshold_per_minute {
                confidence *= 0.5;
            }
        }

        self.last_rate = Some(rate_per_minute);
        let smoothed_rate = self.smoother.update(rate_per_minute);

        Some(RateEstimate { rate_per_minute: smoothed_rate, confidence })
    }

    /// Cross-check estimate used purely to penalize the FFT peak's
    /// confidence when it disagrees; never returned directly.
    fn alternate_estimate(&self, window: &[f32]) -> Option<f32> {
        match self.config.strategy {
            SmoothingStrategy::Autocorrelation => self.estimate_with_autocorrelation(window),
            SmoothingStrategy::PeakCounting => self.estimate_with_peak_counting(window),
        }
    }

    fn estimate_with_autocorrelation(&self, window: &[f32]) -> Option<f32> {
        let min_lag = (self.config.sample_rate_hz / self.config.band.high_hz) as usize;
        let max_lag = (self.config.sample_rate_hz / self.config.band.low_hz) as usize;
        let max_lag = max_lag.min(window.len().saturating_sub(1));
        if min_lag >= max_lag {
            return None;
        }

        let mut best_lag = None;
        let mut best_corr = f32::MIN;
        for lag in min_lag..=max_lag {
            let corr: f32 = window.iter().zip(window.iter().skip(lag)).map(|(a, b)| a * b).sum();
            if corr > best_corr {
                best_corr = corr;
                best_lag = Some(lag);
            }
        }
        best_lag.map(|lag| 60.0 * self.config.sample_rate_hz / lag as f32)
    }

    fn estimate_with_peak_counting(&self, window: &[f32]) -> Option<f32> {
        if window.len() < 2 {
            return None;
        }
        let mean = window.iter().sum::<f32>() / window.len() as f32;
        let mut crossings = 0usize;
        for pair in window.windows(2) {
            if (pair[0] - mean) < 0.0 && (pair[1] - mean) >= 0.0 {
                crossings += 1;
            }
        }
        if crossings == 0 {
            return None;
        }
        let duration_s = window.len() as f32 / self.config.sample_rate_hz;
        Some(60.0 * crossings as f32 / duration_s)
    }
}
