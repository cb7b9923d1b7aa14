//! Heart-rate and respiration-rate estimation from a phase/displacement
//! waveform, plus the parallel chirp-domain estimator.

mod chirp;
mod estimator;

pub use chirp::ChirpVitalsEstimator;
pub use estimator::{RateBand, RateEstimate, RateEstimator, RateEstimatorConfig, SmoothingStrategy};

use serde::{Deserialize, Serialize};

use crate::filters::BandpassFilter;
use crate::types::PhaseSample;

/// Heart-rate band: 0.8-3.0 Hz (48-180 BPM).
pub const HEART_RATE_BAND: RateBand = RateBand { low_hz: 0.8, high_hz: 3.0 };
/// Respiration-rate band: 0.1-0.6 Hz (6-36 breaths/min).
pub const RESPIRATION_RATE_BAND: RateBand = RateBand { low_hz: 0.1, high_hz: 0.6 };

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalsConfig {
    pub sample_rate_hz: f32,
    pub window_seconds: f32,
    pub motion_stddev_threshold: f32,
    pub filter_order: u32,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 20.0,
            window_seconds: 10.0,
            motion_stddev_threshold: 5.0,
            filter_order: 4,
        }
    }
}

/// Combined HR/RR readout for one window of phase samples.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VitalSigns {
    pub heart_rate_bpm: Option<f32>,
    pub heart_confidence: f32,
    pub respiration_rate_bpm: Option<f32>,
    pub respiration_confidence: f32,
    pub signal_quality: f32,
    pub motion_detected: bool,
}

/// Sliding-window ring buffer over raw phase samples, feeding a
/// bandpass filter and rate estimator for each vital sign.
pub struct VitalsExtractor {
    config: VitalsConfig,
    /// Warm-up gate: `5 * sample_rate_hz`, derived at construction
    /// rather than taken as an independent config field so it cannot
    /// drift out of sync with `sample_rate_hz`.
    min_samples: usize,
    buffer: Vec<PhaseSample>,
    capacity: usize,
    heart_filter: BandpassFilter,
    respiration_filter: BandpassFilter,
    heart_estimator: RateEstimator,
    respiration_estimator: RateEstimator,
}

impl VitalsExtractor {
    #[must_use]
    pub fn new(config: VitalsConfig) -> Self {
        let capacity = ((config.sample_rate_hz * config.window_seconds) as usize).max(1);
        let min_samples = (config.sample_rate_hz * 5.0) as usize;
        Self {
            heart_filter: BandpassFilter::new(
                config.sample_rate_hz,
                HEART_RATE_BAND.low_hz,
                HEART_RATE_BAND.high_hz,
                config.filter_order,
            ),
            respiration_filter: BandpassFilter::new(
                config.sample_rate_hz,
                RESPIRATION_RATE_BAND.low_hz,
                RESPIRATION_RATE_BAND.high_hz,
                config.filter_order,
            ),
            heart_estimator: RateEstimator::new(RateEstimatorConfig::heart_rate(config.sample_rate_hz)),
            respiration_estimator: RateEstimator::new(RateEstimatorConfig::respiration_rate(
                config.sample_rate_hz,
            )),
            buffer: Vec::with_capacity(capacity),
            capacity,
            min_samples,
            config,
        }
    }

    /// Appends one phase sample and, once enough history has
    /// accumulated, returns a fresh [`VitalSigns`] readout.
    pub fn process(&mut self, sample: PhaseSample) -> Option<VitalSigns> {
        self.buffer.push(sample);
        if self.buffer.len() > self.capacity {
            self.buffer.remove(0);
        }
        if self.buffer.len() < self.min_samples {
            return None;
        }

        let motion_detected = self.is_motion(&self.buffer);

        let heart_filtered = self.heart_filter.process_buffer(&self.buffer);
        let resp_filtered = self.respiration_filter.process_buffer(&self.buffer);

        let heart = if motion_detected { None } else { self.heart_estimator.estimate(&heart_filtered) };
        let respiration =
            if motion_detected { None } else { self.respiration_estimator.estimate(&resp_filtered) };

        let signal_quality =
            (heart.as_ref().map_or(0.0, |h| h.confidence) + respiration.as_ref().map_or(0.0, |r| r.confidence))
                / 2.0;

        Some(VitalSigns {
            heart_rate_bpm: heart.as_ref().map(|h| h.rate_per_minute),
            heart_confidence: heart.map_or(0.0, |h| h.confidence),
            respiration_rate_bpm: respiration.as_ref().map(|r| r.rate_per_minute),
            respiration_confidence: respiration.map_or(0.0, |r| r.confidence),
            signal_quality,
            motion_detected,
        })
    }

    fn is_motion(&self, window: &[PhaseSample]) -> bool {
        if window.len() < 2 {
            return false;
        }
        let diffs: Vec<f32> = window.windows(2).map(|w| w[1] - w[0]).collect();
        let mean = diffs.iter().sum::<f32>() / diffs.len() as f32;
        let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f32>() / diffs.len() as f32;
        variance.sqrt() > self.config.motion_stddev_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn returns_none_until_min_samples_reached() {
        // sample_rate_hz = 2.0 puts the 5*Fs warm-up gate at 10 samples.
        let mut extractor = VitalsExtractor::new(VitalsConfig { sample_rate_hz: 2.0, ..VitalsConfig::default() });
        for _ in 0..9 {
            assert!(extractor.process(0.0).is_none());
        }
        assert!(extractor.process(0.0).is_some());
    }

    #[test]
    fn recovers_heart_rate_from_synthetic_tone() {
        let cfg = VitalsConfig { sample_rate_hz: 20.0, window_seconds: 10.0, ..VitalsConfig::default() };
        let mut extractor = VitalsExtractor::new(cfg);
        let hr_hz = 1.2; // 72 BPM
        let mut last = None;
        for i in 0..200 {
            let sample = (2.0 * PI * hr_hz * i as f32 / 20.0).sin();
            last = extractor.process(sample);
        }
        let vitals = last.unwrap();
        assert!(!vitals.motion_detected);
        assert!(vitals.heart_rate_bpm.is_some());
    }

    #[test]
    fn flags_motion_on_erratic_phase() {
        let mut extractor = VitalsExtractor::new(VitalsConfig { sample_rate_hz: 2.0, ..VitalsConfig::default() });
        let mut last = None;
        for i in 0..20 {
            let sample = if i % 2 == 0 { 50.0 } else { -50.0 };
            last = extractor.process(sample);
        }
        assert!(last.unwrap().motion_detected);
    }
}
