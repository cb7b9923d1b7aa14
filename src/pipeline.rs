//! Per-frame target detection and phase extraction.
//!
//! Sits between the raw decoded [`crate::frame::Frame`] and the
//! vital-signs estimators: it picks the target bin for the current
//! frame and turns its range-profile or chirp-phase data into one
//! scalar phase sample per frame.

use serde::{Deserialize, Serialize};

use crate::clutter::{ClutterConfig, ClutterRemoval};
use crate::frame::Frame;
use crate::types::{PhaseSample, TimestampSeconds};
use crate::unwrap::PhaseUnwrapper;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub range_resolution_m: f32,
    pub range_gate_min_m: f32,
    pub range_gate_max_m: f32,
    pub detection_threshold_sigma: f32,
    pub magnitude_history_len: usize,
    pub magnitude_scale: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            range_resolution_m: 0.044,
            range_gate_min_m: 0.3,
            range_gate_max_m: 2.0,
            detection_threshold_sigma: 3.0,
            magnitude_history_len: 200,
            magnitude_scale: 0.1,
        }
    }
}

/// One frame's worth of pipeline output: the selected target bin (if
/// any) and the scalar phase/displacement sample extracted for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessedFrame {
    pub timestamp: TimestampSeconds,
    pub target_bin: Option<usize>,
    pub target_range_m: Option<f32>,
    pub phase: Option<PhaseSample>,
}

/// Drives clutter removal, target-bin detection, and phase extraction
/// across successive frames. Holds the per-bin magnitude history used
/// by the magnitude-proxy phase path and the unwrapper's running
/// offset, both of which only make sense carried across frames.
pub struct ProcessingPipeline {
    config: PipelineConfig,
    clutter: ClutterRemoval,
    unwrapper: PhaseUnwrapper,
    magnitude_history: Vec<f32>,
}

impl ProcessingPipeline {
    #[must_use]
    pub fn new(config: PipelineConfig, clutter_config: ClutterConfig) -> Self {
        Self {
            config,
            clutter: ClutterRemoval::new(clutter_config),
            unwrapper: PhaseUnwrapper::new(),
            magnitude_history: Vec::new(),
        }
    }

    pub fn process(&mut self, frame: &Frame) -> ProcessedFrame {
        let Some(profile) = frame.range_profile.clone() else {
            return self.process_without_profile(frame);
        };
        let filtered = self.clutter.apply(&profile);
        let Some(bin) = self.detect_target(&filtered) else {
            return ProcessedFrame {
                timestamp: frame.timestamp,
                target_bin: None,
                target_range_m: None,
                phase: None,
            };
        };

        let phase = self.extract_phase(frame, &filtered, bin);
        ProcessedFrame {
            timestamp: frame.timestamp,
            target_bin: Some(bin),
            target_range_m: Some(bin as f32 * self.config.range_resolution_m),
            phase,
        }
    }

    /// Frames that only carry chirp-domain TLVs (no legacy range
    /// profile) still expose a target bin via [`crate::frame::tlv::ChirpTargetInfo`].
    fn process_without_profile(&mut self, frame: &Frame) -> ProcessedFrame {
        let phase = frame
            .chirp_phase
            .as_ref()
            .and_then(crate::frame::tlv::ChirpPhaseOutput::center_phase)
            .map(|q15_phase| self.unwrapper.unwrap_sample(q15_phase));

        ProcessedFrame {
            timestamp: frame.timestamp,
            target_bin: frame.chirp_target_info.as_ref().map(|_| 0),
            target_range_m: None,
            phase,
        }
    }

    fn detect_target(&self, profile: &[f32]) -> Option<usize> {
        if profile.is_empty() {
            return None;
        }
        let min_bin = (self.config.range_gate_min_m / self.config.range_resolution_m) as usize;
        let max_bin = (self.config.range_gate_max_m / self.config.range_resolution_m) as usize;
        let max_bin = max_bin.min(profile.len().saturating_sub(1));
        if min_bin > max_bin {
            return None;
        }

        let abs_profile: Vec<f32> = profile.iter().map(|v| v.abs()).collect();
        let mean = abs_profile.iter().sum::<f32>() / abs_profile.len() as f32;
        let variance =
            abs_profile.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / abs_profile.len() as f32;
        let threshold = mean + self.config.detection_threshold_sigma * variance.sqrt();

        (min_bin..=max_bin)
            .filter(|&i| abs_profile[i] > threshold)
            .max_by(|&a, &b| abs_profile[a].partial_cmp(&abs_profile[b]).unwrap())
    }

    /// True phase when complex I/Q is available for the bin; otherwise
    /// a magnitude-proxy path that subtracts a running mean from the
    /// real-valued bin magnitude and scales the residual into a
    /// displacement-like unit.
    fn extract_phase(&mut self, frame: &Frame, profile: &[f32], bin: usize) -> Option<PhaseSample> {
        if let Some(iq) = frame.chirp_target_iq.as_ref() {
            let raw_phase = iq.phase();
            return Some(self.unwrapper.unwrap_sample(raw_phase));
        }

        let magnitude = *profile.get(bin)?;
        self.magnitude_history.push(magnitude);
        if self.magnitude_history.len() > self.config.magnitude_history_len {
            self.magnitude_history.remove(0);
        }
        let running_mean =
            self.magnitude_history.iter().sum::<f32>() / self.magnitude_history.len() as f32;
        Some((magnitude - running_mean) * self.config.magnitude_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameHeader;

    fn frame_with_profile(profile: Vec<f32>) -> Frame {
        Frame {
            header: FrameHeader::default(),
            timestamp: 0.0,
            range_profile: Some(profile),
            ..Frame::default()
        }
    }

    #[test]
    fn detects_target_above_threshold_within_gate() {
        let mut pipeline = ProcessingPipeline::new(PipelineConfig::default(), ClutterConfig::None);
        let mut profile = vec![0.1; 60];
        let target_bin = 20; // 20 * 0.044 ~= 0.88m, inside [0.3, 2.0]
        profile[target_bin] = 50.0;
        let processed = pipeline.process(&frame_with_profile(profile));
        assert_eq!(processed.target_bin, Some(target_bin));
        assert!(processed.target_range_m.unwrap() >= 0.3);
    }

    #[test]
    fn no_target_found_when_profile_is_flat() {
        let mut pipeline = ProcessingPipeline::new(PipelineConfig::default(), ClutterConfig::None);
        let processed = pipeline.process(&frame_with_profile(vec![1.0; 60]));
        assert!(processed.target_bin.is_none());
        assert!(processed.phase.is_none());
    }

    #[test]
    fn target_outside_range_gate_is_ignored() {
        let mut pipeline = ProcessingPipeline::new(PipelineConfig::default(), ClutterConfig::None);
        let mut profile = vec![0.1; 60];
        profile[2] = 50.0; // ~0.088m, below the 0.3m gate
        let processed = pipeline.process(&frame_with_profile(profile));
        assert!(processed.target_bin.is_none());
    }

    #[test]
    fn magnitude_proxy_phase_tracks_residual_from_running_mean() {
        let mut pipeline = ProcessingPipeline::new(PipelineConfig::default(), ClutterConfig::None);
        let mut profile = vec![0.1; 60];
        profile[20] = 50.0;
        for _ in 0..5 {
            pipeline.process(&frame_with_profile(profile.clone()));
        }
        let processed = pipeline.process(&frame_with_profile(profile));
        assert!(processed.phase.is_some());
    }
}
