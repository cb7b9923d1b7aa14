//! Static-clutter removal strategies applied to range-profile bins
//! before target detection.
//!
//! A tagged enum rather than a trait hierarchy: there are exactly three
//! strategies, each with a handful of scalar parameters, and callers
//! need to serialize the active choice (see [`crate::pipeline`]'s
//! config), which a `Box<dyn Trait>` would not give us for free.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAverageConfig {
    pub alpha: f32,
    pub warmup_frames: u32,
}

impl Default for MovingAverageConfig {
    fn default() -> Self {
        Self { alpha: 0.1, warmup_frames: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MtiConfig {
    pub weights: Vec<f32>,
}

impl Default for MtiConfig {
    fn default() -> Self {
        Self { weights: vec![1.0, -1.0] }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClutterConfig {
    None,
    MovingAverage(MovingAverageConfig),
    Mti(MtiConfig),
}

impl Default for ClutterConfig {
    fn default() -> Self {
        ClutterConfig::None
    }
}

/// Per-bin clutter state. One instance covers an entire range profile;
/// internal vectors grow lazily to the first profile's length and are
/// re-sized (dropping history) if a later profile changes length.
#[derive(Debug, Clone)]
pub struct ClutterRemoval {
    config: ClutterConfig,
    background: Vec<f32>,
    frames_seen: u32,
    history: Vec<Vec<f32>>,
}

impl ClutterRemoval {
    #[must_use]
    pub fn new(config: ClutterConfig) -> Self {
        Self { config, background: Vec::new(), frames_seen: 0, history: Vec::new() }
    }

    fn ensure_len(&mut self, n: usize) {
        if self.background.len() != n {
            self.background = vec![0.0; n];
            self.frames_seen = 0;
            self.history.clear();
        }
    }

    /// Applies the configured clutter-removal strategy in place and
    /// returns the filtered profile.
    pub fn apply(&mut self, profile: &[f32]) -> Vec<f32> {
        match self.config.clone() {
            ClutterConfig::None => profile.to_vec(),
            ClutterConfig::MovingAverage(cfg) => self.apply_moving_average(profile, cfg),
            ClutterConfig::Mti(cfg) => self.apply_mti(profile, &cfg),
        }
    }

    fn apply_moving_average(&mut self, profile: &[f32], cfg: MovingAverageConfig) -> Vec<f32> {
        self.ensure_len(profile.len());
        self.frames_seen += 1;

        for (bg, &sample) in self.background.iter_mut().zip(profile.iter()) {
            *bg = cfg.alpha * sample + (1.0 - cfg.alpha) * *bg;
        }

        if self.frames_seen <= cfg.warmup_frames {
            return profile.to_vec();
        }

        profile.iter().zip(self.background.iter()).map(|(&s, &bg)| s - bg).collect()
    }

    fn apply_mti(&mut self, profile: &[f32], cfg: &MtiConfig) -> Vec<f32> {
        self.ensure_len(profile.len());
        self.history.push(profile.to_vec());
        let taps = cfg.weights.len();
        if self.history.len() > taps {
            self.history.remove(0);
        }
        if self.history.len() < taps {
            return vec![0.0; profile.len()];
        }

        let mut out = vec![0.0_f32; profile.len()];
        for (tap_frame, &weight) in self.history.iter().zip(cfg.weights.iter()) {
            for (o, &sample) in out.iter_mut().zip(tap_frame.iter()) {
                *o += weight * sample;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_strategy_passes_through_unchanged() {
        let mut removal = ClutterRemoval::new(ClutterConfig::None);
        let profile = vec![1.0, 2.0, 3.0];
        assert_eq!(removal.apply(&profile), profile);
    }

    #[test]
    fn moving_average_passes_through_unchanged_during_warmup() {
        let cfg = MovingAverageConfig { alpha: 0.5, warmup_frames: 2 };
        let mut removal = ClutterRemoval::new(ClutterConfig::MovingAverage(cfg));
        let out = removal.apply(&[1.0, 1.0]);
        assert_eq!(out, vec![1.0, 1.0]);
    }

    #[test]
    fn moving_average_subtracts_learned_background_after_warmup() {
        let cfg = MovingAverageConfig { alpha: 1.0, warmup_frames: 0 };
        let mut removal = ClutterRemoval::new(ClutterConfig::MovingAverage(cfg));
        let first = removal.apply(&[5.0]);
        // alpha = 1.0 means background snaps to the input immediately,
        // so the very first post-warmup frame is already clutter-free.
        assert!((first[0]).abs() < 1e-6);
        let second = removal.apply(&[5.0]);
        assert!((second[0]).abs() < 1e-6);
    }

    #[test]
    fn mti_two_tap_difference_cancels_static_target() {
        let cfg = MtiConfig { weights: vec![1.0, -1.0] };
        let mut removal = ClutterRemoval::new(ClutterConfig::Mti(cfg));
        removal.apply(&[3.0, 3.0]);
        let out = removal.apply(&[3.0, 3.0]);
        assert!(out.iter().all(|&v| v.abs() < 1e-6));
    }

    #[test]
    fn mti_flags_moving_target() {
        let cfg = MtiConfig { weights: vec![1.0, -1.0] };
        let mut removal = ClutterRemoval::new(ClutterConfig::Mti(cfg));
        removal.apply(&[0.0]);
        let out = removal.apply(&[10.0]);
        assert!(out[0].abs() > 1.0);
    }
}
