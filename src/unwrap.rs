//! Phase unwrapping.
//!
//! The original sensor software carried two copies of this algorithm
//! (one in its processing pipeline, one in its filter bank); they were
//! identical, so this crate keeps exactly one.

use std::f32::consts::PI;

/// Unwraps a stream of phase samples one at a time, tracking a
/// cumulative 2π offset so that successive calls see a continuous
/// signal rather than one that wraps at ±π.
#[derive(Debug, Clone, Default)]
pub struct PhaseUnwrapper {
    previous: Option<f32>,
    offset: f32,
}

impl PhaseUnwrapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.offset = 0.0;
    }

    /// Feeds one wrapped phase sample (radians, expected in `[-π, π]`)
    /// and returns the corresponding unwrapped value.
    pub fn unwrap_sample(&mut self, sample: f32) -> f32 {
        if let Some(prev) = self.previous {
            let delta = sample - prev;
            if delta > PI {
                self.offset -= 2.0 * PI;
            } else if delta < -PI {
                self.offset += 2.0 * PI;
            }
        }
        self.previous = Some(sample);
        sample + self.offset
    }

    /// Unwraps an entire buffer from a fresh state, leaving `self`
    /// unaffected by any prior streaming calls.
    #[must_use]
    pub fn unwrap_buffer(samples: &[f32]) -> Vec<f32> {
        let mut unwrapper = PhaseUnwrapper::new();
        samples.iter().map(|&s| unwrapper.unwrap_sample(s)).collect()
    }
}
