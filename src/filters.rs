//! Signal-conditioning primitives shared by the vital-signs estimators:
//! a biquad bandpass cascade, a running median, and an exponential
//! smoother.

/// A single Butterworth-style bandpass biquad section in RBJ cookbook
/// form, run twice (forward then reverse) by [`BandpassFilter`] to
/// approximate the zero-phase `sosfiltfilt` behavior of the original
/// offline filter without needing a full SOS design routine.
#[derive(Debug, Clone, Copy, Default)]
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn bandpass(sample_rate_hz: f32, center_hz: f32, q: f32) -> Self {
        let w0 = 2.0 * std::f32::consts::PI * center_hz / sample_rate_hz;
        let alpha = w0.sin() / (2.0 * q);
        let cos_w0 = w0.cos();

        let b0 = alpha;
        let b1 = 0.0;
        let b2 = -alpha;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            ..Self::default()
        }
    }

    fn process_sample(&mut self, x0: f32) -> f32 {
        let y0 = self.b0 * x0 + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x0;
        self.y2 = self.y1;
        self.y1 = y0;
        y0
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// A cascade of bandpass biquads, one per filter order/2 stage,
/// offering both a real-time `process_sample` path and a batch
/// `filtfilt`-style zero-phase path for buffered analysis windows.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    stages: Vec<Biquad>,
    order: u32,
}

impl BandpassFilter {
    /// `order` must be even; each pair of poles becomes one biquad
    /// section. `low_hz`/`high_hz` bound the passband.
    #[must_use]
    pub fn new(sample_rate_hz: f32, low_hz: f32, high_hz: f32, order: u32) -> Self {
        let center = (low_hz * high_hz).sqrt();
        let bandwidth = high_hz - low_hz;
        let q = center / bandwidth.max(1e-6);
        let sections = (order / 2).max(1);
        let stages = (0..sections).map(|_| Biquad::bandpass(sample_rate_hz, center, q)).collect();
        Self { stages, order }
    }

    /// Real-time single-sample path: causal, not zero-phase. Intended
    /// for streaming use where `process_buffer`'s forward/backward pass
    /// is not possible.
    pub fn process_sample(&mut self, sample: f32) -> f32 {
        self.stages.iter_mut().fold(sample, |acc, stage| stage.process_sample(acc))
    }

    /// Zero-phase filtering of a complete buffer: one forward pass,
    /// then one reverse pass over the result, canceling the net phase
    /// shift at the cost of requiring the whole window up front. Falls
    /// back to a single causal forward pass if the buffer is too short
    /// for the reverse pass to be meaningful.
    #[must_use]
    pub fn process_buffer(&self, samples: &[f32]) -> Vec<f32> {
        if samples.len() < 3 * self.order as usize {
            let mut stages = self.stages.clone();
            return samples.iter().map(|&s| stages.iter_mut().fold(s, |a, st| st.process_sample(a))).collect();
        }

        let mut forward_stages = self.stages.clone();
        for s in &mut forward_stages {
            s.reset();
        }
        let forward: Vec<f32> =
            samples.iter().map(|&s| forward_stages.iter_mut().fold(s, |a, st| st.process_sample(a))).collect();

        let mut backward_stages = self.stages.clone();
        for s in &mut backward_stages {
            s.reset();
        }
        let mut backward: Vec<f32> = forward
            .iter()
            .rev()
            .map(|&s| backward_stages.iter_mut().fold(s, |a, st| st.process_sample(a)))
            .collect();
        backward.reverse();
        backward
    }
}

/// Running median over a fixed-size window, used to reject impulsive
/// phase-unwrap glitches before rate estimation.
#[derive(Debug, Clone)]
pub struct MedianFilter {
    window: Vec<f32>,
    capacity: usize,
}

impl MedianFilter {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { window: Vec::with_capacity(capacity.max(1)), capacity: capacity.max(1) }
    }

    pub fn update(&mut self, sample: f32) -> f32 {
        self.window.push(sample);
        if self.window.len() > self.capacity {
            self.window.remove(0);
        }
        let mut sorted = self.window.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        sorted[sorted.len() / 2]
    }
}

/// Single-pole exponential smoother: `y = alpha * x + (1 - alpha) * y`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialSmoother {
    alpha: f32,
    value: Option<f32>,
}

impl ExponentialSmoother {
    #[must_use]
    pub fn new(alpha: f32) -> Self {
        Self { alpha, value: None }
    }

    pub fn update(&mut self, sample: f32) -> f32 {
        let next = match self.value {
            Some(prev) => self.alpha * sample + (1.0 - self.alpha) * prev,
            None => sample,
        };
        self.value = Some(next);
        next
    }

    #[must_use]
    pub fn current(&self) -> Option<f32> {
        self.value
    }
}
