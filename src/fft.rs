//! Zero-padded FFT magnitude spectrum, used by the rate estimators to
//! turn a filtered waveform into a frequency-domain peak search.

use num_complex::Complex32;
use rustfft::FftPlanner;

/// One bin of a magnitude spectrum: its center frequency in Hz and its
/// magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBin {
    pub frequency_hz: f32,
    pub magnitude: f32,
}

/// Computes the magnitude spectrum of `samples`, zero-padded to
/// `samples.len() * zero_pad_factor` before transforming, which
/// interpolates the spectrum for a finer peak-frequency estimate
/// without changing the underlying frequency resolution.
#[must_use]
pub fn magnitude_spectrum(samples: &[f32], sample_rate_hz: f32, zero_pad_factor: usize) -> Vec<SpectrumBin> {
    if samples.is_empty() {
        return Vec::new();
    }
    let padded_len = (samples.len() * zero_pad_factor.max(1)).next_power_of_two();
    let mut buffer: Vec<Complex32> = samples.iter().map(|&s| Complex32::new(s, 0.0)).collect();
    buffer.resize(padded_len, Complex32::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(padded_len);
    fft.process(&mut buffer);

    let half = padded_len / 2;
    (0..half)
        .map(|k| SpectrumBin {
            frequency_hz: k as f32 * sample_rate_hz / padded_len as f32,
            magnitude: buffer[k].norm() / padded_len as f32,
        })
        .collect()
}

/// Finds the highest-magnitude bin whose frequency lies within
/// `[low_hz, high_hz]`, along with the mean magnitude across that same
/// band (used by the rate estimators' confidence formula).
#[must_use]
pub fn peak_in_band(spectrum: &[SpectrumBin], low_hz: f32, high_hz: f32) -> Option<(SpectrumBin, f32)> {
    let in_band: Vec<&SpectrumBin> =
        spectrum.iter().filter(|b| b.frequency_hz >= low_hz && b.frequency_hz <= high_hz).collect();
    if in_band.is_empty() {
        return None;
    }
    let mean_mag = in_band.iter().map(|b| b.magnitude).sum::<f32>() / in_band.len() as f32;
    let peak = **in_band.iter().max_by(|a, b| a.magnitude.partial_cmp(&b.magnitude).unwrap())?;
    Some((peak, mean_mag))
}
