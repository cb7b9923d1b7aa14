//! Vital-signs estimation driven directly by the chirp-domain phase
//! TLV (0x0520), bypassing the legacy range-profile pipeline entirely.
//! Firmware builds that only emit chirp TLVs still need a vitals
//! readout, so this wraps the same [`super::VitalsExtractor`] core
//! behind an unwrapper fed straight from [`crate::frame::tlv::ChirpPhaseOutput`].

use crate::frame::tlv::ChirpPhaseOutput;
use crate::unwrap::PhaseUnwrapper;
use crate::vitals::{VitalsConfig, VitalsExtractor, VitalSigns};

pub struct ChirpVitalsEstimator {
    unwrapper: PhaseUnwrapper,
    extractor: VitalsExtractor,
}

impl ChirpVitalsEstimator {
    #[must_use]
    pub fn new(config: VitalsConfig) -> Self {
        Self { unwrapper: PhaseUnwrapper::new(), extractor: VitalsExtractor::new(config) }
    }

    /// Feeds one chirp-phase TLV through the unwrapper and vitals
    /// extractor. Returns `None` both when there is not yet enough
    /// history and when the TLV carried no valid bin.
    pub fn process(&mut self, output: &ChirpPhaseOutput) -> Option<VitalSigns> {
        let phase = output.center_phase()?;
        let unwrapped = self.unwrapper.unwrap_sample(phase);
        self.extractor.process(unwrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::tlv::{ChirpPhaseBin, ChirpPhaseFlags};

    fn output_with_phase(phase: f32) -> ChirpPhaseOutput {
        ChirpPhaseOutput {
            num_bins: 1,
            center_bin: 0,
            timestamp_us: 0,
            bins: vec![ChirpPhaseBin { bin_index: 0, phase, magnitude: 100, flags: ChirpPhaseFlags::VALID }],
        }
    }

    #[test]
    fn returns_none_with_no_valid_bin() {
        let mut estimator = ChirpVitalsEstimator::new(VitalsConfig::default());
        let empty = ChirpPhaseOutput { num_bins: 0, center_bin: 0, timestamp_us: 0, bins: vec![] };
        assert!(estimator.process(&empty).is_none());
    }

    #[test]
    fn accumulates_toward_a_readout() {
        // sample_rate_hz = 1.0 puts the 5*Fs warm-up gate at 5 samples.
        let cfg = VitalsConfig { sample_rate_hz: 1.0, ..VitalsConfig::default() };
        let mut estimator = ChirpVitalsEstimator::new(cfg);
        let mut last = None;
        for i in 0..10 {
            last = estimator.process(&output_with_phase(0.01 * i as f32));
        }
        assert!(last.is_some());
    }
}
