//! TLV (type-length-value) record types and per-type decoders.
//!
//! Each decoder treats a short or malformed payload as a decode failure
//! (`None`) rather than panicking; [`decode_frame`](super::decode_frame)
//! silently skips TLVs whose decoder returns `None` so that a single
//! corrupted record does not sink an otherwise-good frame.

use bitflags::bitflags;

pub const TLV_DETECTED_POINTS: u32 = 1;
pub const TLV_RANGE_PROFILE: u32 = 2;
pub const TLV_NOISE_PROFILE: u32 = 3;
pub const TLV_RANGE_DOPPLER: u32 = 5;
pub const TLV_STATS: u32 = 6;
pub const TLV_VITAL_SIGNS: u32 = 0x410;

pub const TLV_CHIRP_COMPLEX_RANGE_FFT: u32 = 0x0500;
pub const TLV_CHIRP_TARGET_IQ: u32 = 0x0510;
pub const TLV_CHIRP_PHASE_OUTPUT: u32 = 0x0520;
pub const TLV_CHIRP_PRESENCE: u32 = 0x0540;
pub const TLV_CHIRP_MOTION_STATUS: u32 = 0x0550;
pub const TLV_CHIRP_TARGET_INFO: u32 = 0x0560;

/// Number of samples in each vital-signs waveform when the TLV is the
/// full 192-byte layout. The 136-byte layout carries half as many.
pub const VITAL_SIGNS_WAVEFORM_SIZE: usize = 20;

bitflags! {
    /// Per-bin flags carried by the chirp-phase TLV (0x0520).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ChirpPhaseFlags: u16 {
        const MOTION = 0b01;
        const VALID  = 0b10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DetectedPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub velocity: f32,
    pub snr: f32,
    pub noise: f32,
}

impl DetectedPoint {
    #[must_use]
    pub fn range(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// A range-Doppler or range-profile magnitude map, shaped per the
/// reshape rule in the wire format: square if the element count is a
/// perfect square, `(n/256, 256)` if divisible by 256, else 1-D.
#[derive(Debug, Clone, PartialEq)]
pub enum MagnitudeMap {
    OneD(Vec<f32>),
    TwoD { rows: usize, cols: usize, data: Vec<f32> },
}

impl MagnitudeMap {
    #[must_use]
    pub fn as_flat(&self) -> &[f32] {
        match self {
            MagnitudeMap::OneD(v) => v,
            MagnitudeMap::TwoD { data, .. } => data,
        }
    }
}

fn magnitude_to_db(raw: u16) -> f32 {
    20.0 * (f32::from(raw) + 1.0).log10()
}

fn parse_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    data.get(offset..offset + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn parse_i16_le(data: &[u8], offset: usize) -> Option<i16> {
    data.get(offset..offset + 2).map(|b| i16::from_le_bytes([b[0], b[1]]))
}

fn parse_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn parse_f32_le(data: &[u8], offset: usize) -> Option<f32> {
    data.get(offset..offset + 4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(super) fn parse_detected_points(data: &[u8]) -> Option<Vec<DetectedPoint>> {
    if data.is_empty() {
        return Some(Vec::new());
    }
    let record_size = if data.len() % 24 == 0 && data.len() % 16 != 0 { 24 } else { 16 };
    if data.len() % record_size != 0 {
        return None;
    }
    let mut points = Vec::with_capacity(data.len() / record_size);
    for chunk in data.chunks_exact(record_size) {
        let x = parse_f32_le(chunk, 0)?;
        let y = parse_f32_le(chunk, 4)?;
        let z = parse_f32_le(chunk, 8)?;
        let velocity = parse_f32_le(chunk, 12)?;
        let (snr, noise) = if record_size == 24 {
            (parse_f32_le(chunk, 16)?, parse_f32_le(chunk, 20)?)
        } else {
            (0.0, 0.0)
        };
        points.push(DetectedPoint { x, y, z, velocity, snr, noise });
    }
    Some(points)
}

pub(super) fn parse_range_profile(data: &[u8]) -> Option<Vec<f32>> {
    if data.len() % 2 != 0 {
        return None;
    }
    Some(
        data.chunks_exact(2)
            .map(|c| magnitude_to_db(u16::from_le_bytes([c[0], c[1]])))
            .collect(),
    )
}

pub(super) fn parse_range_doppler(data: &[u8]) -> Option<MagnitudeMap> {
    if data.len() % 2 != 0 {
        return None;
    }
    let values: Vec<f32> = data
        .chunks_exact(2)
        .map(|c| magnitude_to_db(u16::from_le_bytes([c[0], c[1]])))
        .collect();
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let side = (n as f64).sqrt() as usize;
    if side * side == n {
        return Some(MagnitudeMap::TwoD { rows: side, cols: side, data: values });
    }
    if n % 256 == 0 {
        return Some(MagnitudeMap::TwoD { rows: n / 256, cols: 256, data: values });
    }
    Some(MagnitudeMap::OneD(values))
}

#[derive(Debug, Clone, PartialEq)]
pub struct VitalSignsTlv {
    pub range_bin_index: u16,
    pub breathing_deviation: f32,
    pub heart_deviation: f32,
    pub breathing_rate: f32,
    pub heart_rate: f32,
    pub breathing_confidence: f32,
    pub heart_confidence: f32,
    pub breathing_waveform: Vec<f32>,
    pub heart_waveform: Vec<f32>,
    pub unwrapped_phase: f32,
}

impl VitalSignsTlv {
    /// Parses the vital-signs TLV (type `0x410`). Accepts both the
    /// full 192-byte layout (20-sample waveforms, terminal phase field)
    /// and the 136-byte layout seen on some firmware builds (10-sample
    /// waveforms, no phase field, treated as `0.0`).
    pub(super) fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 136 {
            return None;
        }
        let range_bin_index = parse_u16_le(data, 0)?;
        let breathing_deviation = parse_f32_le(data, 4)?;
        let heart_deviation = parse_f32_le(data, 8)?;
        let breathing_rate = parse_f32_le(data, 12)?;
        let heart_rate = parse_f32_le(data, 16)?;
        let breathing_confidence = parse_f32_le(data, 20)?;
        let heart_confidence = parse_f32_le(data, 24)?;

        let waveform_size = if data.len() >= 192 { 20 } else { 10 };
        let breath_start = 28;
        let breath_end = breath_start + waveform_size * 4;
        let heart_end = breath_end + waveform_size * 4;
        if data.len() < heart_end {
            return None;
        }
        let breathing_waveform = (0..waveform_size)
            .map(|i| parse_f32_le(data, breath_start + i * 4))
            .collect::<Option<Vec<f32>>>()?;
        let heart_waveform = (0..waveform_size)
            .map(|i| parse_f32_le(data, breath_end + i * 4))
            .collect::<Option<Vec<f32>>>()?;

        let unwrapped_phase = if data.len() >= heart_end + 4 {
            parse_f32_le(data, heart_end)?
        } else {
            0.0
        };

        Some(VitalSignsTlv {
            range_bin_index,
            breathing_deviation,
            heart_deviation,
            breathing_rate,
            heart_rate,
            breathing_confidence,
            heart_confidence,
            breathing_waveform,
            heart_waveform,
            unwrapped_phase,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChirpPhaseBin {
    pub bin_index: u16,
    pub phase: f32,
    pub magnitude: u16,
    pub flags: ChirpPhaseFlags,
}

impl ChirpPhaseBin {
    #[must_use]
    pub fn has_motion(&self) -> bool {
        self.flags.contains(ChirpPhaseFlags::MOTION)
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.flags.contains(ChirpPhaseFlags::VALID)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChirpPhaseOutput {
    pub num_bins: u16,
    pub center_bin: u16,
    pub timestamp_us: u32,
    pub bins: Vec<ChirpPhaseBin>,
}

impl ChirpPhaseOutput {
    pub(super) fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let num_bins = parse_u16_le(data, 0)?;
        let center_bin = parse_u16_le(data, 2)?;
        let timestamp_us = parse_u32_le(data, 4)?;
        let mut bins = Vec::with_capacity(num_bins as usize);
        for i in 0..num_bins as usize {
            let offset = 8 + i * 8;
            if offset + 8 > data.len() {
                break;
            }
            let bin_index = parse_u16_le(data, offset)?;
            let phase_raw = parse_i16_le(data, offset + 2)?;
            let magnitude = parse_u16_le(data, offset + 4)?;
            let flags_raw = parse_u16_le(data, offset + 6)?;
            let phase = (f32::from(phase_raw) / 32768.0) * std::f32::consts::PI;
            bins.push(ChirpPhaseBin {
                bin_index,
                phase,
                magnitude,
                flags: ChirpPhaseFlags::from_bits_truncate(flags_raw),
            });
        }
        Some(ChirpPhaseOutput { num_bins, center_bin, timestamp_us, bins })
    }

    /// Returns the center bin's phase if present and valid, else the
    /// phase of the first valid bin, else `None` if no bin is valid.
    #[must_use]
    pub fn center_phase(&self) -> Option<f32> {
        if let Some(b) = self.bins.iter().find(|b| b.bin_index == self.center_bin && b.is_valid()) {
            return Some(b.phase);
        }
        self.bins.iter().find(|b| b.is_valid()).map(|b| b.phase)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexSample {
    pub re: f32,
    pub im: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChirpTargetIq {
    pub num_bins: u16,
    pub center_bin: u16,
    pub timestamp_us: u32,
    pub bin_indices: Vec<u16>,
    pub iq: Vec<ComplexSample>,
}

impl ChirpTargetIq {
    pub(super) fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let num_bins = parse_u16_le(data, 0)?;
        let center_bin = parse_u16_le(data, 2)?;
        let timestamp_us = parse_u32_le(data, 4)?;
        let mut bin_indices = Vec::new();
        let mut iq = Vec::new();
        for i in 0..num_bins as usize {
            let offset = 8 + i * 8;
            if offset + 8 > data.len() {
                break;
            }
            let bin_idx = parse_u16_le(data, offset)?;
            let imag = parse_i16_le(data, offset + 2)?;
            let real = parse_i16_le(data, offset + 4)?;
            bin_indices.push(bin_idx);
            iq.push(ComplexSample { re: f32::from(real), im: f32::from(imag) });
        }
        Some(ChirpTargetIq { num_bins, center_bin, timestamp_us, bin_indices, iq })
    }

    /// True phase (`atan2(im, re)`) of the center bin's I/Q sample, or
    /// the first available sample if the center bin was not reported.
    #[must_use]
    pub fn phase(&self) -> f32 {
        let index = self
            .bin_indices
            .iter()
            .position(|&b| b == self.center_bin)
            .unwrap_or(0);
        self.iq.get(index).map_or(0.0, |s| s.im.atan2(s.re))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChirpPresence {
    pub presence: u8,
    pub confidence: u8,
    pub range_m: f32,
    pub target_bin: u16,
}

impl ChirpPresence {
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.presence > 0
    }

    #[must_use]
    pub fn has_motion(&self) -> bool {
        self.presence == 2
    }

    pub(super) fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let presence = *data.first()?;
        let confidence = *data.get(1)?;
        let range_q8 = parse_u16_le(data, 2)?;
        let target_bin = parse_u16_le(data, 4)?;
        Some(ChirpPresence { presence, confidence, range_m: f32::from(range_q8) / 256.0, target_bin })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChirpMotionStatus {
    pub motion_detected: bool,
    pub motion_level: u8,
    pub motion_bin_count: u16,
    pub peak_motion_bin: u16,
    pub peak_motion_delta: u16,
}

impl ChirpMotionStatus {
    pub(super) fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let detected = *data.first()?;
        let level = *data.get(1)?;
        let bin_count = parse_u16_le(data, 2)?;
        let peak_bin = parse_u16_le(data, 4)?;
        let peak_delta = parse_u16_le(data, 6)?;
        Some(ChirpMotionStatus {
            motion_detected: detected != 0,
            motion_level: level,
            motion_bin_count: bin_count,
            peak_motion_bin: peak_bin,
            peak_motion_delta: peak_delta,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChirpTargetInfo {
    pub primary_bin: u16,
    pub primary_magnitude: u16,
    pub range_m: f32,
    pub confidence: u8,
    pub num_targets: u8,
    pub secondary_bin: u16,
}

impl ChirpTargetInfo {
    pub(super) fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }
        let primary_bin = parse_u16_le(data, 0)?;
        let primary_magnitude = parse_u16_le(data, 2)?;
        let range_q8 = parse_u16_le(data, 4)?;
        let confidence = *data.get(6)?;
        let num_targets = *data.get(7)?;
        let secondary_bin = parse_u16_le(data, 8)?;
        Some(ChirpTargetInfo {
            primary_bin,
            primary_magnitude,
            range_m: f32::from(range_q8) / 256.0,
            confidence,
            num_targets,
            secondary_bin,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChirpComplexRangeFft {
    pub num_range_bins: u16,
    pub chirp_index: u16,
    pub rx_antenna: u16,
    pub iq: Vec<ComplexSample>,
}

impl ChirpComplexRangeFft {
    pub(super) fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let num_bins = parse_u16_le(data, 0)?;
        let chirp_index = parse_u16_le(data, 2)?;
        let rx_antenna = parse_u16_le(data, 4)?;
        let mut iq = Vec::with_capacity(num_bins as usize);
        for i in 0..num_bins as usize {
            let offset = 8 + i * 4;
            if offset + 4 > data.len() {
                break;
            }
            let imag = parse_i16_le(data, offset)?;
            let real = parse_i16_le(data, offset + 2)?;
            iq.push(ComplexSample { re: f32::from(real), im: f32::from(imag) });
        }
        Some(ChirpComplexRangeFft { num_range_bins: num_bins, chirp_index, rx_antenna, iq })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_to_db_matches_formula() {
        for v in [0u16, 1, 255, 65535] {
            let expected = 20.0 * (f32::from(v) + 1.0).log10();
            assert!((magnitude_to_db(v) - expected).abs() <= f32::EPSILON);
        }
    }

    #[test]
    fn detected_points_infers_16_byte_records() {
        let mut data = Vec::new();
        for f in [1.0f32, 0.5, 0.1, 0.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        let points = parse_detected_points(&data).unwrap();
        assert_eq!(points.len(), 1);
        assert!((points[0].x - 1.0).abs() < f32::EPSILON);
        assert!((points[0].y - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn detected_points_infers_24_byte_records() {
        let mut data = Vec::new();
        for f in [1.0f32, 0.5, 0.1, 0.0, 12.0, 3.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        let points = parse_detected_points(&data).unwrap();
        assert_eq!(points.len(), 1);
        assert!((points[0].snr - 12.0).abs() < f32::EPSILON);
        assert!((points[0].noise - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn chirp_phase_q15_round_trip() {
        let theta = 1.2345_f32;
        let q15 = (theta / std::f32::consts::PI * 32768.0).round() as i16;
        let mut data = vec![0u8; 8];
        data[0..2].copy_from_slice(&1u16.to_le_bytes()); // num_bins
        data[2..4].copy_from_slice(&0u16.to_le_bytes()); // center_bin
        data[4..8].copy_from_slice(&0u32.to_le_bytes()); // timestamp
        data.extend_from_slice(&0u16.to_le_bytes()); // bin_index
        data.extend_from_slice(&q15.to_le_bytes()); // phase
        data.extend_from_slice(&0u16.to_le_bytes()); // magnitude
        data.extend_from_slice(&ChirpPhaseFlags::VALID.bits().to_le_bytes());
        let decoded = ChirpPhaseOutput::from_bytes(&data).unwrap();
        let phase = decoded.bins[0].phase;
        assert!((phase - theta).abs() <= std::f32::consts::PI / 32768.0 + f32::EPSILON);
    }

    #[test]
    fn range_doppler_reshapes_to_square() {
        let n = 64usize;
        let data: Vec<u8> = (0..n).flat_map(|i| (i as u16).to_le_bytes()).collect();
        match parse_range_doppler(&data).unwrap() {
            MagnitudeMap::TwoD { rows, cols, .. } => {
                assert_eq!(rows, 8);
                assert_eq!(cols, 8);
            }
            MagnitudeMap::OneD(_) => panic!("expected square reshape"),
        }
    }

    #[test]
    fn range_doppler_reshapes_to_256_columns() {
        let n = 512usize;
        let data: Vec<u8> = (0..n).flat_map(|i| (i as u16).to_le_bytes()).collect();
        match parse_range_doppler(&data).unwrap() {
            MagnitudeMap::TwoD { rows, cols, .. } => {
                assert_eq!(cols, 256);
                assert_eq!(rows, 2);
            }
            MagnitudeMap::OneD(_) => panic!("expected 256-column reshape"),
        }
    }

    #[test]
    fn range_doppler_stays_1d_otherwise() {
        let n = 10usize;
        let data: Vec<u8> = (0..n).flat_map(|i| (i as u16).to_le_bytes()).collect();
        match parse_range_doppler(&data).unwrap() {
            MagnitudeMap::OneD(v) => assert_eq!(v.len(), 10),
            MagnitudeMap::TwoD { .. } => panic!("expected 1-D"),
        }
    }

    #[test]
    fn chirp_phase_center_bin_fallback() {
        let mut data = Vec::new();
        data.extend_from_slice(&2u16.to_le_bytes()); // num_bins
        data.extend_from_slice(&15u16.to_le_bytes()); // center_bin
        data.extend_from_slice(&0u32.to_le_bytes()); // timestamp
        for (bin, phase) in [(10u16, 0.1f32), (20u16, 0.2f32)] {
            let q15 = (phase / std::f32::consts::PI * 32768.0).round() as i16;
            data.extend_from_slice(&bin.to_le_bytes());
            data.extend_from_slice(&q15.to_le_bytes());
            data.extend_from_slice(&0u16.to_le_bytes());
            data.extend_from_slice(&ChirpPhaseFlags::VALID.bits().to_le_bytes());
        }
        let decoded = ChirpPhaseOutput::from_bytes(&data).unwrap();
        let phase = decoded.center_phase().unwrap();
        assert!((phase - 0.1).abs() < 1e-3);
    }

    #[test]
    fn vital_signs_tlv_long_form() {
        let mut data = vec![0u8; 192];
        data[0..2].copy_from_slice(&50u16.to_le_bytes());
        data[4..8].copy_from_slice(&0.0f32.to_le_bytes());
        data[8..12].copy_from_slice(&0.0f32.to_le_bytes());
        data[12..16].copy_from_slice(&15.0f32.to_le_bytes());
        data[16..20].copy_from_slice(&72.0f32.to_le_bytes());
        data[20..24].copy_from_slice(&0.9f32.to_le_bytes());
        data[24..28].copy_from_slice(&0.85f32.to_le_bytes());
        let vitals = VitalSignsTlv::from_bytes(&data).unwrap();
        assert!((vitals.heart_rate - 72.0).abs() < f32::EPSILON);
        assert!((vitals.breathing_rate - 15.0).abs() < f32::EPSILON);
        assert_eq!(vitals.breathing_waveform.len(), 20);
        assert_eq!(vitals.heart_waveform.len(), 20);
    }

    #[test]
    fn vital_signs_tlv_short_form() {
        let mut data = vec![0u8; 136];
        data[16..20].copy_from_slice(&72.0f32.to_le_bytes());
        data[12..16].copy_from_slice(&15.0f32.to_le_bytes());
        let vitals = VitalSignsTlv::from_bytes(&data).unwrap();
        assert_eq!(vitals.breathing_waveform.len(), 10);
        assert_eq!(vitals.heart_waveform.len(), 10);
        assert!((vitals.unwrapped_phase - 0.0).abs() < f32::EPSILON);
    }
}
