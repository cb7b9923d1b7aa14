//! Radar frame parsing: header, TLV dispatch, and the streaming framer.
//!
//! The wire format has no CRC; the magic marker is the only
//! resynchronization anchor. See [`framer::Framer`] for the streaming
//! byte-to-frame state machine and [`tlv`] for the individual TLV record
//! decoders.

pub mod framer;
pub mod tlv;

use crate::types::TimestampSeconds;
use tlv::{
    ChirpComplexRangeFft, ChirpMotionStatus, ChirpPhaseOutput, ChirpPresence, ChirpTargetInfo,
    ChirpTargetIq, DetectedPoint, MagnitudeMap, VitalSignsTlv,
};

pub const MAGIC_WORD: [u8; 8] = [0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07];
pub const HEADER_SIZE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    pub version: u32,
    pub packet_length: u32,
    pub platform: u32,
    pub frame_number: u32,
    pub time_cpu_cycles: u32,
    pub num_detected_obj: u32,
    pub num_tlvs: u32,
    pub subframe_number: u32,
}

impl FrameHeader {
    /// Parses the 40-byte header, including the 8-byte magic marker
    /// that precedes the numeric fields. Returns `None` if `data` is
    /// shorter than [`HEADER_SIZE`] or the marker does not match.
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Option<FrameHeader> {
        if data.len() < HEADER_SIZE || data[0..8] != MAGIC_WORD {
            return None;
        }
        let word = |off: usize| -> u32 {
            u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
        };
        Some(FrameHeader {
            version: word(8),
            packet_length: word(12),
            platform: word(16),
            frame_number: word(20),
            time_cpu_cycles: word(24),
            num_detected_obj: word(28),
            num_tlvs: word(32),
            subframe_number: word(36),
        })
    }
}

/// A fully decoded radar frame. Unknown or malformed TLVs are skipped
/// silently; absence of a field here means either the sensor did not
/// emit that TLV, or its payload failed to decode.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub header: FrameHeader,
    pub timestamp: TimestampSeconds,
    pub detected_points: Vec<DetectedPoint>,
    pub range_profile: Option<Vec<f32>>,
    pub range_doppler: Option<MagnitudeMap>,
    pub vital_signs: Option<VitalSignsTlv>,
    pub chirp_complex_fft: Option<ChirpComplexRangeFft>,
    pub chirp_target_iq: Option<ChirpTargetIq>,
    pub chirp_phase: Option<ChirpPhaseOutput>,
    pub chirp_presence: Option<ChirpPresence>,
    pub chirp_motion: Option<ChirpMotionStatus>,
    pub chirp_target_info: Option<ChirpTargetInfo>,
}

impl Frame {
    /// Decodes a single, already-delimited frame (header plus all its
    /// TLVs) from a byte slice whose length matches the header's
    /// `packet_length`. Intended for callers with a complete frame
    /// already in hand (fixtures, tests, single-shot replay); a
    /// streaming byte source should use [`framer::Framer`] instead,
    /// which delegates to the same [`decode_frame`] dispatch.
    #[must_use]
    pub fn from_bytes(data: &[u8], timestamp: TimestampSeconds) -> Option<Frame> {
        let header = FrameHeader::from_bytes(data)?;
        Some(decode_frame(header, data, timestamp))
    }
}

/// Walks the TLVs following a 40-byte header and builds a [`Frame`].
/// This is the single TLV-dispatch implementation in the crate; both
/// [`Frame::from_bytes`] and [`framer::Framer::extract_frame`] call it
/// so that a streaming decode and a one-shot decode can never diverge.
#[must_use]
pub fn decode_frame(header: FrameHeader, data: &[u8], timestamp: TimestampSeconds) -> Frame {
    let mut frame = Frame { header, timestamp, ..Frame::default() };

    let mut offset = HEADER_SIZE;
    for _ in 0..header.num_tlvs {
        if offset + 8 > data.len() {
            break;
        }
        let tlv_type = u32::from_le_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        let tlv_length = u32::from_le_bytes([
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
            data[offset + 7],
        ]) as usize;
        let payload_start = offset + 8;
        let payload_end = payload_start + tlv_length;
        if payload_end > data.len() {
            break;
        }
        let payload = &data[payload_start..payload_end];
        offset = payload_end;

        match tlv_type {
            tlv::TLV_DETECTED_POINTS => {
                if let Some(points) = tlv::parse_detected_points(payload) {
                    frame.detected_points = points;
                } else {
                    tracing::warn!(tlv_type, "failed to decode detected-points TLV");
                }
            }
            tlv::TLV_RANGE_PROFILE => match tlv::parse_range_profile(payload) {
                Some(profile) => frame.range_profile = Some(profile),
                None => tracing::warn!(tlv_type, "failed to decode range-profile TLV"),
            },
            tlv::TLV_RANGE_DOPPLER => match tlv::parse_range_doppler(payload) {
                Some(map) => frame.range_doppler = Some(map),
                None => tracing::warn!(tlv_type, "failed to decode range-doppler TLV"),
            },
            tlv::TLV_VITAL_SIGNS => frame.vital_signs = VitalSignsTlv::from_bytes(payload),
            tlv::TLV_CHIRP_COMPLEX_RANGE_FFT => {
                frame.chirp_complex_fft = ChirpComplexRangeFft::from_bytes(payload);
            }
            tlv::TLV_CHIRP_TARGET_IQ => frame.chirp_target_iq = ChirpTargetIq::from_bytes(payload),
            tlv::TLV_CHIRP_PHASE_OUTPUT => {
                frame.chirp_phase = ChirpPhaseOutput::from_bytes(payload);
            }
            tlv::TLV_CHIRP_PRESENCE => frame.chirp_presence = ChirpPresence::from_bytes(payload),
            tlv::TLV_CHIRP_MOTION_STATUS => {
                frame.chirp_motion = ChirpMotionStatus::from_bytes(payload);
            }
            tlv::TLV_CHIRP_TARGET_INFO => {
                frame.chirp_target_info = ChirpTargetInfo::from_bytes(payload);
            }
            _ => {} // unknown TLV types are skipped, not an error
        }
    }

    frame
}
