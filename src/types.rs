//! Small shared types used across module boundaries.

/// Seconds since an arbitrary but consistent epoch, as supplied by the caller
/// when frames are read from the data transport. The core never reads the
/// system clock itself; callers stamp frames so that replay and live capture
/// behave identically.
pub type TimestampSeconds = f64;

/// A scalar phase or displacement-proxy sample, in radians (or an
/// equivalent linear unit for the magnitude-proxy path; see
/// [`crate::pipeline`]).
pub type PhaseSample = f32;
