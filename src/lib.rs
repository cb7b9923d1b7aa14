//! Streaming frame decoder, signal-processing pipeline, and
//! vital-signs estimator for 60 GHz FMCW mmWave radar modules that
//! report detected points, range profiles, and chirp-domain phase data
//! over a TLV-framed serial link.
//!
//! Please see the project README for information on contributing to the project.
//!
//! ## How to use
//!
//! This library's components are connected through [tokio
//! channels](tokio::sync) to form an acquisition pipeline. Broadly
//! speaking, these components fall into the following categories:
//!
//! ### Framing and decoding
//!
//! A byte stream from the sensor is turned into a sequence of decoded
//! frames.
//!
//! * [frame]
//!
//! ### Signal processing
//!
//! Frames are reduced to a target range bin and a phase sample per
//! frame, with optional clutter removal.
//!
//! * [clutter]
//! * [pipeline]
//! * [unwrap]
//! * [filters]
//! * [fft]
//!
//! ### Vital signs
//!
//! Phase samples accumulate into a sliding window from which heart
//! rate and respiration rate are estimated.
//!
//! * [vitals]
//!
//! ### Device and distribution
//!
//! The device module owns the connection lifecycle and the
//! acquisition loop; decoded frames and vitals readouts fan out to
//! subscribers through the broadcast fabric, and may be persisted
//! through a [`sink::RecordingSink`].
//!
//! * [device]
//! * [broadcast]
//! * [sink]
//!
//! ## API stability
//!
//! We follow the [Semantic Versioning 2.0.0](https://semver.org/)
//! standard.
//!
//! As the library only supports one sensor family at present, it is
//! likely that the APIs connecting the components above will change as
//! more device variants are added and the problem space is better
//! understood. For this reason, we do not anticipate making a 1.x.x
//! release in the near future.

pub mod broadcast;
pub mod clutter;
pub mod device;
pub mod error;
pub mod fft;
pub mod filters;
pub mod frame;
pub mod pipeline;
pub mod sink;
pub mod types;
pub mod unwrap;
pub mod vitals;
