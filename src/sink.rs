//! Recording sink: the narrow external interface a caller implements
//! to persist frames and vitals readouts. Deliberately minimal —
//! concrete formats (Parquet, CSV, a database) live outside this
//! crate; write failures are logged and otherwise swallowed so a
//! flaky disk never interrupts acquisition.

use crate::frame::Frame;
use crate::vitals::VitalSigns;

pub trait RecordingSink: Send {
    /// Persists one decoded frame. Errors are non-fatal to the caller;
    /// implementations should log internally if they need visibility.
    fn write_frame(&mut self, frame: &Frame) -> anyhow::Result<()>;

    /// Persists one vitals readout.
    fn write_vitals(&mut self, vitals: &VitalSigns) -> anyhow::Result<()>;

    /// Flushes and releases any held resources. Must be idempotent:
    /// calling it twice is not an error.
    fn close(&mut self) -> anyhow::Result<()>;
}

/// Writes one JSON object per line; used in tests and as a reference
/// implementation of the trait.
pub struct JsonLinesSink<W: std::io::Write + Send> {
    writer: Option<W>,
}

impl<W: std::io::Write + Send> JsonLinesSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer: Some(writer) }
    }

    fn write_line(&mut self, value: &serde_json::Value) -> anyhow::Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(()); // already closed
        };
        serde_json::to_writer(&mut *writer, value)?;
        writeln!(writer)?;
        Ok(())
    }
}

impl<W: std::io::Write + Send> RecordingSink for JsonLinesSink<W> {
    fn write_frame(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let value = serde_json::json!({
            "kind": "frame",
            "frame_number": frame.header.frame_number,
            "timestamp": frame.timestamp,
            "num_points": frame.detected_points.len(),
        });
        self.write_line(&value)
    }

    fn write_vitals(&mut self, vitals: &VitalSigns) -> anyhow::Result<()> {
        let value = serde_json::json!({
            "kind": "vitals",
            "heart_rate_bpm": vitals.heart_rate_bpm,
            "respiration_rate_bpm": vitals.respiration_rate_bpm,
            "signal_quality": vitals.signal_quality,
        });
        self.write_line(&value)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
