//! Transport abstraction for the device's two logical channels: a
//! line-oriented control port for configuration commands, and a raw
//! byte stream of frame data. Enumerating physical serial ports is out
//! of scope here; callers hand in an already-open transport.

use async_trait::async_trait;

#[async_trait]
pub trait ControlTransport: Send {
    /// Sends `command` (a bare command, without the trailing CRLF the
    /// wire protocol expects) and returns the device's raw text
    /// response.
    async fn send_command(&mut self, command: &str) -> anyhow::Result<String>;
}

#[async_trait]
pub trait DataTransport: Send {
    /// Reads whatever bytes are currently available, up to `buf`'s
    /// length, returning the number read. `0` means no bytes were
    /// available within the caller's timeout, not end-of-stream.
    async fn read(&mut self, buf: &mut [u8]) -> anyhow::Result<usize>;
}

/// Response-matching helper shared by real transports and the
/// in-memory stub below: a command succeeded if the device's response
/// did not contain the literal string `"Error"`.
#[must_use]
pub fn command_succeeded(response: &str) -> bool {
    !response.contains("Error")
}

/// In-memory transport used by device tests and by callers exercising
/// the acquisition loop without real hardware.
pub struct StubControlTransport {
    pub responses: std::collections::VecDeque<String>,
}

impl StubControlTransport {
    #[must_use]
    pub fn new(responses: Vec<String>) -> Self {
        Self { responses: responses.into() }
    }
}

#[async_trait]
impl ControlTransport for StubControlTransport {
    async fn send_command(&mut self, _command: &str) -> anyhow::Result<String> {
        self.responses.pop_front().ok_or_else(|| anyhow::anyhow!("stub transport exhausted"))
    }
}

pub struct StubDataTransport {
    pub chunks: std::collections::VecDeque<Vec<u8>>,
}

impl StubDataTransport {
    #[must_use]
    pub fn new(chunks: Vec<Vec<u8>>) -> Self {
        Self { chunks: chunks.into() }
    }
}

#[async_trait]
impl DataTransport for StubDataTransport {
    async fn read(&mut self, buf: &mut [u8]) -> anyhow::Result<usize> {
        let Some(chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_succeeded_rejects_error_responses() {
        assert!(command_succeeded("OK\r\n"));
        assert!(!command_succeeded("Error: unknown command\r\n"));
    }

    #[tokio::test]
    async fn stub_control_transport_replays_queued_responses() {
        let mut transport = StubControlTransport::new(vec!["OK".to_string()]);
        let response = transport.send_command("sensorStart").await.unwrap();
        assert_eq!(response, "OK");
        assert!(transport.send_command("sensorStop").await.is_err());
    }

    #[tokio::test]
    async fn stub_data_transport_yields_queued_chunks_then_zero() {
        let mut transport = StubDataTransport::new(vec![vec![1, 2, 3]]);
        let mut buf = [0u8; 8];
        let n = transport.read(&mut buf).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        let n2 = transport.read(&mut buf).await.unwrap();
        assert_eq!(n2, 0);
    }
}
