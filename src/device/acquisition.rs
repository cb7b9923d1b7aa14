//! Cooperative acquisition loop: reads frame bytes off a [`DataTransport`],
//! feeds them through a [`Framer`], and publishes decoded frames to a
//! [`crate::broadcast::Fabric`].
//!
//! The loop is cancelled cooperatively rather than aborted, so
//! `disconnect` can await its exit and know the transport is no longer
//! being touched before it is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::broadcast::Fabric;
use crate::device::state::DeviceStateMachine;
use crate::device::transport::DataTransport;
use crate::frame::framer::Framer;
use crate::types::TimestampSeconds;

const READ_TIMEOUT: Duration = Duration::from_millis(500);
const READ_CHUNK: usize = 4096;

/// Shared flag the loop polls once per iteration; `disconnect` flips it
/// and then awaits the loop's join handle.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reads frames from `transport` until cancelled, publishing each
/// decoded frame to `fabric` under the `"frames"` topic and recording
/// throughput on `state`.
///
/// `now_fn` supplies the timestamp stamped on each frame; acquisition
/// never reads the system clock directly so that replay sources behave
/// identically to live ones (see [`crate::types::TimestampSeconds`]).
pub async fn run_acquisition_loop(
    mut transport: Box<dyn DataTransport>,
    fabric: Arc<Fabric>,
    state: Arc<DeviceStateMachine>,
    cancel: CancellationToken,
    mut now_fn: impl FnMut() -> TimestampSeconds,
) -> anyhow::Result<()> {
    let mut framer = Framer::new();
    let mut buf = vec![0u8; READ_CHUNK];

    while !cancel.is_cancelled() {
        let read_result = timeout(READ_TIMEOUT, transport.read(&mut buf)).await;
        let Ok(read) = read_result else {
            // Timed out with no data; loop back around to recheck
            // cancellation rather than blocking forever.
            tokio::task::yield_now().await;
            continue;
        };
        let n = read?;
        if n == 0 {
            tokio::task::yield_now().await;
            continue;
        }
        framer.append(&buf[..n]);

        while let Some(frame) = framer.extract_frame(now_fn()) {
            state.record_frame(frame.timestamp);
            if fabric.publish("frames", frame).is_err() {
                state.record_drop();
            }
        }

        tokio::task::yield_now().await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::transport::StubDataTransport;
    use crate::frame::MAGIC_WORD;

    fn build_frame_bytes(frame_number: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&MAGIC_WORD);
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&(40u32).to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&frame_number.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data
    }

    #[tokio::test]
    async fn publishes_one_frame_then_exits_on_cancel() {
        let transport: Box<dyn DataTransport> =
            Box::new(StubDataTransport::new(vec![build_frame_bytes(9)]));
        let fabric = Arc::new(Fabric::new());
        let mut subscriber = fabric.subscribe("frames", 8);
        let state = Arc::new(DeviceStateMachine::new());
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(run_acquisition_loop(transport, fabric.clone(), state.clone(), cancel_clone, || 0.0));

        let frame = subscriber.recv().await.unwrap();
        assert_eq!(frame.header.frame_number, 9);

        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(state.status().frames_received, 1);
    }

    #[test]
    fn cancellation_token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
