//! Device lifecycle: connection state machine, transport abstraction,
//! and the supervised acquisition loop that ties them together.

pub mod acquisition;
pub mod state;
pub mod transport;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::broadcast::Fabric;
use crate::error::{CoreError, Result};
use acquisition::{run_acquisition_loop, CancellationToken};
use state::{DeviceState, DeviceStateMachine, DeviceStatus};
use transport::{command_succeeded, ControlTransport, DataTransport};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Target frame rate the sensor is configured to stream at; purely
    /// informational here; see [`state::DeviceStatus::frame_rate_hz`]
    /// for the measured rate.
    pub frame_rate_hz: f32,
    pub range_resolution_m: f32,
    pub start_command: String,
    pub stop_command: String,
    /// Names of the control/data ports this device was opened against,
    /// surfaced verbatim in [`state::DeviceStatus::port_names`].
    pub port_names: Vec<String>,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            frame_rate_hz: 20.0,
            range_resolution_m: 0.044,
            start_command: "sensorStart".to_string(),
            stop_command: "sensorStop".to_string(),
            port_names: Vec::new(),
        }
    }
}

/// Owns the device's control transport and acquisition task handle,
/// coordinating them through a shared [`DeviceStateMachine`]. The
/// acquisition task itself is driven by [`acquisition::run_acquisition_loop`].
pub struct Device {
    control: AsyncMutex<Box<dyn ControlTransport>>,
    state: Arc<DeviceStateMachine>,
    fabric: Arc<Fabric>,
    config: SensorConfig,
    cancel: Option<CancellationToken>,
    acquisition_handle: Option<tokio::task::JoinHandle<anyhow::Result<()>>>,
}

impl Device {
    #[must_use]
    pub fn new(control: Box<dyn ControlTransport>, config: SensorConfig) -> Self {
        Self {
            control: AsyncMutex::new(control),
            state: Arc::new(DeviceStateMachine::with_port_names(config.port_names.clone())),
            fabric: Arc::new(Fabric::new()),
            config,
            cancel: None,
            acquisition_handle: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state.current()
    }

    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        self.state.status()
    }

    #[must_use]
    pub fn fabric(&self) -> Arc<Fabric> {
        self.fabric.clone()
    }

    fn transition(&self, to: DeviceState) -> Result<()> {
        self.state.transition(to).map(|_| ()).map_err(|(from, to)| CoreError::InvalidStateTransition { from, to })
    }

    async fn send_command(&self, command: &str) -> Result<String> {
        let mut control = self.control.lock().await;
        let response = control.send_command(command).await.map_err(|err| {
            self.state.record_error(err.to_string());
            CoreError::Transport(err)
        })?;
        if !command_succeeded(&response) {
            self.state.record_error(response.clone());
            return Err(CoreError::Configuration { command: command.to_string(), response });
        }
        Ok(response)
    }

    /// Moves through connecting -> configuring -> streaming, starting
    /// the acquisition loop against `data_transport` once the device
    /// has acknowledged the start command.
    pub async fn connect(&mut self, data_transport: Box<dyn DataTransport>) -> Result<()> {
        if self.state() != DeviceState::Disconnected {
            return Err(CoreError::AlreadyConnected);
        }
        self.transition(DeviceState::Connecting)?;
        self.transition(DeviceState::Configuring)?;

        let start_command = self.config.start_command.clone();
        if let Err(err) = self.send_command(&start_command).await {
            self.transition(DeviceState::Error).ok();
            return Err(err);
        }

        self.transition(DeviceState::Streaming)?;

        let cancel = CancellationToken::new();
        let fabric = self.fabric.clone();
        let state = self.state.clone();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(run_acquisition_loop(
            data_transport,
            fabric,
            state,
            cancel_clone,
            crate::device::clock_seconds,
        ));

        self.cancel = Some(cancel);
        self.acquisition_handle = Some(handle);
        Ok(())
    }

    /// Cancels the acquisition loop, awaits its exit, then sends the
    /// stop command and returns to `Disconnected`.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(handle) = self.acquisition_handle.take() {
            handle.await.map_err(|e| CoreError::Transport(anyhow::anyhow!(e)))?.map_err(CoreError::Transport)?;
        }
        let stop_command = self.config.stop_command.clone();
        let _ = self.send_command(&stop_command).await;
        self.transition(DeviceState::Disconnected)
    }

    /// Immediate transition to `Error` regardless of the current
    /// state's normal transition table, for callers that detect a
    /// fault outside the normal command/response path (e.g. a broken
    /// transport). Always succeeds.
    pub fn emergency_stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.state.record_error("emergency stop requested".to_string());
        self.state.transition(DeviceState::Error).ok();
    }
}

/// Wall-clock timestamp source for live acquisition. Replay callers
/// should drive [`acquisition::run_acquisition_loop`] directly with
/// their own clock instead of going through [`Device::connect`].
fn clock_seconds() -> crate::types::TimestampSeconds {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or(0.0)
}
