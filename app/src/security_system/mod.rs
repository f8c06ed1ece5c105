mod cache;
mod command;
mod polling;
mod state;

#[cfg(test)]
pub mod testing;

use std::sync::atomic::AtomicU64;
use std::time::Duration;

use infrastructure::EventEmitter;
use serde::Deserialize;

use crate::alarm::{AlarmService, AlarmSession, Credentials};

use cache::StateCell;
pub use polling::StatePoller;
pub use state::{AccessoryState, AlarmState, ProviderCommand, to_accessory_state, to_provider_command};

pub const MANUFACTURER: &str = "Sector Alarm";

#[derive(Debug, Clone, Deserialize)]
pub struct SecuritySystemConfig {
    pub name: String,
    #[serde(default = "default_polling")]
    pub polling: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_state_wait_timeout_ms")]
    pub state_wait_timeout_ms: u64,
}

fn default_polling() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    3000
}

//15 checks every 500ms
fn default_state_wait_timeout_ms() -> u64 {
    7500
}

impl SecuritySystemConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Accessory name must not be empty");
        }
        if self.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be positive");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn state_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.state_wait_timeout_ms)
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum SecuritySystemError {
    #[display("Alarm service request failed: {cause:#}")]
    Remote { cause: anyhow::Error },
    #[display("Target state {state} can't be sent to the alarm service")]
    UnsupportedTarget { state: AccessoryState },
    #[display("No alarm state available after waiting {waited:?}")]
    StateUnavailable { waited: Duration },
}

impl From<anyhow::Error> for SecuritySystemError {
    fn from(cause: anyhow::Error) -> Self {
        SecuritySystemError::Remote { cause }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecuritySystemEvent {
    CurrentStateChanged(AccessoryState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryInformation {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_revision: String,
}

/// The security system accessory. Owns the cached state, the poller and the command
/// dispatcher only borrow it.
pub struct SecuritySystem<S> {
    name: String,
    service: S,
    credentials: Credentials,
    code: String,
    polling: bool,
    state_wait_timeout: Duration,
    state: StateCell,
    //bumped by every successful command, polls started before it are discarded
    command_generation: AtomicU64,
    events: EventEmitter<SecuritySystemEvent>,
}

impl<S: AlarmService> SecuritySystem<S> {
    pub fn new(
        config: &SecuritySystemConfig,
        service: S,
        credentials: Credentials,
        code: String,
        events: EventEmitter<SecuritySystemEvent>,
    ) -> Self {
        Self {
            name: config.name.clone(),
            service,
            credentials,
            code,
            polling: config.polling,
            state_wait_timeout: config.state_wait_timeout(),
            state: StateCell::new(),
            command_generation: AtomicU64::new(0),
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn cached_state(&self) -> Option<AccessoryState> {
        self.state.get()
    }

    pub async fn current_state(&self) -> Result<AccessoryState, SecuritySystemError> {
        tracing::debug!("Getting current state of {}", self.name);
        self.read_state().await
    }

    /// Target is assumed to follow the current state.
    pub async fn target_state(&self) -> Result<AccessoryState, SecuritySystemError> {
        tracing::debug!("Getting target state of {}", self.name);
        self.read_state().await
    }

    pub fn identify(&self) {
        tracing::info!("Identify requested for {}", self.name);
    }

    pub fn information(&self) -> AccessoryInformation {
        AccessoryInformation {
            manufacturer: MANUFACTURER.to_string(),
            model: self.name.clone(),
            serial_number: self.credentials.site_id.clone(),
            firmware_revision: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn read_state(&self) -> Result<AccessoryState, SecuritySystemError> {
        if !self.polling {
            let state = self.fetch_state().await?;
            self.store(state, false);
            return Ok(state);
        }

        if let Some(state) = self.state.get() {
            return Ok(state);
        }

        tracing::info!("No state of {} available yet, waiting for first poll", self.name);

        self.state
            .wait_for_value(self.state_wait_timeout)
            .await
            .ok_or(SecuritySystemError::StateUnavailable {
                waited: self.state_wait_timeout,
            })
    }

    async fn fetch_state(&self) -> anyhow::Result<AccessoryState> {
        let session = self.service.connect(&self.credentials).await?;
        let status = session.status().await?;

        let state = to_accessory_state(status.armed_status);
        tracing::debug!("Alarm status of {} is {} -> {}", self.name, status.armed_status, state);

        Ok(state)
    }

    fn store(&self, state: AccessoryState, always_notify: bool) {
        let previous = self.state.set(state);

        if always_notify || previous != Some(state) {
            tracing::info!("State of {} changed from {:?} to {}", self.name, previous, state);
            self.events.send(SecuritySystemEvent::CurrentStateChanged(state));
        }
    }
}
