use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use infrastructure::EventBus;

use super::{AlarmState, ProviderCommand, SecuritySystem, SecuritySystemConfig};
use crate::alarm::{AlarmService, AlarmSession, AlarmStatus, Credentials};

/// Scripted alarm service. Status responses are consumed in order, `None` fails the call.
#[derive(Clone, Default)]
pub struct FakeAlarmService {
    inner: Arc<Mutex<FakeAlarm>>,
}

#[derive(Default)]
struct FakeAlarm {
    statuses: VecDeque<Option<&'static str>>,
    reject_commands: bool,
    reject_login: bool,
    status_delay: Option<Duration>,
    status_calls: usize,
    commands: Vec<(ProviderCommand, String)>,
}

impl FakeAlarmService {
    pub fn with_statuses(statuses: impl IntoIterator<Item = Option<&'static str>>) -> Self {
        let service = Self::default();
        service.inner.lock().unwrap().statuses = statuses.into_iter().collect();
        service
    }

    pub fn rejecting_commands(self) -> Self {
        self.inner.lock().unwrap().reject_commands = true;
        self
    }

    pub fn rejecting_login(self) -> Self {
        self.inner.lock().unwrap().reject_login = true;
        self
    }

    pub fn with_status_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().status_delay = Some(delay);
        self
    }

    pub fn status_calls(&self) -> usize {
        self.inner.lock().unwrap().status_calls
    }

    pub fn commands(&self) -> Vec<(ProviderCommand, String)> {
        self.inner.lock().unwrap().commands.clone()
    }
}

pub struct FakeAlarmSession {
    inner: Arc<Mutex<FakeAlarm>>,
}

impl AlarmService for FakeAlarmService {
    type Session = FakeAlarmSession;

    async fn connect(&self, _credentials: &Credentials) -> anyhow::Result<FakeAlarmSession> {
        if self.inner.lock().unwrap().reject_login {
            anyhow::bail!("Login rejected");
        }

        Ok(FakeAlarmSession {
            inner: self.inner.clone(),
        })
    }
}

impl FakeAlarmSession {
    fn record(&self, command: ProviderCommand, code: &str) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.reject_commands {
            anyhow::bail!("Invalid code");
        }

        inner.commands.push((command, code.to_string()));
        Ok(())
    }
}

impl AlarmSession for FakeAlarmSession {
    async fn status(&self) -> anyhow::Result<AlarmStatus> {
        let delay = self.inner.lock().unwrap().status_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        inner.status_calls += 1;

        match inner.statuses.pop_front() {
            Some(Some(status)) => Ok(AlarmStatus {
                armed_status: AlarmState::from_provider(status),
            }),
            Some(None) => anyhow::bail!("Service unavailable"),
            None => anyhow::bail!("No more scripted statuses"),
        }
    }

    async fn arm(&self, code: &str) -> anyhow::Result<()> {
        self.record(ProviderCommand::Arm, code)
    }

    async fn partial_arm(&self, code: &str) -> anyhow::Result<()> {
        self.record(ProviderCommand::PartialArm, code)
    }

    async fn disarm(&self, code: &str) -> anyhow::Result<()> {
        self.record(ProviderCommand::Disarm, code)
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        email: "jane@example.com".to_string(),
        password: "secret".to_string(),
        site_id: "01234567".to_string(),
    }
}

pub fn config(polling: bool, state_wait_timeout_ms: u64) -> SecuritySystemConfig {
    SecuritySystemConfig {
        name: "Alarm".to_string(),
        polling,
        poll_interval_ms: 10,
        state_wait_timeout_ms,
    }
}

pub fn security_system(
    service: FakeAlarmService,
    polling: bool,
    state_wait_timeout_ms: u64,
) -> SecuritySystem<FakeAlarmService> {
    let bus = EventBus::new(8);
    SecuritySystem::new(
        &config(polling, state_wait_timeout_ms),
        service,
        credentials(),
        "1234".to_string(),
        bus.emitter(),
    )
}
