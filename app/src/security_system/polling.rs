use std::sync::atomic::Ordering;
use std::time::Duration;

use infrastructure::meter;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{AccessoryState, SecuritySystem};
use crate::alarm::AlarmService;

pub struct StatePoller {
    interval: Duration,
}

impl StatePoller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Polls until `cancel` fires. Failed polls are logged and retried on the next tick,
    /// a slow poll delays the next tick instead of overlapping with it.
    pub async fn run<S: AlarmService>(&self, system: &SecuritySystem<S>, cancel: CancellationToken) {
        tracing::info!("Starting polling of {} with an interval of {:?}", system.name(), self.interval);

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {},
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = system.poll_once() => {
                    if let Err(e) = result {
                        tracing::error!("Polling of {} failed: {:?}", system.name(), e);
                    }
                },
            }
        }

        tracing::info!("Stopped polling of {}", system.name());
    }
}

impl<S: AlarmService> SecuritySystem<S> {
    /// One poll cycle: query, translate, cache and notify on change. The cache is left
    /// untouched on error, and when a command succeeded while the query was in flight.
    pub async fn poll_once(&self) -> anyhow::Result<AccessoryState> {
        let generation = self.command_generation.load(Ordering::SeqCst);

        match self.fetch_state().await {
            Ok(state) => {
                meter::increment("alarm_poll", &[("result", "success")]);

                if self.command_generation.load(Ordering::SeqCst) != generation {
                    tracing::debug!("Discarding polled state {} of {}, a command completed meanwhile", state, self.name);
                } else {
                    self.store(state, false);
                }

                Ok(state)
            }
            Err(e) => {
                meter::increment("alarm_poll", &[("result", "error")]);
                Err(e)
            }
        }
    }
}
