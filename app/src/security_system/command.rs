use std::sync::atomic::Ordering;

use infrastructure::meter;

use super::{AccessoryState, ProviderCommand, SecuritySystem, SecuritySystemError, to_provider_command};
use crate::alarm::{AlarmService, AlarmSession};

impl<S: AlarmService> SecuritySystem<S> {
    /// Arms or disarms the alarm. Not retried and not deduplicated; on error the cached
    /// state stays as it was.
    #[tracing::instrument(skip(self), fields(accessory = %self.name))]
    pub async fn set_target_state(&self, target: AccessoryState) -> Result<AccessoryState, SecuritySystemError> {
        let command = to_provider_command(target);
        if command == ProviderCommand::Unknown {
            tracing::warn!("Ignoring unsupported target state {}", target);
            return Err(SecuritySystemError::UnsupportedTarget { state: target });
        }

        tracing::info!("Setting target state of {} to {} ({})", self.name, target, command);

        match self.execute(command).await {
            Ok(()) => {
                meter::increment("alarm_command", &[("command", command_label(command)), ("result", "success")]);
                self.command_generation.fetch_add(1, Ordering::SeqCst);
                self.store(target, true);
                Ok(target)
            }
            Err(e) => {
                meter::increment("alarm_command", &[("command", command_label(command)), ("result", "error")]);
                tracing::error!("Error executing {} on {}: {:?}", command, self.name, e);
                Err(e.into())
            }
        }
    }

    async fn execute(&self, command: ProviderCommand) -> anyhow::Result<()> {
        let session = self.service.connect(&self.credentials).await?;

        match command {
            ProviderCommand::PartialArm => session.partial_arm(&self.code).await,
            ProviderCommand::Arm => session.arm(&self.code).await,
            ProviderCommand::Disarm => session.disarm(&self.code).await,
            ProviderCommand::Unknown => anyhow::bail!("Unknown command can't be executed"),
        }
    }
}

fn command_label(command: ProviderCommand) -> &'static str {
    match command {
        ProviderCommand::PartialArm => "partial_arm",
        ProviderCommand::Arm => "arm",
        ProviderCommand::Disarm => "disarm",
        ProviderCommand::Unknown => "unknown",
    }
}
