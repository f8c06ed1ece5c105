use config::{Config, ConfigError, Environment, File};
use infrastructure::{MonitoringConfig, MqttConfig};
use serde::Deserialize;

use crate::{alarm::SectorAlarmConfig, frontends::homebridge::Homebridge, security_system::SecuritySystemConfig};

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub mqtt: MqttConfig,
    pub monitoring: MonitoringConfig,
    pub homebridge: Homebridge,
    pub sector: SectorAlarmConfig,
    pub accessory: SecuritySystemConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_file = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config.toml".to_string());

        Self::load(
            Config::builder()
                .add_source(File::with_name(&config_file))
                .add_source(Environment::with_prefix("APP").separator("__")),
        )
    }

    fn load(builder: config::ConfigBuilder<config::builder::DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;

        settings
            .accessory
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(settings)
    }
}
