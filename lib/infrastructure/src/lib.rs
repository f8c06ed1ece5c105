mod bus;
mod http;
mod monitoring;
mod mqtt;

pub use bus::{EventBus, EventEmitter, EventListener};
pub use monitoring::{MonitoringConfig, MonitoringGuard};

pub use http::client::HttpClientConfig;
pub use mqtt::{Mqtt, MqttConfig, MqttInMessage, MqttSender, MqttSubscription};

pub mod meter {
    pub use super::monitoring::meter::increment;
}
