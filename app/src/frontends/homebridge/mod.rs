mod accessory;
mod hap;
mod runtime;

use infrastructure::{EventListener, Mqtt};
use serde::Deserialize;
use serde_json::Value;

pub use self::runtime::HomebridgeRunner;
use self::{accessory::SecuritySystemAccessory, hap::HomekitCharacteristic};
use crate::{
    alarm::AlarmService,
    security_system::{SecuritySystem, SecuritySystemEvent},
};

// homebridge-mqtt topics, relative to the base topic
const TOPIC_ADD: &str = "to/add";
const TOPIC_SET: &str = "to/set";
const TOPIC_FROM_GET: &str = "from/get";
const TOPIC_FROM_SET: &str = "from/set";
const TOPIC_FROM_IDENTIFY: &str = "from/identify";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct HomekitTarget {
    pub(crate) name: String,
    pub(crate) service_name: String,
    pub(crate) characteristic: HomekitCharacteristic,
}

impl HomekitTarget {
    fn new(name: &str, characteristic: HomekitCharacteristic) -> Self {
        Self {
            name: name.to_string(),
            service_name: name.to_string(),
            characteristic,
        }
    }
}

/// A message to publish below the Homebridge base topic.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HomebridgeMessage {
    pub(crate) sub_topic: &'static str,
    pub(crate) payload: Value,
}

impl HomebridgeMessage {
    fn set_value(target: HomekitTarget, value: Value) -> Self {
        Self {
            sub_topic: TOPIC_SET,
            payload: serde_json::json!({
                "name": target.name,
                "service_name": target.service_name,
                "characteristic": target.characteristic,
                "value": value,
            }),
        }
    }
}

//example
// {"name": "Alarm", "service_name": "Alarm", "characteristic": "SecuritySystemTargetState", "value": 1}
#[derive(Debug, Deserialize)]
pub(crate) struct IncomingMessage {
    pub(crate) name: String,
    pub(crate) service_name: Option<String>,
    pub(crate) characteristic: Option<HomekitCharacteristic>,
    pub(crate) value: Option<Value>,
}

#[derive(Clone, Deserialize, Debug)]
pub struct Homebridge {
    pub base_topic: String,
}

impl Homebridge {
    pub async fn new_runner<'a, S: AlarmService>(
        &self,
        mqtt: &mut Mqtt,
        system: &'a SecuritySystem<S>,
        state_change_rx: EventListener<SecuritySystemEvent>,
    ) -> anyhow::Result<HomebridgeRunner<'a, S>> {
        let topics = [TOPIC_FROM_GET, TOPIC_FROM_SET, TOPIC_FROM_IDENTIFY]
            .iter()
            .map(|sub_topic| format!("{}/{}", self.base_topic.trim_end_matches('/'), sub_topic))
            .collect::<Vec<_>>();

        let mqtt_receiver = mqtt.subscribe_all(&topics).await?;

        Ok(HomebridgeRunner::new(
            SecuritySystemAccessory::new(system),
            state_change_rx,
            mqtt.sender(&self.base_topic),
            mqtt_receiver,
        ))
    }
}
