use infrastructure::MqttInMessage;
use serde_json::Value;

use super::{
    HomebridgeMessage, HomekitTarget, IncomingMessage, TOPIC_ADD, TOPIC_FROM_GET, TOPIC_FROM_IDENTIFY, TOPIC_FROM_SET,
    hap::{HomekitCharacteristic, HomekitService},
};
use crate::{
    alarm::AlarmService,
    security_system::{AccessoryState, SecuritySystem},
};

/// Maps Homebridge requests to the security system and its state back to characteristic
/// updates. Produces messages only, publishing is left to the runner.
pub struct SecuritySystemAccessory<'a, S> {
    system: &'a SecuritySystem<S>,
}

impl<'a, S: AlarmService> SecuritySystemAccessory<'a, S> {
    pub fn new(system: &'a SecuritySystem<S>) -> Self {
        Self { system }
    }

    pub fn registration(&self) -> HomebridgeMessage {
        let info = self.system.information();

        HomebridgeMessage {
            sub_topic: TOPIC_ADD,
            payload: serde_json::json!({
                "name": self.system.name(),
                "service_name": self.system.name(),
                "service": HomekitService::SecuritySystem,
                "manufacturer": info.manufacturer,
                "model": info.model,
                "serialnumber": info.serial_number,
                "firmwarerevision": info.firmware_revision,
            }),
        }
    }

    pub async fn handle_message(&self, msg: &MqttInMessage) -> Vec<HomebridgeMessage> {
        let incoming: IncomingMessage = match serde_json::from_str(&msg.payload) {
            Ok(incoming) => incoming,
            Err(e) => {
                tracing::error!("Error parsing incoming Homebridge message: {:?} -- {:?}", msg.payload, e);
                return vec![];
            }
        };

        if !self.is_addressed(&incoming) {
            tracing::trace!("Ignoring Homebridge message for {}", incoming.name);
            return vec![];
        }

        if msg.topic.ends_with(TOPIC_FROM_IDENTIFY) {
            self.system.identify();
            vec![]
        } else if msg.topic.ends_with(TOPIC_FROM_GET) {
            self.handle_get(incoming.characteristic).await
        } else if msg.topic.ends_with(TOPIC_FROM_SET) {
            self.handle_set(incoming.characteristic, incoming.value).await
        } else {
            tracing::warn!("Unexpected Homebridge topic {}", msg.topic);
            vec![]
        }
    }

    pub fn state_changed(&self, state: AccessoryState) -> Vec<HomebridgeMessage> {
        let mut messages = vec![];

        match state.current_state_value() {
            Some(value) => messages.push(self.set_value(HomekitCharacteristic::SecuritySystemCurrentState, value)),
            None => tracing::warn!("State {} of {} can't be reported to Homekit", state, self.system.name()),
        }

        if let Some(value) = state.target_state_value() {
            messages.push(self.set_value(HomekitCharacteristic::SecuritySystemTargetState, value));
        }

        messages
    }

    fn is_addressed(&self, incoming: &IncomingMessage) -> bool {
        incoming.name == self.system.name()
            && incoming
                .service_name
                .as_deref()
                .is_none_or(|service_name| service_name == self.system.name())
    }

    async fn handle_get(&self, characteristic: Option<HomekitCharacteristic>) -> Vec<HomebridgeMessage> {
        let (characteristic, result) = match characteristic {
            Some(HomekitCharacteristic::SecuritySystemCurrentState) => (
                HomekitCharacteristic::SecuritySystemCurrentState,
                self.system.current_state().await.map(|s| s.current_state_value()),
            ),
            Some(HomekitCharacteristic::SecuritySystemTargetState) => (
                HomekitCharacteristic::SecuritySystemTargetState,
                self.system.target_state().await.map(|s| s.target_state_value()),
            ),
            other => {
                tracing::debug!("Ignoring get request for {:?}", other);
                return vec![];
            }
        };

        match result {
            Ok(Some(value)) => vec![self.set_value(characteristic, value)],
            //AlarmTriggered has no target value and Unknown has no value at all, such
            //requests stay unanswered
            Ok(None) => {
                tracing::warn!("No Homekit value for {:?} of {}", characteristic, self.system.name());
                vec![]
            }
            Err(e) => {
                tracing::error!("Error getting {:?} of {}: {}", characteristic, self.system.name(), e);
                vec![]
            }
        }
    }

    async fn handle_set(&self, characteristic: Option<HomekitCharacteristic>, value: Option<Value>) -> Vec<HomebridgeMessage> {
        if characteristic != Some(HomekitCharacteristic::SecuritySystemTargetState) {
            tracing::debug!("Ignoring set request for {:?}", characteristic);
            return vec![];
        }

        let target = value
            .as_ref()
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse::<i64>().ok())))
            .map(AccessoryState::from_target_state_value)
            .unwrap_or(AccessoryState::Unknown);

        match self.system.set_target_state(target).await {
            //state change notification publishes the new state
            Ok(_) => vec![],
            Err(e) => {
                tracing::error!(
                    "Error setting target state {:?} of {}: {}",
                    value,
                    self.system.name(),
                    e
                );
                self.revert()
            }
        }
    }

    fn revert(&self) -> Vec<HomebridgeMessage> {
        match self.system.cached_state() {
            Some(state) => self.state_changed(state),
            None => vec![],
        }
    }

    fn set_value(&self, characteristic: HomekitCharacteristic, value: u8) -> HomebridgeMessage {
        HomebridgeMessage::set_value(
            HomekitTarget::new(self.system.name(), characteristic),
            serde_json::json!(value),
        )
    }
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;

    use super::*;
    use crate::security_system::testing::*;

    fn from(topic: &str, payload: Value) -> MqttInMessage {
        MqttInMessage::new(format!("homebridge/{}", topic), payload.to_string())
    }

    fn values(messages: &[HomebridgeMessage]) -> Vec<(String, Value)> {
        messages
            .iter()
            .map(|m| {
                (
                    m.payload["characteristic"].as_str().unwrap_or_default().to_string(),
                    m.payload["value"].clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_registration_payload() {
        let system = security_system(FakeAlarmService::default(), true, 50);
        let accessory = SecuritySystemAccessory::new(&system);

        let msg = accessory.registration();

        assert_eq!(msg.sub_topic, "to/add");
        assert_json_eq!(
            msg.payload,
            serde_json::json!({
                "name": "Alarm",
                "service_name": "Alarm",
                "service": "SecuritySystem",
                "manufacturer": "Sector Alarm",
                "model": "Alarm",
                "serialnumber": "01234567",
                "firmwarerevision": env!("CARGO_PKG_VERSION"),
            })
        );
    }

    #[tokio::test]
    async fn test_get_current_state() {
        let system = security_system(FakeAlarmService::with_statuses([Some("partialArmed")]), true, 50);
        system.poll_once().await.unwrap();
        let accessory = SecuritySystemAccessory::new(&system);

        let messages = accessory
            .handle_message(&from(
                "from/get",
                serde_json::json!({"name": "Alarm", "service_name": "Alarm", "characteristic": "SecuritySystemCurrentState"}),
            ))
            .await;

        assert_eq!(
            values(&messages),
            vec![("SecuritySystemCurrentState".to_string(), serde_json::json!(2))]
        );
    }

    #[tokio::test]
    async fn test_get_without_state_is_not_answered() {
        let system = security_system(FakeAlarmService::default(), true, 10);
        let accessory = SecuritySystemAccessory::new(&system);

        let messages = accessory
            .handle_message(&from(
                "from/get",
                serde_json::json!({"name": "Alarm", "characteristic": "SecuritySystemTargetState"}),
            ))
            .await;

        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_target_state_is_not_answered_while_alarm_is_triggered() {
        let system = security_system(FakeAlarmService::with_statuses([Some("alarm")]), true, 50);
        system.poll_once().await.unwrap();
        let accessory = SecuritySystemAccessory::new(&system);

        let target = accessory
            .handle_message(&from(
                "from/get",
                serde_json::json!({"name": "Alarm", "characteristic": "SecuritySystemTargetState"}),
            ))
            .await;
        let current = accessory
            .handle_message(&from(
                "from/get",
                serde_json::json!({"name": "Alarm", "characteristic": "SecuritySystemCurrentState"}),
            ))
            .await;

        assert!(target.is_empty());
        assert_eq!(
            values(&current),
            vec![("SecuritySystemCurrentState".to_string(), serde_json::json!(4))]
        );
    }

    #[tokio::test]
    async fn test_set_target_state_disarms() {
        let service = FakeAlarmService::default();
        let system = security_system(service.clone(), true, 50);
        let accessory = SecuritySystemAccessory::new(&system);

        let messages = accessory
            .handle_message(&from(
                "from/set",
                serde_json::json!({"name": "Alarm", "service_name": "Alarm", "characteristic": "SecuritySystemTargetState", "value": 3}),
            ))
            .await;

        assert!(messages.is_empty());
        assert_eq!(system.cached_state(), Some(AccessoryState::Disarm));
        assert_eq!(
            service.commands(),
            vec![(crate::security_system::ProviderCommand::Disarm, "1234".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_set_reverts_to_last_known_state() {
        let service = FakeAlarmService::with_statuses([Some("disarmed")]).rejecting_commands();
        let system = security_system(service, true, 50);
        system.poll_once().await.unwrap();
        let accessory = SecuritySystemAccessory::new(&system);

        let messages = accessory
            .handle_message(&from(
                "from/set",
                serde_json::json!({"name": "Alarm", "characteristic": "SecuritySystemTargetState", "value": "1"}),
            ))
            .await;

        assert_eq!(
            values(&messages),
            vec![
                ("SecuritySystemCurrentState".to_string(), serde_json::json!(3)),
                ("SecuritySystemTargetState".to_string(), serde_json::json!(3)),
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_target_value_is_not_sent() {
        let service = FakeAlarmService::default();
        let system = security_system(service.clone(), true, 50);
        let accessory = SecuritySystemAccessory::new(&system);

        let messages = accessory
            .handle_message(&from(
                "from/set",
                serde_json::json!({"name": "Alarm", "characteristic": "SecuritySystemTargetState", "value": 4}),
            ))
            .await;

        assert!(messages.is_empty());
        assert!(service.commands().is_empty());
    }

    #[tokio::test]
    async fn test_messages_for_other_accessories_are_ignored() {
        let service = FakeAlarmService::default();
        let system = security_system(service.clone(), true, 50);
        let accessory = SecuritySystemAccessory::new(&system);

        let messages = accessory
            .handle_message(&from(
                "from/set",
                serde_json::json!({"name": "Garage", "characteristic": "SecuritySystemTargetState", "value": 1}),
            ))
            .await;

        assert!(messages.is_empty());
        assert!(service.commands().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_ignored() {
        let system = security_system(FakeAlarmService::default(), true, 50);
        let accessory = SecuritySystemAccessory::new(&system);

        let messages = accessory
            .handle_message(&MqttInMessage::new("homebridge/from/set", "not json"))
            .await;

        assert!(messages.is_empty());
    }

    #[test]
    fn test_state_changed_messages() {
        let system = security_system(FakeAlarmService::default(), true, 50);
        let accessory = SecuritySystemAccessory::new(&system);

        assert_eq!(
            values(&accessory.state_changed(AccessoryState::AwayArm)),
            vec![
                ("SecuritySystemCurrentState".to_string(), serde_json::json!(1)),
                ("SecuritySystemTargetState".to_string(), serde_json::json!(1)),
            ]
        );
        assert_eq!(
            values(&accessory.state_changed(AccessoryState::AlarmTriggered)),
            vec![("SecuritySystemCurrentState".to_string(), serde_json::json!(4))]
        );
        assert!(accessory.state_changed(AccessoryState::Unknown).is_empty());
    }
}
