use serde::{Deserialize, Serialize};

/// Alarm posture as reported by the alarm service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(from = "String", into = "String")]
pub enum AlarmState {
    Disarmed,
    PartialArmed,
    Armed,
    AlarmTriggered,
    Unknown,
}

impl AlarmState {
    pub fn from_provider(status: &str) -> Self {
        match status.trim() {
            "disarmed" => AlarmState::Disarmed,
            "partialArmed" | "partial" => AlarmState::PartialArmed,
            "armed" => AlarmState::Armed,
            "alarm" | "alarmTriggered" => AlarmState::AlarmTriggered,
            other => {
                tracing::debug!("Unsupported alarm status {:?}", other);
                AlarmState::Unknown
            }
        }
    }

    pub fn as_provider_str(&self) -> &'static str {
        match self {
            AlarmState::Disarmed => "disarmed",
            AlarmState::PartialArmed => "partialArmed",
            AlarmState::Armed => "armed",
            AlarmState::AlarmTriggered => "alarm",
            AlarmState::Unknown => "unknown",
        }
    }
}

impl From<String> for AlarmState {
    fn from(value: String) -> Self {
        AlarmState::from_provider(&value)
    }
}

impl From<AlarmState> for String {
    fn from(value: AlarmState) -> Self {
        value.as_provider_str().to_string()
    }
}

/// Security system state in HomeKit vocabulary. The first four are valid target states,
/// `AlarmTriggered` only exists as current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum AccessoryState {
    StayArm,
    AwayArm,
    NightArm,
    Disarm,
    AlarmTriggered,
    Unknown,
}

// https://github.com/homebridge/HAP-NodeJS/blob/latest/src/lib/definitions/CharacteristicDefinitions.ts
// SecuritySystemCurrentState / SecuritySystemTargetState
impl AccessoryState {
    pub fn current_state_value(&self) -> Option<u8> {
        match self {
            AccessoryState::StayArm => Some(0),
            AccessoryState::AwayArm => Some(1),
            AccessoryState::NightArm => Some(2),
            AccessoryState::Disarm => Some(3),
            AccessoryState::AlarmTriggered => Some(4),
            AccessoryState::Unknown => None,
        }
    }

    pub fn target_state_value(&self) -> Option<u8> {
        match self {
            AccessoryState::AlarmTriggered => None,
            other => other.current_state_value(),
        }
    }

    pub fn from_target_state_value(value: i64) -> Self {
        match value {
            0 => AccessoryState::StayArm,
            1 => AccessoryState::AwayArm,
            2 => AccessoryState::NightArm,
            3 => AccessoryState::Disarm,
            _ => AccessoryState::Unknown,
        }
    }
}

/// Action to run on the alarm service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ProviderCommand {
    PartialArm,
    Arm,
    Disarm,
    Unknown,
}

pub fn to_accessory_state(state: AlarmState) -> AccessoryState {
    let translated = match state {
        AlarmState::PartialArmed => AccessoryState::NightArm,
        AlarmState::Armed => AccessoryState::AwayArm,
        AlarmState::Disarmed => AccessoryState::Disarm,
        AlarmState::AlarmTriggered => AccessoryState::AlarmTriggered,
        AlarmState::Unknown => AccessoryState::Unknown,
    };

    tracing::trace!("Translated alarm state {} to {}", state, translated);
    translated
}

pub fn to_provider_command(state: AccessoryState) -> ProviderCommand {
    match state {
        AccessoryState::StayArm | AccessoryState::NightArm => ProviderCommand::PartialArm,
        AccessoryState::AwayArm => ProviderCommand::Arm,
        AccessoryState::Disarm => ProviderCommand::Disarm,
        AccessoryState::AlarmTriggered | AccessoryState::Unknown => ProviderCommand::Unknown,
    }
}
