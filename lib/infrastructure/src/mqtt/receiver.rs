use std::str::Utf8Error;

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttInMessage {
    pub topic: String,
    pub payload: String,
}

impl MqttInMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

pub struct MqttSubscription {
    rx: mpsc::Receiver<MqttInMessage>,
}

impl MqttSubscription {
    pub fn new(rx: mpsc::Receiver<MqttInMessage>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<MqttInMessage> {
        self.rx.recv().await
    }
}

impl TryFrom<&rumqttc::v5::mqttbytes::v5::Publish> for MqttInMessage {
    type Error = Utf8Error;

    fn try_from(msg: &rumqttc::v5::mqttbytes::v5::Publish) -> Result<Self, Self::Error> {
        Ok(MqttInMessage {
            topic: std::str::from_utf8(&msg.topic)?.to_string(),
            payload: std::str::from_utf8(&msg.payload)?.to_string(),
        })
    }
}
