use std::sync::Arc;

use rumqttc::v5::{AsyncClient, mqttbytes::QoS};

/// Publishes below a fixed base topic, e.g. `homebridge` + `to/set`.
#[derive(Clone)]
pub struct MqttSender {
    client: Arc<AsyncClient>,
    base_topic: String,
}

impl MqttSender {
    pub(super) fn new(client: Arc<AsyncClient>, base_topic: impl Into<String>) -> Self {
        Self {
            client,
            base_topic: base_topic.into(),
        }
    }

    pub fn topic(&self, sub_topic: &str) -> String {
        format!("{}/{}", self.base_topic.trim_end_matches('/'), sub_topic)
    }

    pub async fn send_transient(&self, sub_topic: &str, payload: impl Into<String>) -> anyhow::Result<()> {
        self.send(self.topic(sub_topic), payload.into()).await
    }

    #[tracing::instrument(skip_all, fields(topic = %topic, otel.name = format!("MQTT publish {}", topic)))]
    async fn send(&self, topic: String, payload: String) -> anyhow::Result<()> {
        tracing::debug!("Publishing MQTT message to {topic}: {:?}", payload);

        self.client
            .publish(topic.clone(), QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| {
                tracing::error!("Error publishing MQTT message to {}: {}", topic, e);
                e.into()
            })
    }
}
