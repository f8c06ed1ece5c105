use std::sync::Arc;
use std::time::Duration;

use rumqttc::v5::{
    AsyncClient, EventLoop, MqttOptions,
    mqttbytes::{
        QoS,
        v5::{ConnectProperties, Packet, Publish, SubscribeProperties},
    },
};

use rumqttc::v5::Event::Incoming;
use tokio::sync::mpsc;

use super::*;

pub struct Mqtt {
    client: Arc<AsyncClient>,
    event_loop: EventLoop,
    subscriptions: Vec<MqttSubscriptionHandle>,
}

struct MqttSubscriptionHandle {
    topic: String,
    txs: Vec<mpsc::Sender<MqttInMessage>>,
}

impl Mqtt {
    pub fn connect(host: &str, port: u16, client_id: &str, credentials: Option<(String, String)>) -> Self {
        let mut mqttoptions = MqttOptions::new(client_id, host, port);
        mqttoptions.set_keep_alive(Duration::from_secs(5));
        mqttoptions.set_clean_start(false);

        if let Some((username, password)) = credentials {
            mqttoptions.set_credentials(username, password);
        }

        let mut connect_props = ConnectProperties::new();
        connect_props.session_expiry_interval = 60.into();
        connect_props.max_packet_size = Some(1024 * 1024);
        mqttoptions.set_connect_properties(connect_props);

        let (client, event_loop) = AsyncClient::new(mqttoptions, 10);

        Mqtt {
            client: Arc::new(client),
            event_loop,
            subscriptions: vec![],
        }
    }

    pub async fn subscribe_all(&mut self, topics: &[String]) -> anyhow::Result<MqttSubscription> {
        let (tx, rx) = mpsc::channel::<MqttInMessage>(32);

        for topic in topics {
            if let Some(subscription) = self.subscriptions.iter_mut().find(|s| s.topic == *topic) {
                tracing::info!("Adding subscriber to existing subscription: {:?}", &topic);

                subscription.txs.push(tx.clone());
                continue;
            };

            tracing::info!("Creating new subscription for topic: {:?}", &topic);

            self.subscriptions.push(MqttSubscriptionHandle {
                topic: topic.clone(),
                txs: vec![tx.clone()],
            });

            self.client
                .subscribe_with_properties(
                    topic,
                    QoS::AtLeastOnce,
                    SubscribeProperties {
                        id: Some(self.subscriptions.len()), //must be > 0
                        user_properties: vec![],
                    },
                )
                .await?;
        }

        Ok(MqttSubscription::new(rx))
    }

    pub fn sender(&self, base_topic: impl Into<String>) -> MqttSender {
        MqttSender::new(self.client.clone(), base_topic)
    }

    /// Drives the connection and forwards incoming publishes to their subscribers.
    pub async fn run(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(Incoming(Packet::Publish(publish))) => {
                    self.handle_publish(publish).await;
                }
                Ok(Incoming(Packet::ConnAck(_))) => {
                    tracing::info!("Connected to MQTT broker");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn handle_publish(&self, msg: Publish) {
        let mqtt_in_message = match MqttInMessage::try_from(&msg) {
            Ok(m) => m,
            Err(e) => {
                tracing::error!("Error parsing MQTT message: {}", e);
                return;
            }
        };

        tracing::trace!("Received MQTT message on topic {}", mqtt_in_message.topic);

        let subscription_ids = match msg.properties {
            Some(p) => p.subscription_identifiers,
            None => {
                tracing::error!("No subscription identifiers in MQTT message");
                return;
            }
        };

        for id in subscription_ids {
            let Some(sub) = id.checked_sub(1).and_then(|idx| self.subscriptions.get(idx)) else {
                tracing::error!("No subscription for id: {}", id);
                continue;
            };

            for tx in sub.txs.iter() {
                if let Err(e) = tx
                    .send_timeout(mqtt_in_message.clone(), Duration::from_secs(5))
                    .await
                {
                    tracing::error!("Failed to forward MQTT message to subscriber {}: {}", sub.topic, e);
                }
            }
        }
    }
}
