use infrastructure::{EventListener, MqttSender, MqttSubscription};

use super::{HomebridgeMessage, accessory::SecuritySystemAccessory};
use crate::{alarm::AlarmService, security_system::SecuritySystemEvent};

pub struct HomebridgeRunner<'a, S> {
    accessory: SecuritySystemAccessory<'a, S>,
    state_change_rx: EventListener<SecuritySystemEvent>,
    mqtt_sender: MqttSender,
    mqtt_receiver: MqttSubscription,
}

impl<'a, S: AlarmService> HomebridgeRunner<'a, S> {
    pub fn new(
        accessory: SecuritySystemAccessory<'a, S>,
        state_change_rx: EventListener<SecuritySystemEvent>,
        mqtt_sender: MqttSender,
        mqtt_receiver: MqttSubscription,
    ) -> Self {
        Self {
            accessory,
            state_change_rx,
            mqtt_sender,
            mqtt_receiver,
        }
    }

    pub async fn run(mut self) {
        let registration = self.accessory.registration();
        self.send(registration).await;

        loop {
            tokio::select! {
                mqtt_msg = self.mqtt_receiver.recv() => {
                    let Some(mqtt_msg) = mqtt_msg else {
                        tracing::error!("Homebridge MQTT subscription closed");
                        return;
                    };

                    tracing::debug!("Processing Homebridge MQTT message: {:?}", mqtt_msg);
                    for msg in self.accessory.handle_message(&mqtt_msg).await {
                        self.send(msg).await;
                    }
                }

                event = self.state_change_rx.recv() => {
                    let Some(SecuritySystemEvent::CurrentStateChanged(state)) = event else {
                        tracing::error!("State change channel closed");
                        return;
                    };

                    for msg in self.accessory.state_changed(state) {
                        self.send(msg).await;
                    }
                }
            }
        }
    }

    async fn send(&self, msg: HomebridgeMessage) {
        let payload = match serde_json::to_string(&msg.payload) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Error serializing Homebridge message: {:?} -- {:?}", msg, e);
                return;
            }
        };

        if let Err(e) = self.mqtt_sender.send_transient(msg.sub_topic, payload).await {
            tracing::error!("Error sending MQTT message to Homebridge: {} -- {:?}", msg.sub_topic, e);
        }
    }
}
