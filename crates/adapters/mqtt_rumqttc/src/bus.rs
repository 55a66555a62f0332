//! [`MessageBus`] implementation over a `rumqttc` async client.
//!
//! The transport begins in a pending phase that records the last-will and
//! queues outbound requests, so wiring code can run before any broker
//! connection exists. [`MqttTransport::start`] builds the client with the
//! recorded will, flushes the queue, and spawns the event pump.

use std::sync::Mutex;
use std::time::Duration;

use devbridge_app::ports::{BusError, BusEvent, MessageBus, Qos};
use rumqttc::{AsyncClient, ClientError, Event, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;

use crate::MqttConfig;

/// Size of the client-side outbound request queue.
const OUTBOUND_CAPACITY: usize = 64;

/// Backoff between reconnection attempts after a poll error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

struct Will {
    topic: String,
    payload: String,
    qos: Qos,
    retain: bool,
}

enum Outbound {
    Publish {
        topic: String,
        payload: String,
        qos: Qos,
        retain: bool,
    },
    Subscribe {
        topic: String,
        qos: Qos,
    },
}

enum Phase {
    /// No client yet; requests are queued and replayed on start.
    Pending {
        will: Option<Will>,
        outbound: Vec<Outbound>,
    },
    /// Connected client; requests go straight to its request queue.
    Running { client: AsyncClient },
}

/// MQTT transport backed by `rumqttc`.
pub struct MqttTransport {
    config: MqttConfig,
    state: Mutex<Phase>,
}

impl MqttTransport {
    #[must_use]
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            state: Mutex::new(Phase::Pending {
                will: None,
                outbound: Vec::new(),
            }),
        }
    }

    /// Build the client, flush queued requests and spawn the event pump.
    ///
    /// Broker activity is forwarded as [`BusEvent`]s over `events`; the
    /// pump stops when the receiving side of that channel is dropped.
    /// Reconnection is handled by `rumqttc` on the next poll after a
    /// short backoff. Calling `start` twice is a wiring bug; the second
    /// call logs an error and spawns nothing.
    pub fn start(&self, events: mpsc::Sender<BusEvent>) -> tokio::task::JoinHandle<()> {
        let mut options = MqttOptions::new(
            self.config.client_id.clone(),
            self.config.host.clone(),
            self.config.port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));
        options.set_clean_session(self.config.clean_session);
        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            options.set_credentials(username.clone(), password.clone());
        }

        let mut state = self.state.lock().expect("mqtt transport lock poisoned");
        let Phase::Pending { will, outbound } = &mut *state else {
            tracing::error!("mqtt transport already started");
            return tokio::spawn(async {});
        };
        if let Some(will) = will.take() {
            options.set_last_will(LastWill::new(
                will.topic,
                will.payload,
                map_qos(will.qos),
                will.retain,
            ));
        }
        let queued = std::mem::take(outbound);

        let (client, mut eventloop) = AsyncClient::new(options, OUTBOUND_CAPACITY);
        for request in queued {
            let result = match request {
                Outbound::Publish {
                    topic,
                    payload,
                    qos,
                    retain,
                } => client.try_publish(topic, map_qos(qos), retain, payload),
                Outbound::Subscribe { topic, qos } => client.try_subscribe(topic, map_qos(qos)),
            };
            if let Err(error) = result {
                tracing::warn!(%error, "dropping request queued before start");
            }
        }
        *state = Phase::Running { client };
        drop(state);

        let host = self.config.host.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        tracing::info!(host = %host, "connected to broker");
                        if events.send(BusEvent::Connected).await.is_err() {
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                        let message = BusEvent::Message {
                            topic: publish.topic,
                            payload,
                        };
                        if events.send(message).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(%error, "broker connection lost, retrying");
                        if events.send(BusEvent::Disconnected).await.is_err() {
                            break;
                        }
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
            }
            tracing::debug!("event pump stopped");
        })
    }
}

impl MessageBus for MqttTransport {
    fn publish(&self, topic: &str, payload: &str, qos: Qos, retain: bool) -> Result<(), BusError> {
        let mut state = self.state.lock().expect("mqtt transport lock poisoned");
        match &mut *state {
            Phase::Pending { outbound, .. } => {
                outbound.push(Outbound::Publish {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                    qos,
                    retain,
                });
                Ok(())
            }
            Phase::Running { client } => client
                .try_publish(topic, map_qos(qos), retain, payload)
                .map_err(|error| map_client_error(&error)),
        }
    }

    fn subscribe(&self, topic: &str, qos: Qos) -> Result<(), BusError> {
        let mut state = self.state.lock().expect("mqtt transport lock poisoned");
        match &mut *state {
            Phase::Pending { outbound, .. } => {
                outbound.push(Outbound::Subscribe {
                    topic: topic.to_string(),
                    qos,
                });
                Ok(())
            }
            Phase::Running { client } => client
                .try_subscribe(topic, map_qos(qos))
                .map_err(|error| map_client_error(&error)),
        }
    }

    fn set_will(&self, topic: &str, payload: &str, qos: Qos, retain: bool) {
        let mut state = self.state.lock().expect("mqtt transport lock poisoned");
        match &mut *state {
            Phase::Pending { will, .. } => {
                *will = Some(Will {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                    qos,
                    retain,
                });
            }
            Phase::Running { .. } => {
                tracing::warn!(topic, "last-will registered after start is ignored");
            }
        }
    }
}

fn map_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

fn map_client_error(error: &ClientError) -> BusError {
    match error {
        ClientError::TryRequest(_) => BusError::QueueFull,
        _ => BusError::Closed,
    }
}
