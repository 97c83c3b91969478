//! Broker session lifecycle.
//!
//! [`MqttConnection::connect`] drives the rumqttc event loop until the
//! initial connect outcome is known, then hands the event loop to a
//! background task that owns all socket I/O for the rest of the session.
//! The publish loop talks to that task only through the client's request
//! channel one way and the [`ConnectionEvent`] channel the other, so
//! neither side can block the other.

use std::io::ErrorKind;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{config::BrokerConfig, Error, Result};

use super::ConnectionEvent;

/// Capacity of the client's outbound request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Delay before the background task retries after a transport error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Lifecycle states of a broker session. Transitions are monotonic except
/// that `Failed` branches terminally off `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Init,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    Failed,
}

#[derive(Debug)]
pub struct MqttConnection {
    client: AsyncClient,
    addr: String,
    state: Arc<Mutex<ConnectionState>>,
    events_rx: Option<mpsc::UnboundedReceiver<ConnectionEvent>>,
    io_cancel: CancellationToken,
    io_task: Option<JoinHandle<()>>,
}

impl MqttConnection {
    /// Establishes a session with the broker.
    ///
    /// Returns [`Error::ConnectionRefused`] when nothing is listening at
    /// the configured address; that outcome is terminal and no background
    /// task is left behind. A CONNACK with a non-success reason code is
    /// logged but not fatal: the event loop keeps retrying in the
    /// background and publishes are still accepted meanwhile (see the
    /// connect-failure note in DESIGN.md).
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let addr = config.addr();
        let client_id = format!("{}-{}", config.client_id_prefix, std::process::id());

        let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(true);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            info!(username = %username, "using broker authentication");
            options.set_credentials(username.clone(), password.clone());
        }

        let state = Arc::new(Mutex::new(ConnectionState::Connecting));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        info!(addr = %addr, "connecting to MQTT broker");

        // Drive the event loop by hand until the initial TCP + CONNACK
        // outcome is known, bounded by the connect timeout.
        let outcome = tokio::time::timeout(config.connect_timeout(), async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => return Ok(ack),
                    Ok(_) => continue,
                    Err(e) => return Err(e),
                }
            }
        })
        .await
        .map_err(|_| {
            set_state(&state, ConnectionState::Failed);
            Error::Connection(format!(
                "connection to {} timed out after {}s",
                addr, config.connect_timeout_secs
            ))
        })?;

        match outcome {
            Ok(ack) if ack.code == ConnectReturnCode::Success => {
                info!(session_present = ack.session_present, "connected to MQTT broker");
                set_state(&state, ConnectionState::Connected);
                let _ = events_tx.send(ConnectionEvent::Connected {
                    session_present: ack.session_present,
                });
            }
            Ok(ack) => {
                warn!(code = ?ack.code, "broker rejected the session; continuing without it");
                let _ = events_tx.send(ConnectionEvent::ConnectFailed { code: ack.code });
            }
            Err(ConnectionError::ConnectionRefused(code)) => {
                warn!(code = ?code, "broker rejected the session; continuing without it");
                let _ = events_tx.send(ConnectionEvent::ConnectFailed { code });
            }
            Err(ConnectionError::Io(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                set_state(&state, ConnectionState::Failed);
                return Err(Error::ConnectionRefused { addr });
            }
            Err(e) => {
                set_state(&state, ConnectionState::Failed);
                return Err(Error::Connection(format!(
                    "failed to connect to {}: {}",
                    addr, e
                )));
            }
        }

        let io_cancel = CancellationToken::new();
        let io_task = tokio::spawn(io_loop(
            eventloop,
            state.clone(),
            events_tx,
            io_cancel.clone(),
        ));

        Ok(Self {
            client,
            addr,
            state,
            events_rx: Some(events_rx),
            io_cancel,
            io_task: Some(io_task),
        })
    }

    /// Non-blocking handoff of one payload to the background I/O task at
    /// QoS 1 (at-least-once), retain off. Returns once the request is
    /// enqueued; the acknowledgment arrives later as a
    /// [`ConnectionEvent::PubAck`].
    pub async fn publish(&self, topic: &str, payload: String) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(Error::from)
    }

    /// Takes the receiving half of the outcome channel. The caller may
    /// drain it for logging or drop it entirely; the event loop never
    /// waits on a consumer.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ConnectionEvent>> {
        self.events_rx.take()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends the MQTT DISCONNECT and stops the background I/O task.
    /// Idempotent; later calls are no-ops.
    pub async fn disconnect(&mut self) {
        let Some(io_task) = self.io_task.take() else {
            return;
        };

        set_state(&self.state, ConnectionState::Disconnecting);
        if let Err(e) = self.client.disconnect().await {
            debug!(error = %e, "disconnect request not delivered; session already down");
        }

        self.io_cancel.cancel();
        if io_task.await.is_err() {
            warn!("connection I/O task aborted before shutdown completed");
        }

        set_state(&self.state, ConnectionState::Disconnected);
        info!(addr = %self.addr, "disconnected from MQTT broker");
    }
}

impl Drop for MqttConnection {
    fn drop(&mut self) {
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
    }
}

fn set_state(state: &Arc<Mutex<ConnectionState>>, next: ConnectionState) {
    let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = next;
}

/// Background I/O loop: owns the event loop, forwards outcomes, retries on
/// transport errors until cancelled.
async fn io_loop(
    mut eventloop: EventLoop,
    state: Arc<Mutex<ConnectionState>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            polled = eventloop.poll() => match polled {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        set_state(&state, ConnectionState::Connected);
                        debug!(session_present = ack.session_present, "session (re)established");
                        let _ = events.send(ConnectionEvent::Connected {
                            session_present: ack.session_present,
                        });
                    } else {
                        warn!(code = ?ack.code, "broker rejected the session");
                        let _ = events.send(ConnectionEvent::ConnectFailed { code: ack.code });
                    }
                }
                Ok(Event::Incoming(Packet::PubAck(ack))) => {
                    let _ = events.send(ConnectionEvent::PubAck { pkid: ack.pkid });
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("broker closed the session");
                    let _ = events.send(ConnectionEvent::Disconnected);
                }
                Ok(_) => {}
                Err(e) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    warn!(error = %e, "MQTT transport error, retrying");
                    let _ = events.send(ConnectionEvent::TransportError {
                        message: e.to_string(),
                    });
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}
