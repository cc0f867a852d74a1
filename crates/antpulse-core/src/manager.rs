//! Connection lifecycle management.
//!
//! [`ConnectionManager`] owns the single process-wide connection to the ANT
//! radio: it opens the USB transport, starts the ANT node on top of it, and
//! hands out logical heart-rate devices. Every hardware failure degrades the
//! manager to "no device available" instead of surfacing an error, so a
//! missing sensor never takes the host application down.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use antpulse_core::{Config, ConnectionManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = ConnectionManager::new(Config::simulated());
//!     manager.start().await;
//!
//!     let device = manager.open_heartrate_device(0, 0).await.unwrap();
//!     if let Some(sample) = device.channel().recv_timeout(Duration::from_secs(2)).await {
//!         println!("{} bpm", sample.bpm);
//!     }
//!
//!     manager.stop().await;
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use antpulse_types::{DeviceKey, usb};

use crate::backend::{RadioDriver, Session, Transport, UnavailableDriver};
use crate::callback::HrmCallback;
use crate::channel::SampleChannel;
use crate::config::{Config, Mode};
use crate::device::{LogicalDevice, SharedDevice};
use crate::error::{Error, SessionError, TransportError};
use crate::events::{EventDispatcher, ManagerEvent};
use crate::registry::DeviceRegistry;
use crate::simulator::SimulatedSource;

/// Lifecycle state of a [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// `start()` has not been called yet.
    Uninitialized,
    /// Simulated mode; no transport or session exists.
    Simulated,
    /// The USB transport could not be opened.
    TransportFailed,
    /// The transport opened but the ANT node could not be started.
    SessionFailed,
    /// The ANT node is running and devices can be opened.
    Running,
    /// The manager was stopped.
    Stopped,
}

impl ConnectionState {
    /// Whether the manager is in a degraded hardware state.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::TransportFailed | Self::SessionFailed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Simulated => "simulated",
            Self::TransportFailed => "transport failed",
            Self::SessionFailed => "session failed",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// The hardware failure that put the manager into a degraded state.
#[derive(Debug, Clone)]
enum Fault {
    Transport(TransportError),
    Session(SessionError),
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        match fault {
            Fault::Transport(e) => Error::Transport(e),
            Fault::Session(e) => Error::Session(e),
        }
    }
}

/// A running ANT node and the transport it is bound to.
struct Connection {
    // Fields drop in declaration order: the session must go before its transport.
    session: Box<dyn Session>,
    transport: Box<dyn Transport>,
}

struct Inner {
    state: ConnectionState,
    connection: Option<Connection>,
    last_fault: Option<Fault>,
    /// Parent token for every simulator spawned by this manager.
    cancel: CancellationToken,
}

/// Owner of the radio connection and the logical devices opened on it.
///
/// Construct one per process and share it by reference (or `Arc`).
pub struct ConnectionManager {
    config: Config,
    driver: Arc<dyn RadioDriver>,
    inner: Mutex<Inner>,
    registry: DeviceRegistry,
    events: EventDispatcher,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("mode", &self.config.mode)
            .field("state", &self.try_state())
            .finish()
    }
}

impl ConnectionManager {
    /// Create a manager with no radio stack linked in.
    ///
    /// In hardware mode `start()` will end in
    /// [`ConnectionState::TransportFailed`]; simulated mode works normally.
    pub fn new(config: Config) -> Self {
        Self::with_driver(config, Arc::new(UnavailableDriver))
    }

    /// Create a manager using `driver` for transport and session access.
    pub fn with_driver(config: Config, driver: Arc<dyn RadioDriver>) -> Self {
        let events = EventDispatcher::new(config.event_capacity);
        Self {
            config,
            driver,
            inner: Mutex::new(Inner {
                state: ConnectionState::Uninitialized,
                connection: None,
                last_fault: None,
                cancel: CancellationToken::new(),
            }),
            registry: DeviceRegistry::new(),
            events,
        }
    }

    /// Get the manager configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The configured sample source.
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Get the event dispatcher for subscribing to lifecycle events.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Current lifecycle state, if it can be read without waiting.
    ///
    /// Returns `None` while another task is starting, stopping or opening a
    /// device.
    pub fn try_state(&self) -> Option<ConnectionState> {
        self.inner.try_lock().ok().map(|inner| inner.state)
    }

    /// Whether the ANT node is running.
    pub async fn is_running(&self) -> bool {
        self.state().await == ConnectionState::Running
    }

    /// The failure behind a `TransportFailed` or `SessionFailed` state.
    pub async fn last_error(&self) -> Option<Error> {
        self.inner.lock().await.last_fault.clone().map(Error::from)
    }

    /// Number of hardware devices currently registered.
    pub async fn device_count(&self) -> usize {
        self.registry.len().await
    }

    /// Open the radio and start the ANT node.
    ///
    /// Never fails: on any hardware problem the manager records the cause,
    /// logs it and settles in a degraded state. Returns the resulting state.
    /// Calling `start()` on a running (or simulated) manager is a no-op.
    pub async fn start(&self) -> ConnectionState {
        let mut inner = self.inner.lock().await;

        if matches!(
            inner.state,
            ConnectionState::Running | ConnectionState::Simulated
        ) {
            debug!("start() ignored, manager already {}", inner.state);
            return inner.state;
        }

        let Some(transport_config) = self.config.transport_config() else {
            info!("Simulated mode, faking heart-rate devices with random data");
            inner.state = ConnectionState::Simulated;
            return inner.state;
        };
        let product_id = transport_config.product_id;

        info!(
            "Opening ANT USB stick 0x{:04x} ({})...",
            product_id,
            usb::product_name(product_id).unwrap_or("unknown product")
        );
        let transport = match self.driver.open_transport(&transport_config).await {
            Ok(transport) => transport,
            Err(e) => {
                warn!("Unable to open USB device: {}", e);
                self.events.send(ManagerEvent::TransportFailed {
                    product_id,
                    error: e.to_string(),
                });
                inner.last_fault = Some(Fault::Transport(e));
                inner.state = ConnectionState::TransportFailed;
                return inner.state;
            }
        };
        info!("Got USB transport: {}", transport.describe());
        self.events.send(ManagerEvent::TransportOpened { product_id });

        debug!("Creating node...");
        let session = match self.driver.create_session(transport.as_ref()).await {
            Ok(session) => session,
            Err(e) => return self.session_failed(&mut inner, e),
        };

        debug!("Starting node {:?}", session);
        if let Err(e) = session.start().await {
            drop(session);
            return self.session_failed(&mut inner, e);
        }

        info!("Node started on {}", transport.describe());
        inner.connection = Some(Connection { session, transport });
        inner.last_fault = None;
        inner.state = ConnectionState::Running;
        self.events.send(ManagerEvent::SessionStarted);
        inner.state
    }

    fn session_failed(&self, inner: &mut Inner, error: SessionError) -> ConnectionState {
        warn!("Unable to start node: {}", error);
        self.events.send(ManagerEvent::SessionFailed {
            error: error.to_string(),
        });
        inner.connection = None;
        inner.last_fault = Some(Fault::Session(error));
        inner.state = ConnectionState::SessionFailed;
        inner.state
    }

    /// Stop the ANT node and release the radio.
    ///
    /// When running, registered devices are closed first, then the node is
    /// stopped and the session and transport are released in that order.
    /// Devices still held by callers stop receiving samples. In simulated
    /// mode every spawned simulator is cancelled, whether or not `start()`
    /// was called. Otherwise this is a no-op, so repeated calls are safe.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;

        match inner.state {
            ConnectionState::Running => {
                let devices = self.registry.drain().await;
                for device in &devices {
                    device.close();
                }
                if let Some(connection) = inner.connection.take() {
                    if connection.session.is_running()
                        && let Err(e) = connection.session.stop().await
                    {
                        warn!("Error while stopping node: {}", e);
                    }
                    debug!("Releasing USB transport {}", connection.transport.describe());
                    drop(connection);
                }
                Self::cancel_simulators(&mut inner);
                inner.state = ConnectionState::Stopped;
                self.events.send(ManagerEvent::SessionStopped);
                info!("Node stopped, closed {} device(s)", devices.len());
            }
            _ if self.config.mode.is_simulated() => {
                Self::cancel_simulators(&mut inner);
                inner.state = ConnectionState::Stopped;
                info!("Simulated heart-rate sources stopped");
            }
            state => {
                debug!("stop() ignored, manager {}", state);
            }
        }
    }

    fn cancel_simulators(inner: &mut Inner) {
        // Later simulated opens get a fresh parent token.
        std::mem::replace(&mut inner.cancel, CancellationToken::new()).cancel();
    }

    /// Open a heart-rate sensor.
    ///
    /// In simulated mode every call returns a fresh simulator-backed device,
    /// or `None` if the simulator options are invalid. In hardware mode, repeat calls with the same key return the same
    /// device; `None` is returned if the node is not running or the decoder
    /// refuses the channel. Failures are logged, never raised.
    pub async fn open_heartrate_device(
        &self,
        device_number: u16,
        transmission_type: u8,
    ) -> Option<SharedDevice> {
        let key = DeviceKey::new(device_number, transmission_type);

        if self.config.mode.is_simulated() {
            return self.open_simulated(key).await;
        }

        let inner = self.inner.lock().await;

        let Some(connection) = inner.connection.as_ref() else {
            warn!("Unable to open heart-rate device {}, no USB device or node", key);
            return None;
        };
        let session = connection.session.as_ref();
        if !session.is_running() {
            warn!("Unable to open heart-rate device {}, node not running", key);
            return None;
        }

        let mut created = false;
        let device = self
            .registry
            .get_or_create(key, || {
                created = true;
                let channel = Arc::new(SampleChannel::new());
                let callback = Arc::new(
                    HrmCallback::new(key, Arc::clone(&channel)).with_events(self.events.clone()),
                );
                let decoder_channel = session.open_heartrate_channel(key, callback.clone())?;
                Ok(LogicalDevice::hardware(key, channel, callback, decoder_channel))
            })
            .await?;

        if created {
            self.events.send(ManagerEvent::DeviceOpened {
                key,
                simulated: false,
            });
        } else {
            self.events.send(ManagerEvent::DeviceReused { key });
        }
        Some(device)
    }

    async fn open_simulated(&self, key: DeviceKey) -> Option<SharedDevice> {
        if let Err(e) = self.config.simulator.validate() {
            warn!("Unable to fake heart-rate device {}: {}", key, e);
            return None;
        }

        let cancel = self.inner.lock().await.cancel.child_token();
        let channel = Arc::new(SampleChannel::new());
        let handle = SimulatedSource::spawn(
            Arc::clone(&channel),
            cancel,
            self.config.simulator.clone(),
        );

        info!("Faking heart-rate device {} with random data", key);
        self.events.send(ManagerEvent::DeviceOpened {
            key,
            simulated: true,
        });
        Some(Arc::new(LogicalDevice::simulated(key, channel, handle)))
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.inner.get_mut().cancel.cancel();
    }
}
