//! Mock radio stack for testing.
//!
//! This module provides an in-memory [`RadioDriver`] that can be used for
//! testing the connection manager without an ANT stick attached.
//!
//! # Features
//!
//! - **Failure injection**: fail transport open, node start, channel open or node stop
//! - **Transient failures**: fail the next `n` channel opens, then succeed
//! - **Sample injection**: push decoded heart-rate events into open channels
//! - **Lifecycle inspection**: count opens and observe release order
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use antpulse_core::{Config, ConnectionManager, ConnectionState, MockDriver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let driver = MockDriver::new();
//!     let manager = ConnectionManager::with_driver(Config::hardware(0x1009), Arc::new(driver.clone()));
//!
//!     assert_eq!(manager.start().await, ConnectionState::Running);
//!     let device = manager.open_heartrate_device(1234, 1).await.unwrap();
//!
//!     driver.deliver(device.key(), 72, 1.0, 830);
//!     assert_eq!(device.channel().take().unwrap().bpm, 72);
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use antpulse_types::DeviceKey;

use crate::backend::{
    DecoderChannel, HeartRateCallback, RadioDriver, Session, Transport, TransportConfig,
};
use crate::error::{SessionError, TransportError};

/// Lifecycle steps recorded by the mock, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockLifecycle {
    /// A transport was opened.
    TransportOpened,
    /// A session was created.
    SessionCreated,
    /// A session was started.
    SessionStarted,
    /// A session was stopped.
    SessionStopped,
    /// A decoder channel was opened.
    ChannelOpened,
    /// A decoder channel was dropped.
    ChannelClosed,
    /// A session was dropped.
    SessionReleased,
    /// A transport was dropped.
    TransportReleased,
}

#[derive(Default)]
struct MockState {
    transport_missing: AtomicBool,
    transport_denied: AtomicBool,
    fail_session_start: AtomicBool,
    fail_session_stop: AtomicBool,
    fail_channel_open: AtomicBool,
    remaining_channel_failures: AtomicU32,
    running: AtomicBool,
    transport_opens: AtomicU32,
    channel_opens: AtomicU32,
    callbacks: Mutex<HashMap<DeviceKey, Arc<dyn HeartRateCallback>>>,
    lifecycle: Mutex<Vec<MockLifecycle>>,
}

impl MockState {
    fn callbacks(&self) -> MutexGuard<'_, HashMap<DeviceKey, Arc<dyn HeartRateCallback>>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, step: MockLifecycle) {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(step);
    }
}

/// A mock ANT radio stack.
///
/// Cloning yields another handle to the same mock, so a test can keep one
/// clone for control while the manager owns another.
#[derive(Clone, Default)]
pub struct MockDriver {
    state: Arc<MockState>,
}

impl fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDriver")
            .field("running", &self.is_running())
            .field("transport_opens", &self.transport_opens())
            .field("open_channels", &self.open_channels())
            .finish()
    }
}

impl MockDriver {
    /// Create a mock where every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    // --- Failure injection ---

    /// Make transport open fail with [`TransportError::NotFound`].
    pub fn set_transport_missing(&self, missing: bool) {
        self.state.transport_missing.store(missing, Ordering::Relaxed);
    }

    /// Make transport open fail with [`TransportError::AccessDenied`].
    pub fn set_transport_denied(&self, denied: bool) {
        self.state.transport_denied.store(denied, Ordering::Relaxed);
    }

    /// Make node start fail.
    pub fn set_session_start_failure(&self, fail: bool) {
        self.state.fail_session_start.store(fail, Ordering::Relaxed);
    }

    /// Make node stop report an error.
    pub fn set_session_stop_failure(&self, fail: bool) {
        self.state.fail_session_stop.store(fail, Ordering::Relaxed);
    }

    /// Make every channel open fail.
    pub fn set_channel_open_failure(&self, fail: bool) {
        self.state.fail_channel_open.store(fail, Ordering::Relaxed);
    }

    /// Fail the next `count` channel opens, then succeed.
    pub fn set_transient_channel_failures(&self, count: u32) {
        self.state
            .remaining_channel_failures
            .store(count, Ordering::Relaxed);
    }

    /// Simulate the node halting on its own (e.g. the stick was unplugged).
    pub fn halt(&self) {
        self.state.running.store(false, Ordering::Relaxed);
    }

    // --- Sample injection ---

    /// Deliver a decoded heart-rate page to the channel open for `key`.
    ///
    /// Returns `false` if no channel is open for `key`.
    pub fn deliver(&self, key: DeviceKey, bpm: u8, event_time_s: f64, rr_interval_ms: u16) -> bool {
        let callback = self.state.callbacks().get(&key).cloned();
        match callback {
            Some(callback) => {
                callback.heartrate_data(bpm, event_time_s, rr_interval_ms);
                true
            }
            None => false,
        }
    }

    /// Report a found sensor to the channel open for `key`.
    pub fn announce(&self, key: DeviceKey) -> bool {
        let callback = self.state.callbacks().get(&key).cloned();
        match callback {
            Some(callback) => {
                callback.device_found(key.device_number, key.transmission_type);
                true
            }
            None => false,
        }
    }

    // --- Inspection ---

    /// Whether the node is running.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Relaxed)
    }

    /// Number of successful transport opens.
    pub fn transport_opens(&self) -> u32 {
        self.state.transport_opens.load(Ordering::Relaxed)
    }

    /// Number of successful channel opens.
    pub fn channel_opens(&self) -> u32 {
        self.state.channel_opens.load(Ordering::Relaxed)
    }

    /// Number of decoder channels currently open.
    pub fn open_channels(&self) -> usize {
        self.state.callbacks().len()
    }

    /// Lifecycle steps recorded so far.
    pub fn lifecycle(&self) -> Vec<MockLifecycle> {
        self.state
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RadioDriver for MockDriver {
    async fn open_transport(
        &self,
        config: &TransportConfig,
    ) -> Result<Box<dyn Transport>, TransportError> {
        if self.state.transport_missing.load(Ordering::Relaxed) {
            return Err(TransportError::NotFound {
                product_id: config.product_id,
            });
        }
        if self.state.transport_denied.load(Ordering::Relaxed) {
            return Err(TransportError::AccessDenied {
                product_id: config.product_id,
            });
        }

        self.state.transport_opens.fetch_add(1, Ordering::Relaxed);
        self.state.record(MockLifecycle::TransportOpened);
        Ok(Box::new(MockTransport {
            product_id: config.product_id,
            state: Arc::clone(&self.state),
        }))
    }

    async fn create_session(
        &self,
        _transport: &dyn Transport,
    ) -> Result<Box<dyn Session>, SessionError> {
        self.state.record(MockLifecycle::SessionCreated);
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockTransport {
    product_id: u16,
    state: Arc<MockState>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("product_id", &self.product_id)
            .finish()
    }
}

impl Transport for MockTransport {
    fn describe(&self) -> String {
        format!("mock:{:04x}", self.product_id)
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.state.record(MockLifecycle::TransportReleased);
    }
}

struct MockSession {
    state: Arc<MockState>,
}

impl fmt::Debug for MockSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSession")
            .field("running", &self.state.running.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl Session for MockSession {
    async fn start(&self) -> Result<(), SessionError> {
        if self.state.fail_session_start.load(Ordering::Relaxed) {
            return Err(SessionError::StartFailed("mock node refused to start".to_string()));
        }
        self.state.running.store(true, Ordering::Relaxed);
        self.state.record(MockLifecycle::SessionStarted);
        Ok(())
    }

    async fn stop(&self) -> Result<(), SessionError> {
        self.state.running.store(false, Ordering::Relaxed);
        self.state.record(MockLifecycle::SessionStopped);
        if self.state.fail_session_stop.load(Ordering::Relaxed) {
            return Err(SessionError::StopFailed("mock node reset timeout".to_string()));
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Relaxed)
    }

    fn open_heartrate_channel(
        &self,
        key: DeviceKey,
        callback: Arc<dyn HeartRateCallback>,
    ) -> Result<Box<dyn DecoderChannel>, SessionError> {
        if self.state.fail_channel_open.load(Ordering::Relaxed) {
            return Err(SessionError::ChannelOpen {
                key,
                reason: "mock channel open failure".to_string(),
            });
        }

        let remaining = self.state.remaining_channel_failures.load(Ordering::Relaxed);
        if remaining > 0 {
            self.state
                .remaining_channel_failures
                .store(remaining - 1, Ordering::Relaxed);
            return Err(SessionError::ChannelOpen {
                key,
                reason: "mock transient channel failure".to_string(),
            });
        }

        self.state.callbacks().insert(key, callback);
        self.state.record(MockLifecycle::ChannelOpened);
        self.state.channel_opens.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MockDecoderChannel {
            key,
            state: Arc::clone(&self.state),
        }))
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Relaxed);
        self.state.record(MockLifecycle::SessionReleased);
    }
}

struct MockDecoderChannel {
    key: DeviceKey,
    state: Arc<MockState>,
}

impl fmt::Debug for MockDecoderChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDecoderChannel")
            .field("key", &self.key)
            .finish()
    }
}

impl DecoderChannel for MockDecoderChannel {
    fn key(&self) -> DeviceKey {
        self.key
    }
}

impl Drop for MockDecoderChannel {
    fn drop(&mut self) {
        self.state.callbacks().remove(&self.key);
        self.state.record(MockLifecycle::ChannelClosed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::HrmCallback;
    use crate::channel::SampleChannel;

    #[tokio::test]
    async fn test_transport_failures() {
        let driver = MockDriver::new();
        let config = TransportConfig::new(0x1009);

        driver.set_transport_missing(true);
        assert_eq!(
            driver.open_transport(&config).await.unwrap_err(),
            TransportError::NotFound { product_id: 0x1009 }
        );

        driver.set_transport_missing(false);
        driver.set_transport_denied(true);
        assert_eq!(
            driver.open_transport(&config).await.unwrap_err(),
            TransportError::AccessDenied { product_id: 0x1009 }
        );
        assert_eq!(driver.transport_opens(), 0);
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let driver = MockDriver::new();
        let transport = driver
            .open_transport(&TransportConfig::new(0x1008))
            .await
            .unwrap();
        assert_eq!(transport.describe(), "mock:1008");

        let session = driver.create_session(transport.as_ref()).await.unwrap();
        assert!(!session.is_running());
        session.start().await.unwrap();
        assert!(driver.is_running());

        session.stop().await.unwrap();
        assert!(!session.is_running());

        drop(session);
        drop(transport);
        assert_eq!(
            driver.lifecycle(),
            vec![
                MockLifecycle::TransportOpened,
                MockLifecycle::SessionCreated,
                MockLifecycle::SessionStarted,
                MockLifecycle::SessionStopped,
                MockLifecycle::SessionReleased,
                MockLifecycle::TransportReleased,
            ]
        );
    }

    #[tokio::test]
    async fn test_deliver_and_close_channel() {
        let driver = MockDriver::new();
        let transport = driver
            .open_transport(&TransportConfig::new(0x1009))
            .await
            .unwrap();
        let session = driver.create_session(transport.as_ref()).await.unwrap();
        session.start().await.unwrap();

        let key = DeviceKey::new(321, 1);
        let channel = Arc::new(SampleChannel::new());
        let callback = Arc::new(HrmCallback::new(key, Arc::clone(&channel)));
        let decoder_channel = session.open_heartrate_channel(key, callback).unwrap();
        assert_eq!(decoder_channel.key(), key);
        assert_eq!(driver.open_channels(), 1);

        assert!(driver.announce(key));
        assert!(driver.deliver(key, 88, 4.5, 700));
        assert_eq!(channel.take().map(|s| s.bpm), Some(88));

        drop(decoder_channel);
        assert_eq!(driver.open_channels(), 0);
        assert!(!driver.deliver(key, 88, 5.5, 700));
        assert_eq!(
            driver.lifecycle()[3..],
            [MockLifecycle::ChannelOpened, MockLifecycle::ChannelClosed]
        );
    }

    #[tokio::test]
    async fn test_transient_channel_failures() {
        let driver = MockDriver::new();
        let transport = driver
            .open_transport(&TransportConfig::new(0x1009))
            .await
            .unwrap();
        let session = driver.create_session(transport.as_ref()).await.unwrap();
        driver.set_transient_channel_failures(2);

        let key = DeviceKey::new(1, 1);
        let open = || {
            let channel = Arc::new(SampleChannel::new());
            session.open_heartrate_channel(key, Arc::new(HrmCallback::new(key, channel)))
        };

        assert!(open().is_err());
        assert!(open().is_err());
        assert!(open().is_ok());
        assert_eq!(driver.channel_opens(), 1);
    }
}
