use anyhow::anyhow;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::config::SessionConfig;
use crate::conversion::ConversionRegistry;
use crate::error::{SessionError, SessionResult};
use crate::hal::{ChannelMap, DeviceDriver, DeviceSummary, SensorDevice};
use crate::observability::{MetricsSnapshot, StreamMetrics};
use super::acquisition::AcquisitionCallback;
use super::buffer::SharedSampleBuffer;
use super::drain::{DrainCycle, DrainReport};
use super::state::SessionState;

/// What teardown observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    /// The acquisition thread outlived the grace period
    pub stalled: bool,

    /// Device stop/close failures, logged and otherwise ignored
    pub device_errors: Vec<String>,
}

/// One acquisition run against one device.
///
/// `Idle -> Connected -> Streaming -> Stopped`; a stopped session cannot be
/// restarted. Batches buffered before teardown can still be drained after it.
pub struct Session {
    driver: Arc<dyn DeviceDriver>,
    config: SessionConfig,
    registry: ConversionRegistry,
    state: SessionState,
    address: Option<String>,
    device: Option<Arc<dyn SensorDevice>>,
    summary: Option<DeviceSummary>,
    buffer: Arc<SharedSampleBuffer>,
    stop_flag: Arc<AtomicBool>,
    channels: Option<Arc<ChannelMap>>,
    metrics: Arc<StreamMetrics>,
    producer: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(driver: Arc<dyn DeviceDriver>, config: SessionConfig) -> Self {
        Self {
            driver,
            config,
            registry: ConversionRegistry::standard(),
            state: SessionState::Idle,
            address: None,
            device: None,
            summary: None,
            buffer: Arc::new(SharedSampleBuffer::new()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            channels: None,
            metrics: Arc::new(StreamMetrics::new()),
            producer: None,
        }
    }

    /// Replace the built-in conversions
    pub fn with_registry(mut self, registry: ConversionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Connect and start streaming. Any failure tears the session down, so
    /// the caller only ever sees a streaming session or an error.
    pub async fn open(driver: Arc<dyn DeviceDriver>, config: SessionConfig) -> SessionResult<Self> {
        let mut session = Self::new(driver, config);

        let started = match session.connect().await {
            Ok(()) => session.start(),
            Err(e) => Err(e),
        };

        if let Err(e) = started {
            session.stop().await;
            return Err(e);
        }

        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn summary(&self) -> Option<&DeviceSummary> {
        self.summary.as_ref()
    }

    pub fn channel_map(&self) -> Option<&ChannelMap> {
        self.channels.as_deref()
    }

    pub fn rate(&self) -> Option<u32> {
        self.channels.as_ref().map(|c| c.rate())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn transition(&mut self, to: SessionState) -> SessionResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Resolve the device address, open it, and log its details
    pub async fn connect(&mut self) -> SessionResult<()> {
        if !self.state.can_transition_to(SessionState::Connected) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: SessionState::Connected,
            });
        }

        let address = match self.config.target_address() {
            Some(address) => address.to_string(),
            None => self.discover().await?,
        };

        let device: Arc<dyn SensorDevice> = self
            .driver
            .open(&address)
            .map_err(|e| SessionError::ConnectionFailed {
                address: address.clone(),
                reason: e.to_string(),
            })?
            .into();

        let summary = match read_summary(device.as_ref()) {
            Ok(summary) => summary,
            Err(e) => {
                if let Err(close_err) = device.close() {
                    log::error!("Failed to close {}: {}", address, close_err);
                }
                return Err(SessionError::ConnectionFailed {
                    address,
                    reason: e.to_string(),
                });
            }
        };

        log::info!("Connected to {}", address);
        log::info!("{:?}", summary);

        self.address = Some(address);
        self.device = Some(device);
        self.summary = Some(summary);
        self.transition(SessionState::Connected)
    }

    async fn discover(&self) -> SessionResult<String> {
        let kind = &self.config.device_kind;
        let devices = self.driver.discover().await?;
        log::debug!(
            "{} discovered {} device(s)",
            self.driver.driver_id(),
            devices.len()
        );

        devices
            .into_iter()
            .find(|d| &d.kind == kind)
            .map(|d| d.address)
            .ok_or_else(|| SessionError::DeviceNotFound { kind: kind.clone() })
    }

    /// Build the channel map, arm the device and spawn the acquisition thread
    pub fn start(&mut self) -> SessionResult<()> {
        if !self.state.can_transition_to(SessionState::Streaming) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: SessionState::Streaming,
            });
        }
        let device = self
            .device
            .clone()
            .ok_or_else(|| anyhow!("Connected session has no device"))?;

        let sensors = device.sensors()?;
        let channels = ChannelMap::build(
            &sensors,
            &self.registry,
            self.config.rate,
            self.config.effective_resolution(),
        )?;

        self.buffer.reset();
        self.stop_flag.store(false, Ordering::Release);

        device.start(channels.rate(), channels.mask(), channels.resolution())?;

        let callback =
            AcquisitionCallback::new(Arc::clone(&self.buffer), Arc::clone(&self.stop_flag))
                .into_callback();
        let producer_device = Arc::clone(&device);
        let spawned = thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || {
                if let Err(e) = producer_device.run(callback) {
                    log::error!("Acquisition loop failed: {}", e);
                }
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(stop_err) = device.stop() {
                    log::error!("Failed to stop device: {}", stop_err);
                }
                return Err(anyhow!("Failed to spawn acquisition thread: {}", e).into());
            }
        };

        log::info!(
            "Streaming {} channel(s) at {} Hz (mask {:#b})",
            channels.len(),
            channels.rate(),
            channels.mask()
        );

        self.producer = Some(handle);
        self.channels = Some(Arc::new(channels));
        self.transition(SessionState::Streaming)
    }

    /// Drain cycle bound to this session's buffer, once streaming has started
    pub fn drain_cycle(&self) -> Option<DrainCycle> {
        self.channels.as_ref().map(|channels| {
            DrainCycle::new(
                Arc::clone(&self.buffer),
                Arc::clone(channels),
                Arc::clone(&self.metrics),
            )
        })
    }

    /// Run one drain cycle. Before streaming starts this reports nothing.
    pub fn drain(&self) -> DrainReport {
        self.drain_cycle()
            .map(|cycle| cycle.run())
            .unwrap_or_default()
    }

    /// Drain on the current tokio runtime every `drain_interval_ms`
    pub fn spawn_drain_task(
        &self,
        tx: Sender<DrainReport>,
        shutdown: broadcast::Receiver<()>,
    ) -> SessionResult<tokio::task::JoinHandle<()>> {
        let cycle = self.drain_cycle().ok_or(SessionError::InvalidTransition {
            from: self.state,
            to: SessionState::Streaming,
        })?;
        Ok(cycle.spawn(self.config.drain_interval(), tx, shutdown))
    }

    /// Tear down: raise the stop flag, give the acquisition thread the grace
    /// period to notice, then stop and close the device regardless.
    pub async fn stop(&mut self) -> StopReport {
        let mut report = StopReport::default();
        if self.state == SessionState::Stopped {
            return report;
        }

        let was_streaming = self.state == SessionState::Streaming;
        self.stop_flag.store(true, Ordering::Release);

        let grace = self.config.grace_period();
        let mut stalled_producer = None;
        if let Some(handle) = self.producer.take() {
            if wait_for_exit(&handle, grace).await {
                join_producer(handle);
            } else {
                log::warn!("{}", SessionError::StreamingStallTimeout { grace });
                report.stalled = true;
                stalled_producer = Some(handle);
            }
        }

        if let Some(device) = self.device.take() {
            if was_streaming {
                if let Err(e) = device.stop() {
                    log::error!("Failed to stop device: {}", e);
                    report.device_errors.push(e.to_string());
                }
            }
            if let Err(e) = device.close() {
                log::error!("Failed to close device: {}", e);
                report.device_errors.push(e.to_string());
            }
        }

        if let Some(handle) = stalled_producer {
            if wait_for_exit(&handle, grace).await {
                join_producer(handle);
            } else {
                log::warn!("Detaching acquisition thread that ignored device shutdown");
            }
        }

        self.state = SessionState::Stopped;
        if let Some(address) = &self.address {
            log::info!("Disconnected from {}", address);
        }
        report
    }
}

impl Drop for Session {
    /// Best-effort teardown for sessions never passed through `stop()`.
    /// Releases the device without waiting for the acquisition thread.
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);

        let Some(device) = self.device.take() else {
            return;
        };
        log::warn!("Session dropped without stop(), releasing device");

        if self.state == SessionState::Streaming {
            if let Err(e) = device.stop() {
                log::error!("Failed to stop device: {}", e);
            }
        }
        if let Err(e) = device.close() {
            log::error!("Failed to close device: {}", e);
        }
    }
}

fn read_summary(device: &dyn SensorDevice) -> anyhow::Result<DeviceSummary> {
    let properties = device.properties()?;
    let battery = device.battery()?;
    Ok(DeviceSummary::new(&properties, battery))
}

async fn wait_for_exit(handle: &JoinHandle<()>, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    true
}

fn join_producer(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        log::error!("Acquisition thread panicked");
    }
}
