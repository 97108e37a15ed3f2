use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::hal::traits::{DeviceDriver, FrameCallback, SensorDevice};
use crate::hal::types::{DeviceInfo, DeviceProperties, SensorDescriptor, SensorKind};

/// Observable record of the commands a simulated device received
#[derive(Debug, Default)]
pub struct DeviceProbe {
    started: AtomicBool,
    stopped: AtomicBool,
    closed: AtomicBool,
    frames_delivered: AtomicU64,
    start_args: Mutex<Option<(u32, u32, u8)>>,
}

impl DeviceProbe {
    pub fn started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered.load(Ordering::Acquire)
    }

    /// `(rate, channel_mask, resolution)` of the last start command
    pub fn start_args(&self) -> Option<(u32, u32, u8)> {
        *self.start_args.lock()
    }
}

/// Recipe for a simulated acquisition unit
#[derive(Debug, Clone)]
pub struct SimulatedDeviceConfig {
    sensors: BTreeMap<u8, SensorDescriptor>,
    properties: DeviceProperties,
    battery: f32,
    dropped: BTreeSet<u64>,
    frame_limit: Option<u64>,
    paced: bool,
    stall: bool,
    fail_open: bool,
    probe: Arc<DeviceProbe>,
}

impl SimulatedDeviceConfig {
    /// Sensors keyed by port, paced in real time, no dropped frames
    pub fn new<I>(sensors: I) -> Self
    where
        I: IntoIterator<Item = (u8, SensorKind)>,
    {
        Self {
            sensors: sensors
                .into_iter()
                .map(|(port, kind)| (port, SensorDescriptor::new(kind)))
                .collect(),
            properties: DeviceProperties {
                uid: "00:07:80:0F:30:EC".to_string(),
                fw_version: 0x0302,
                hw_version: 0x0100,
            },
            battery: 100.0,
            dropped: BTreeSet::new(),
            frame_limit: None,
            paced: true,
            stall: false,
            fail_open: false,
            probe: Arc::new(DeviceProbe::default()),
        }
    }

    /// Counters generated but never delivered to the callback
    pub fn with_dropped_counters<I>(mut self, counters: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        self.dropped.extend(counters);
        self
    }

    /// Stop generating after `limit` counters; the loop idles until stopped
    pub fn with_frame_limit(mut self, limit: u64) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Deliver frames as fast as possible instead of at the configured rate
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Ignore the callback's stop request; only `stop()` ends the loop
    pub fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn with_battery(mut self, battery: f32) -> Self {
        self.battery = battery;
        self
    }

    pub fn probe(&self) -> Arc<DeviceProbe> {
        Arc::clone(&self.probe)
    }
}

/// In-process stand-in for a vendor acquisition unit
pub struct SimulatedDevice {
    config: SimulatedDeviceConfig,
    settings: Mutex<Option<(u32, u32, u8)>>,
    running: AtomicBool,
    closed: AtomicBool,
}

impl SimulatedDevice {
    pub fn new(config: SimulatedDeviceConfig) -> Self {
        Self {
            config,
            settings: Mutex::new(None),
            running: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    fn sample(counter: u64, rate: u32, channels: usize, resolution: u8) -> Vec<i32> {
        let mid = f64::from(1u32 << (resolution - 1));
        let t = counter as f64 / f64::from(rate);
        (0..channels)
            .map(|ch| {
                let freq = 1.0 + ch as f64;
                (mid + (mid - 1.0) * 0.5 * (2.0 * PI * freq * t).sin()) as i32
            })
            .collect()
    }

    fn counter_due(&self, started: Instant, rate: u32) -> u64 {
        let due = if self.config.paced {
            (started.elapsed().as_secs_f64() * f64::from(rate)) as u64
        } else {
            u64::MAX
        };
        self.config.frame_limit.map_or(due, |limit| due.min(limit))
    }
}

impl SensorDevice for SimulatedDevice {
    fn properties(&self) -> Result<DeviceProperties> {
        Ok(self.config.properties.clone())
    }

    fn battery(&self) -> Result<f32> {
        Ok(self.config.battery)
    }

    fn sensors(&self) -> Result<BTreeMap<u8, SensorDescriptor>> {
        Ok(self.config.sensors.clone())
    }

    fn start(&self, rate: u32, channel_mask: u32, resolution: u8) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(anyhow!("Cannot start a closed device"));
        }
        if rate == 0 || channel_mask == 0 {
            return Err(anyhow!("Invalid start parameters: rate {} mask {:#b}", rate, channel_mask));
        }

        *self.settings.lock() = Some((rate, channel_mask, resolution));
        *self.config.probe.start_args.lock() = Some((rate, channel_mask, resolution));
        self.running.store(true, Ordering::Release);
        self.config.probe.started.store(true, Ordering::Release);
        Ok(())
    }

    fn run(&self, mut on_frame: FrameCallback) -> Result<()> {
        let (rate, _mask, resolution) =
            (*self.settings.lock()).ok_or_else(|| anyhow!("Device not started"))?;
        let channels = self.config.sensors.len();
        let started = Instant::now();
        let mut counter = 0u64;

        while self.running.load(Ordering::Acquire) {
            let due = self.counter_due(started, rate);
            if counter >= due {
                thread::sleep(Duration::from_millis(1));
                continue;
            }

            while counter < due && self.running.load(Ordering::Acquire) {
                if !self.config.dropped.contains(&counter) {
                    let values = Self::sample(counter, rate, channels, resolution);
                    self.config.probe.frames_delivered.fetch_add(1, Ordering::AcqRel);
                    if !on_frame(counter, &values) && !self.config.stall {
                        return Ok(());
                    }
                }
                counter += 1;
            }
        }

        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        self.config.probe.stopped.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.running.store(false, Ordering::Release);
        self.closed.store(true, Ordering::Release);
        self.config.probe.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Driver serving simulated devices by address
#[derive(Debug, Clone, Default)]
pub struct SimulatedDriver {
    devices: Vec<(DeviceInfo, SimulatedDeviceConfig)>,
}

impl SimulatedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(
        mut self,
        address: impl Into<String>,
        kind: impl Into<String>,
        config: SimulatedDeviceConfig,
    ) -> Self {
        let info = DeviceInfo {
            address: address.into(),
            kind: kind.into(),
        };
        self.devices.push((info, config));
        self
    }
}

#[async_trait]
impl DeviceDriver for SimulatedDriver {
    fn driver_id(&self) -> &str {
        "simulated"
    }

    async fn discover(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.devices.iter().map(|(info, _)| info.clone()).collect())
    }

    fn open(&self, address: &str) -> Result<Box<dyn SensorDevice>> {
        let (_, config) = self
            .devices
            .iter()
            .find(|(info, _)| info.address == address)
            .ok_or_else(|| anyhow!("No device answering at {}", address))?;

        if config.fail_open {
            return Err(anyhow!("Handshake with {} failed", address));
        }

        Ok(Box::new(SimulatedDevice::new(config.clone())))
    }
}
