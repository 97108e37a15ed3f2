use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

use super::types::{DeviceInfo, DeviceProperties, SensorDescriptor};

/// Per-frame callback handed to the device's acquisition loop.
///
/// Receives the frame counter and one raw reading per active channel.
/// Returning `false` asks the device to leave the loop.
pub type FrameCallback = Box<dyn FnMut(u64, &[i32]) -> bool + Send + 'static>;

/// Entry point of a vendor SDK: discovery and connection
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Unique driver identifier
    fn driver_id(&self) -> &str;

    /// Discover reachable devices (async for bluetooth scans)
    async fn discover(&self) -> Result<Vec<DeviceInfo>>;

    /// Open a connection to the device at `address`
    fn open(&self, address: &str) -> Result<Box<dyn SensorDevice>>;
}

/// An opened acquisition device.
///
/// Methods take `&self` because the acquisition loop runs on its own thread
/// while the session issues `stop`/`close` from another.
pub trait SensorDevice: Send + Sync {
    fn properties(&self) -> Result<DeviceProperties>;

    /// Battery level in percent
    fn battery(&self) -> Result<f32>;

    /// Sensors keyed by hardware port
    fn sensors(&self) -> Result<BTreeMap<u8, SensorDescriptor>>;

    /// Arm acquisition at `rate` Hz for the ports set in `channel_mask`
    fn start(&self, rate: u32, channel_mask: u32, resolution: u8) -> Result<()>;

    /// Deliver frames to `on_frame` until it returns `false` or the device
    /// is stopped. Blocks the calling thread.
    fn run(&self, on_frame: FrameCallback) -> Result<()>;

    fn stop(&self) -> Result<()>;

    fn close(&self) -> Result<()>;
}
