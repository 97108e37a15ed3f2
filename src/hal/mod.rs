pub mod channel_mapper;
pub mod mock;
pub mod traits;
pub mod types;

pub use channel_mapper::{channel_mask, mask_bit, max_rate, resolve_rate, Channel, ChannelMap, RATE_TABLE};
pub use traits::{DeviceDriver, FrameCallback, SensorDevice};
pub use types::{DeviceInfo, DeviceProperties, DeviceSummary, SensorDescriptor, SensorKind};
