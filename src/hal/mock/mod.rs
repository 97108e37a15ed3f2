pub mod device;

pub use device::{DeviceProbe, SimulatedDevice, SimulatedDeviceConfig, SimulatedDriver};
