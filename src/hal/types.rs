use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor classes reported by the hardware, in class-id order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Unknown,
    Emg,
    Ecg,
    Lux,
    Eda,
    Bvp,
    Resp,
    Xyz,
    Sync,
    Eeg,
    SyncAdap,
    SyncLed,
    SyncSw,
    Usb,
    Force,
    Temp,
    VProbe,
    Breakout,
    SpO2,
    Goni,
    Act,
    Eog,
    Egg,
}

impl SensorKind {
    pub const ALL: [SensorKind; 23] = [
        SensorKind::Unknown,
        SensorKind::Emg,
        SensorKind::Ecg,
        SensorKind::Lux,
        SensorKind::Eda,
        SensorKind::Bvp,
        SensorKind::Resp,
        SensorKind::Xyz,
        SensorKind::Sync,
        SensorKind::Eeg,
        SensorKind::SyncAdap,
        SensorKind::SyncLed,
        SensorKind::SyncSw,
        SensorKind::Usb,
        SensorKind::Force,
        SensorKind::Temp,
        SensorKind::VProbe,
        SensorKind::Breakout,
        SensorKind::SpO2,
        SensorKind::Goni,
        SensorKind::Act,
        SensorKind::Eog,
        SensorKind::Egg,
    ];

    /// Map a hardware class id; ids past the table are `Unknown`
    pub fn from_class(class: u8) -> Self {
        Self::ALL
            .get(class as usize)
            .copied()
            .unwrap_or(SensorKind::Unknown)
    }

    /// Label as reported by the vendor tooling
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Emg => "EMG",
            Self::Ecg => "ECG",
            Self::Lux => "LUX",
            Self::Eda => "EDA",
            Self::Bvp => "BVP",
            Self::Resp => "RESP",
            Self::Xyz => "XYZ",
            Self::Sync => "SYNC",
            Self::Eeg => "EEG",
            Self::SyncAdap => "SYNC_ADAP",
            Self::SyncLed => "SYNC_LED",
            Self::SyncSw => "SYNC_SW",
            Self::Usb => "USB",
            Self::Force => "FORCE",
            Self::Temp => "TEMP",
            Self::VProbe => "VPROBE",
            Self::Breakout => "BREAKOUT",
            Self::SpO2 => "SpO2",
            Self::Goni => "GONI",
            Self::Act => "ACT",
            Self::Eog => "EOG",
            Self::Egg => "EGG",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sensor attached to one hardware port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    /// Raw class id as reported by the device
    pub class: u8,
}

impl SensorDescriptor {
    pub fn new(kind: SensorKind) -> Self {
        Self {
            class: kind as u8,
        }
    }

    pub fn kind(&self) -> SensorKind {
        SensorKind::from_class(self.class)
    }
}

/// Device discovery information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub address: String,
    pub kind: String,
}

/// Raw device properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProperties {
    pub uid: String,
    pub fw_version: u16,
    pub hw_version: u16,
}

/// Human-readable device information logged on connect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub name: String,
    pub firmware_version: String,
    pub hardware_version: String,
    pub battery_level: String,
}

impl DeviceSummary {
    pub fn new(properties: &DeviceProperties, battery: f32) -> Self {
        Self {
            name: properties.uid.clone(),
            firmware_version: split_version(properties.fw_version),
            hardware_version: split_version(properties.hw_version),
            battery_level: format!("{}%", battery),
        }
    }
}

fn split_version(version: u16) -> String {
    let [major, minor] = version.to_be_bytes();
    format!("{}.{}", major, minor)
}
