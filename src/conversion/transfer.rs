//! Transfer functions from raw ADC readings to physical units.
//!
//! Every function takes the raw reading and the ADC resolution in bits.

/// Working voltage of the acquisition unit
pub const VCC: f64 = 3.0;

/// EEG sensor gain
const EEG_GAIN: f64 = 40_000.0;

/// EDA sensor scale
const EDA_SCALE: f64 = 0.12;

pub type TransferFn = fn(f64, u8) -> f64;

/// A named conversion with the unit it produces
#[derive(Debug, Clone, Copy)]
pub struct Transfer {
    pub name: &'static str,
    pub unit: &'static str,
    pub apply: TransferFn,
}

impl Transfer {
    pub const fn new(name: &'static str, unit: &'static str, apply: TransferFn) -> Self {
        Self { name, unit, apply }
    }

    pub fn convert(&self, raw: f64, resolution: u8) -> f64 {
        (self.apply)(raw, resolution)
    }
}

fn full_scale(resolution: u8) -> f64 {
    2f64.powi(resolution as i32)
}

fn centered(raw: f64, resolution: u8) -> f64 {
    raw / full_scale(resolution) - 0.5
}

/// Volume pulse, relative intensity
pub fn bvp(raw: f64, resolution: u8) -> f64 {
    raw / full_scale(resolution)
}

/// Millivolt
pub fn ecg(raw: f64, resolution: u8) -> f64 {
    centered(raw, resolution) * VCC
}

/// Microsiemens
pub fn eda(raw: f64, resolution: u8) -> f64 {
    raw / full_scale(resolution) * VCC / EDA_SCALE
}

/// Microvolt. Scales by `1e6`, unlike the vendor helper's `1e-6`, so the
/// values match the unit.
pub fn eeg(raw: f64, resolution: u8) -> f64 {
    centered(raw, resolution) * VCC / EEG_GAIN * 1e6
}

/// Millivolt
pub fn emg(raw: f64, resolution: u8) -> f64 {
    centered(raw, resolution) * VCC
}

/// Displacement in percent of full scale
pub fn pzt(raw: f64, resolution: u8) -> f64 {
    centered(raw, resolution) * 100.0
}
