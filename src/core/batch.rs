use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hal::SensorKind;

/// Channel metadata attached to every batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Column index in the batch
    pub index: usize,

    /// Hardware port the sensor is plugged into
    pub port: u8,

    pub kind: SensorKind,

    /// Unit of the converted column, `None` when passed through raw
    pub unit: Option<String>,
}

/// Side-channel information for a batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchMeta {
    /// Acquisition rate in Hz
    pub rate: u32,
}

/// Emission unit of one drain cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// One timestamp per sample, ascending
    pub timestamps: Vec<DateTime<Utc>>,

    /// One column per channel, each `timestamps.len()` long
    pub columns: Vec<Vec<f64>>,

    pub channels: Vec<ChannelInfo>,

    pub meta: BatchMeta,
}

impl Batch {
    /// Number of samples (rows)
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, index: usize) -> Option<&[f64]> {
        self.columns.get(index).map(Vec::as_slice)
    }

    /// Values of one sample across all channels
    pub fn row(&self, sample: usize) -> Option<Vec<f64>> {
        if sample >= self.len() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[sample]).collect())
    }
}

/// Raw and converted views of the same drained frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPair {
    pub raw: Batch,
    pub converted: Batch,
}
