use super::transfer::{self, Transfer};
use crate::hal::SensorKind;

/// Named transfer functions, checked in declaration order
#[derive(Debug, Clone)]
pub struct ConversionRegistry {
    transfers: Vec<Transfer>,
}

impl ConversionRegistry {
    /// Empty registry: every channel passes through unconverted
    pub fn new() -> Self {
        Self {
            transfers: Vec::new(),
        }
    }

    /// Registry with the built-in conversions, in alphabetical order
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Transfer::new("BVP", "r.i.", transfer::bvp));
        registry.register(Transfer::new("ECG", "mV", transfer::ecg));
        registry.register(Transfer::new("EDA", "uS", transfer::eda));
        registry.register(Transfer::new("EEG", "uV", transfer::eeg));
        registry.register(Transfer::new("EMG", "mV", transfer::emg));
        registry.register(Transfer::new("PZT", "%", transfer::pzt));
        registry
    }

    pub fn register(&mut self, transfer: Transfer) {
        self.transfers.push(transfer);
    }

    /// Select the conversion for a sensor kind.
    ///
    /// A transfer matches when the kind's name starts with the transfer's
    /// name, ignoring case. The last match in declaration order wins.
    pub fn lookup(&self, kind: SensorKind) -> Option<Transfer> {
        let kind_name = kind.name().to_uppercase();
        self.transfers
            .iter()
            .filter(|t| kind_name.starts_with(&t.name.to_uppercase()))
            .last()
            .copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.transfers.iter().map(|t| t.name).collect()
    }
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
