use serde::{Deserialize, Serialize};

/// One hardware sample tick across all active channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Hardware frame counter
    pub sequence_counter: u64,

    /// One raw reading per active channel, in channel order
    pub values: Vec<i32>,
}

impl RawFrame {
    pub fn new(sequence_counter: u64, values: &[i32]) -> Self {
        Self {
            sequence_counter,
            values: values.to_vec(),
        }
    }
}
