use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::mem;

use crate::core::RawFrame;

/// Snapshot moved out of the buffer by one drain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drained {
    pub frames: Vec<RawFrame>,
    pub missed: u64,
    pub first_sample_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct BufferState {
    frames: Vec<RawFrame>,
    missed: u64,
    last_counter: Option<u64>,
    first_sample_time: Option<DateTime<Utc>>,
}

/// Frames accumulated between drains, shared by the acquisition thread
/// (appends) and the consumer (drains).
///
/// Growth is unbounded while the consumer stalls: frames are never dropped
/// here. The lock is only held for the push or the swap, never across
/// conversion or timestamp arithmetic.
#[derive(Debug, Default)]
pub struct SharedSampleBuffer {
    state: Mutex<BufferState>,
}

impl SharedSampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame, counting any counters skipped since the previous one.
    ///
    /// Counters are expected to increase; a counter that does not (including
    /// hardware wraparound) counts as no gap.
    pub fn append(&self, frame: RawFrame) {
        let mut state = self.state.lock();

        if state.first_sample_time.is_none() {
            state.first_sample_time = Some(Utc::now());
        }

        let gap = match state.last_counter {
            Some(last) => frame.sequence_counter.saturating_sub(last).saturating_sub(1),
            None => 0,
        };
        state.missed += gap;
        state.last_counter = Some(frame.sequence_counter);
        state.frames.push(frame);
    }

    /// Move out every buffered frame and the missed count, resetting both.
    /// The first-sample time and last counter survive until `reset`.
    pub fn drain(&self) -> Drained {
        let mut state = self.state.lock();
        Drained {
            frames: mem::take(&mut state.frames),
            missed: mem::take(&mut state.missed),
            first_sample_time: state.first_sample_time,
        }
    }

    /// Forget everything, including the first-sample time. Used when a
    /// session starts streaming.
    pub fn reset(&self) {
        *self.state.lock() = BufferState::default();
    }

    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first_sample_time(&self) -> Option<DateTime<Utc>> {
        self.state.lock().first_sample_time
    }

    pub fn last_counter(&self) -> Option<u64> {
        self.state.lock().last_counter
    }
}
