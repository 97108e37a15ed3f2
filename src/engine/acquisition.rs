use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::RawFrame;
use crate::hal::FrameCallback;
use super::buffer::SharedSampleBuffer;

/// Producer side of the handoff, run once per frame on the device's
/// acquisition thread. Only bookkeeping and an append happen here.
#[derive(Debug, Clone)]
pub struct AcquisitionCallback {
    buffer: Arc<SharedSampleBuffer>,
    stop: Arc<AtomicBool>,
}

impl AcquisitionCallback {
    pub fn new(buffer: Arc<SharedSampleBuffer>, stop: Arc<AtomicBool>) -> Self {
        Self { buffer, stop }
    }

    /// Append the frame and report whether acquisition should continue
    pub fn on_frame(&self, sequence_counter: u64, values: &[i32]) -> bool {
        self.buffer.append(RawFrame::new(sequence_counter, values));
        !self.stop.load(Ordering::Acquire)
    }

    pub fn into_callback(self) -> FrameCallback {
        Box::new(move |counter, values| self.on_frame(counter, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback() -> (AcquisitionCallback, Arc<SharedSampleBuffer>, Arc<AtomicBool>) {
        let buffer = Arc::new(SharedSampleBuffer::new());
        let stop = Arc::new(AtomicBool::new(false));
        let cb = AcquisitionCallback::new(Arc::clone(&buffer), Arc::clone(&stop));
        (cb, buffer, stop)
    }

    #[test]
    fn test_appends_and_continues() {
        let (cb, buffer, _stop) = callback();

        assert!(cb.on_frame(1, &[100, 200]));
        assert!(cb.on_frame(2, &[101, 201]));

        let drained = buffer.drain();
        assert_eq!(drained.frames.len(), 2);
        assert_eq!(drained.frames[1].values, vec![101, 201]);
    }

    #[test]
    fn test_stop_flag_is_seen_on_next_frame() {
        let (cb, buffer, stop) = callback();
        let mut boxed = cb.into_callback();

        assert!(boxed(1, &[0]));
        stop.store(true, Ordering::Release);
        assert!(!boxed(2, &[0]));

        // the frame that observed the flag is still kept
        assert_eq!(buffer.drain().frames.len(), 2);
    }
}
