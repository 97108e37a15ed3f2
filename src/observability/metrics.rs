use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for the consumer side of a stream
#[derive(Debug, Default)]
pub struct StreamMetrics {
    frames_drained: AtomicU64,
    samples_missed: AtomicU64,
    drain_cycles: AtomicU64,
    batches_emitted: AtomicU64,
    total_drain_us: AtomicU64,
}

/// Point-in-time copy of [`StreamMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub frames_drained: u64,
    pub samples_missed: u64,
    pub drain_cycles: u64,
    pub batches_emitted: u64,
    pub avg_drain_us: u64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_drained(&self) -> u64 {
        self.frames_drained.load(Ordering::Relaxed)
    }

    pub fn samples_missed(&self) -> u64 {
        self.samples_missed.load(Ordering::Relaxed)
    }

    pub fn drain_cycles(&self) -> u64 {
        self.drain_cycles.load(Ordering::Relaxed)
    }

    pub fn batches_emitted(&self) -> u64 {
        self.batches_emitted.load(Ordering::Relaxed)
    }

    pub fn start_cycle(&self) -> Instant {
        Instant::now()
    }

    /// Record a finished drain cycle
    pub fn finish_cycle(&self, start: Instant, frames: usize, missed: u64, emitted: bool) {
        self.record_cycle_latency(start.elapsed());
        self.drain_cycles.fetch_add(1, Ordering::Relaxed);
        self.frames_drained.fetch_add(frames as u64, Ordering::Relaxed);
        self.samples_missed.fetch_add(missed, Ordering::Relaxed);
        if emitted {
            self.batches_emitted.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_cycle_latency(&self, elapsed: Duration) {
        self.total_drain_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn avg_drain_us(&self) -> u64 {
        let cycles = self.drain_cycles();
        if cycles == 0 {
            return 0;
        }
        self.total_drain_us.load(Ordering::Relaxed) / cycles
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_drained: self.frames_drained(),
            samples_missed: self.samples_missed(),
            drain_cycles: self.drain_cycles(),
            batches_emitted: self.batches_emitted(),
            avg_drain_us: self.avg_drain_us(),
        }
    }
}
