use chrono::{DateTime, TimeDelta, Utc};
use crossbeam_channel::Sender;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::core::{Batch, BatchMeta, BatchPair, RawFrame};
use crate::hal::ChannelMap;
use crate::observability::StreamMetrics;
use super::buffer::{Drained, SharedSampleBuffer};

/// Outcome of one drain cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// Frames the hardware counter says were produced but never delivered
    pub missed: u64,

    /// Raw and converted batches, `None` when nothing was buffered
    pub batches: Option<BatchPair>,
}

impl DrainReport {
    /// Nothing arrived and nothing was lost
    pub fn is_quiet(&self) -> bool {
        self.missed == 0 && self.batches.is_none()
    }
}

/// Timestamp of the frame with `counter`, anchored at the first sample
pub fn sample_time(first_sample_time: DateTime<Utc>, counter: u64, rate: u32) -> DateTime<Utc> {
    let nanos = u128::from(counter) * 1_000_000_000 / u128::from(rate.max(1));
    let offset = TimeDelta::nanoseconds(i64::try_from(nanos).unwrap_or(i64::MAX));
    first_sample_time
        .checked_add_signed(offset)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Consumer side of the handoff: empties the shared buffer and turns the
/// frames into timestamped raw and converted batches.
#[derive(Debug, Clone)]
pub struct DrainCycle {
    buffer: Arc<SharedSampleBuffer>,
    channels: Arc<ChannelMap>,
    metrics: Arc<StreamMetrics>,
}

impl DrainCycle {
    pub fn new(
        buffer: Arc<SharedSampleBuffer>,
        channels: Arc<ChannelMap>,
        metrics: Arc<StreamMetrics>,
    ) -> Self {
        Self {
            buffer,
            channels,
            metrics,
        }
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    /// Run one cycle. Missed samples are logged and reported, never retried.
    pub fn run(&self) -> DrainReport {
        let start = self.metrics.start_cycle();
        let Drained {
            frames,
            missed,
            first_sample_time,
        } = self.buffer.drain();

        if missed > 0 {
            log::warn!("Missed {} sample(s)", missed);
        }

        let batches = match first_sample_time {
            Some(t0) if !frames.is_empty() => Some(self.build(&frames, t0)),
            _ => None,
        };

        log::debug!("Drained {} frame(s)", frames.len());
        self.metrics
            .finish_cycle(start, frames.len(), missed, batches.is_some());

        DrainReport { missed, batches }
    }

    fn build(&self, frames: &[RawFrame], first_sample_time: DateTime<Utc>) -> BatchPair {
        let rate = self.channels.rate();
        let width = if self.channels.is_empty() {
            frames[0].values.len()
        } else {
            self.channels.len()
        };

        let timestamps: Vec<_> = frames
            .iter()
            .map(|f| sample_time(first_sample_time, f.sequence_counter, rate))
            .collect();

        let raw_columns: Vec<Vec<f64>> = (0..width)
            .map(|ch| {
                frames
                    .iter()
                    .map(|f| f.values.get(ch).map_or(f64::NAN, |&v| f64::from(v)))
                    .collect()
            })
            .collect();

        let converted_columns = if self.channels.has_conversions() {
            self.channels.convert(&raw_columns)
        } else {
            raw_columns.clone()
        };

        let channels = self.channels.channel_info();
        let meta = BatchMeta { rate };

        BatchPair {
            raw: Batch {
                timestamps: timestamps.clone(),
                columns: raw_columns,
                channels: channels.clone(),
                meta,
            },
            converted: Batch {
                timestamps,
                columns: converted_columns,
                channels,
                meta,
            },
        }
    }

    /// Drain every `period` on the tokio runtime, forwarding reports that
    /// carry frames or missed samples. A final drain runs after `shutdown`
    /// fires so frames buffered before the signal still reach `tx`.
    pub fn spawn(
        self,
        period: Duration,
        tx: Sender<DrainReport>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    _ = ticker.tick() => {
                        let report = self.run();
                        if report.is_quiet() {
                            continue;
                        }
                        if tx.send(report).is_err() {
                            log::warn!("Drain receiver closed, stopping drain task");
                            return;
                        }
                    }
                }
            }

            let report = self.run();
            if !report.is_quiet() {
                let _ = tx.send(report);
            }
        })
    }
}
