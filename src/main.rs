use std::sync::Arc;
use std::time::{Duration, Instant};

use biostream::hal::mock::{SimulatedDeviceConfig, SimulatedDriver};
use biostream::hal::SensorKind;
use biostream::{Session, SessionConfig};
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let device = SimulatedDeviceConfig::new([
        (1, SensorKind::Ecg),
        (2, SensorKind::Eda),
        (3, SensorKind::Resp),
    ])
    .with_dropped_counters(1500..1510)
    .with_battery(82.0);
    let driver = Arc::new(SimulatedDriver::new().with_device(
        "00:07:80:0F:30:EC",
        "biosignalsplux",
        device,
    ));

    let config = match std::env::args().nth(1) {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default().with_rate(1000),
    };

    let mut session = Session::open(driver, config).await?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let drain_task = session.spawn_drain_task(tx, shutdown_rx)?;

    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
        for report in rx.try_iter() {
            if let Some(pair) = &report.batches {
                let first = pair.converted.row(0).unwrap_or_default();
                log::info!(
                    "Batch of {} sample(s) at {} Hz, first row {:?}",
                    pair.converted.len(),
                    pair.converted.meta.rate,
                    first
                );
            }
        }
    }

    let _ = shutdown_tx.send(());
    drain_task.await?;

    let report = session.stop().await;
    log::info!("Stopped (stalled: {})", report.stalled);
    log::info!("{:?}", session.metrics());

    Ok(())
}
