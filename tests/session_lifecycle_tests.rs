use biostream::hal::mock::{SimulatedDeviceConfig, SimulatedDriver};
use biostream::hal::SensorKind;
use biostream::{Session, SessionConfig, SessionError, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const ADDRESS: &str = "00:07:80:4D:2E:76";

fn three_channels() -> SimulatedDeviceConfig {
    SimulatedDeviceConfig::new([
        (1, SensorKind::Ecg),
        (2, SensorKind::Eda),
        (3, SensorKind::Resp),
    ])
}

fn driver_with(config: SimulatedDeviceConfig) -> Arc<SimulatedDriver> {
    Arc::new(
        SimulatedDriver::new()
            .with_device("/dev/ttyUSB0", "bitalino", SimulatedDeviceConfig::new([(1, SensorKind::Emg)]))
            .with_device(ADDRESS, "biosignalsplux", config),
    )
}

#[tokio::test]
async fn test_full_lifecycle_streams_batches() {
    let device = three_channels();
    let probe = device.probe();
    let mut session = Session::new(driver_with(device), SessionConfig::default().with_rate(1000));
    assert_eq!(session.state(), SessionState::Idle);

    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(session.address(), Some(ADDRESS));
    assert_eq!(session.summary().unwrap().firmware_version, "3.2");

    session.start().unwrap();
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(probe.start_args(), Some((1000, 0b111, 16)));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let report = session.drain();
    assert_eq!(report.missed, 0);

    let pair = report.batches.expect("frames after 100ms of streaming");
    assert!(pair.raw.len() > 10);
    assert_eq!(pair.raw.columns.len(), 3);
    assert_eq!(pair.raw.meta.rate, 1000);
    assert_eq!(pair.raw.timestamps, pair.converted.timestamps);
    assert!(pair.raw.timestamps.windows(2).all(|w| w[0] < w[1]));

    let stop = session.stop().await;
    assert!(!stop.stalled);
    assert!(stop.device_errors.is_empty());
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(probe.stopped());
    assert!(probe.closed());

    assert!(session.start().is_err());
}

#[tokio::test]
async fn test_counters_are_continuous_across_drains() {
    let mut session = Session::open(driver_with(three_channels()), SessionConfig::default())
        .await
        .unwrap();

    let mut timestamps = Vec::new();
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Some(pair) = session.drain().batches {
            timestamps.extend(pair.raw.timestamps);
        }
    }
    session.stop().await;
    if let Some(pair) = session.drain().batches {
        timestamps.extend(pair.raw.timestamps);
    }

    assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(session.metrics().samples_missed, 0);
    assert_eq!(session.metrics().frames_drained as usize, timestamps.len());
}

#[tokio::test]
async fn test_dropped_frames_are_reported() {
    let device = three_channels().with_dropped_counters([5, 6, 7]);
    let mut session = Session::open(driver_with(device), SessionConfig::default().with_rate(1000))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(60)).await;
    let report = session.drain();
    session.stop().await;

    assert_eq!(report.missed, 3);
    assert!(report.batches.is_some());
}

#[tokio::test]
async fn test_invalid_rate_uses_maximum() {
    let mut session = Session::open(driver_with(three_channels()), SessionConfig::default().with_rate(9000))
        .await
        .unwrap();

    assert_eq!(session.rate(), Some(4000));
    session.stop().await;
}

#[tokio::test]
async fn test_no_matching_device() {
    let config = SessionConfig {
        device_kind: "muscleban".to_string(),
        ..SessionConfig::default()
    };
    let result = Session::open(driver_with(three_channels()), config).await;

    assert!(matches!(result, Err(SessionError::DeviceNotFound { .. })));
}

#[tokio::test]
async fn test_unknown_address_fails_to_connect() {
    let config = SessionConfig::default().with_address("AA:BB:CC:DD:EE:FF");
    let result = Session::open(driver_with(three_channels()), config).await;

    assert!(matches!(result, Err(SessionError::ConnectionFailed { .. })));
}

#[tokio::test]
async fn test_handshake_failure() {
    let config = SessionConfig::default().with_address(ADDRESS);
    let result = Session::open(driver_with(three_channels().failing_open()), config).await;

    match result {
        Err(SessionError::ConnectionFailed { address, .. }) => assert_eq!(address, ADDRESS),
        other => panic!("expected ConnectionFailed, got {:?}", other.err()),
    }
}

#[tokio::test]
async fn test_blank_address_uses_discovery() {
    let config = SessionConfig::default().with_address("  ");
    let mut session = Session::open(driver_with(three_channels()), config).await.unwrap();

    assert_eq!(session.address(), Some(ADDRESS));
    session.stop().await;
}

#[tokio::test]
async fn test_too_many_channels_releases_device() {
    let device = SimulatedDeviceConfig::new((1..=9).map(|port| (port, SensorKind::Ecg)));
    let probe = device.probe();
    let result = Session::open(driver_with(device), SessionConfig::default()).await;

    assert!(matches!(result, Err(SessionError::InvalidConfiguration(_))));
    assert!(!probe.started());
    assert!(probe.closed());
}

#[tokio::test]
async fn test_port_zero_colliding_with_highest_port_is_rejected() {
    let device = SimulatedDeviceConfig::new([
        (0, SensorKind::Ecg),
        (1, SensorKind::Resp),
        (2, SensorKind::Eda),
    ]);
    let probe = device.probe();
    let result = Session::open(driver_with(device), SessionConfig::default()).await;

    assert!(matches!(result, Err(SessionError::InvalidConfiguration(_))));
    assert!(!probe.started());
    assert_eq!(probe.start_args(), None);
    assert!(probe.closed());
}

#[tokio::test]
async fn test_sparse_ports_stream_in_mask_bit_order() {
    let device = SimulatedDeviceConfig::new([(5, SensorKind::Eda), (2, SensorKind::Ecg)]);
    let probe = device.probe();
    let mut session = Session::open(driver_with(device), SessionConfig::default().with_rate(1000))
        .await
        .unwrap();
    assert_eq!(probe.start_args(), Some((1000, 0b10010, 16)));

    tokio::time::sleep(Duration::from_millis(50)).await;
    let pair = session.drain().batches.unwrap();
    session.stop().await;

    let layout: Vec<_> = pair.raw.channels.iter().map(|c| (c.port, c.kind)).collect();
    assert_eq!(layout, vec![(2, SensorKind::Ecg), (5, SensorKind::Eda)]);
    assert_eq!(pair.raw.columns.len(), 2);
    assert!(pair.raw.columns.iter().flatten().all(|v| !v.is_nan()));
}

#[tokio::test]
async fn test_teardown_from_connected_only_closes() {
    let device = three_channels();
    let probe = device.probe();
    let mut session = Session::new(driver_with(device), SessionConfig::default());
    session.connect().await.unwrap();

    let report = session.stop().await;
    assert!(!report.stalled);
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(!probe.stopped());
    assert!(probe.closed());
}

#[tokio::test]
async fn test_stalled_producer_does_not_block_teardown() {
    let device = three_channels().stalling();
    let probe = device.probe();
    let config = SessionConfig {
        grace_period_ms: 20,
        ..SessionConfig::default()
    };
    let mut session = Session::open(driver_with(device), config).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let report = session.stop().await;
    assert!(report.stalled);
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(probe.stopped());
    assert!(probe.closed());
}

#[tokio::test]
async fn test_periodic_drain_task() {
    let config = SessionConfig {
        drain_interval_ms: 10,
        ..SessionConfig::default().with_rate(1000)
    };
    let mut session = Session::open(driver_with(three_channels()), config).await.unwrap();

    let (tx, rx) = crossbeam_channel::unbounded();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let task = session.spawn_drain_task(tx, shutdown_rx).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();
    task.await.unwrap();
    session.stop().await;

    let reports: Vec<_> = rx.try_iter().collect();
    assert!(reports.len() >= 2);
    assert!(reports.iter().all(|r| r.batches.is_some() || r.missed > 0));

    let samples: usize = reports
        .iter()
        .filter_map(|r| r.batches.as_ref())
        .map(|p| p.raw.len())
        .sum();
    assert_eq!(samples as u64, session.metrics().frames_drained);
}
