use biostream::conversion::{ConversionRegistry, Transfer};
use biostream::hal::mock::{SimulatedDeviceConfig, SimulatedDriver};
use biostream::hal::{ChannelMap, SensorDescriptor, SensorKind};
use biostream::{Session, SessionConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn halve(raw: f64, _resolution: u8) -> f64 {
    raw / 2.0
}

fn negate(raw: f64, _resolution: u8) -> f64 {
    -raw
}

#[test]
fn test_prefix_covers_sensor_variants() {
    let mut registry = ConversionRegistry::new();
    registry.register(Transfer::new("sync", "V", halve));

    for kind in [SensorKind::Sync, SensorKind::SyncAdap, SensorKind::SyncLed, SensorKind::SyncSw] {
        assert_eq!(registry.lookup(kind).map(|t| t.name), Some("sync"), "{}", kind);
    }
    assert!(registry.lookup(SensorKind::Usb).is_none());
}

#[test]
fn test_later_registration_overrides() {
    let mut registry = ConversionRegistry::standard();
    registry.register(Transfer::new("E", "raw", negate));

    for kind in [SensorKind::Ecg, SensorKind::Eda, SensorKind::Emg, SensorKind::Eog] {
        let transfer = registry.lookup(kind).unwrap();
        assert_eq!(transfer.name, "E");
        assert_eq!(transfer.convert(4.0, 16), -4.0);
    }
    assert_eq!(registry.lookup(SensorKind::Bvp).unwrap().name, "BVP");
}

#[test]
fn test_channel_map_with_empty_registry_passes_through() {
    let sensors: BTreeMap<u8, SensorDescriptor> = [(1, SensorKind::Ecg), (2, SensorKind::Eeg)]
        .into_iter()
        .map(|(port, kind)| (port, SensorDescriptor::new(kind)))
        .collect();
    let map = ChannelMap::build(&sensors, &ConversionRegistry::new(), Some(1000), 16).unwrap();

    assert!(!map.has_conversions());
    let columns = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
    assert_eq!(map.convert(&columns), columns);
}

#[tokio::test]
async fn test_session_uses_custom_registry() {
    let driver = Arc::new(SimulatedDriver::new().with_device(
        "sim-0",
        "biosignalsplux",
        SimulatedDeviceConfig::new([(1, SensorKind::Resp), (2, SensorKind::Ecg)]),
    ));

    let mut registry = ConversionRegistry::new();
    registry.register(Transfer::new("RESP", "half", halve));

    let mut session = Session::new(driver, SessionConfig::default().with_rate(1000))
        .with_registry(registry);
    session.connect().await.unwrap();
    session.start().unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    let pair = session.drain().batches.unwrap();
    session.stop().await;

    let units: Vec<_> = pair.converted.channels.iter().map(|c| c.unit.clone()).collect();
    assert_eq!(units, vec![Some("half".to_string()), None]);

    let raw = pair.raw.column(0).unwrap();
    let converted = pair.converted.column(0).unwrap();
    for (r, c) in raw.iter().zip(converted) {
        assert_eq!(*c, r / 2.0);
    }
    assert_eq!(pair.raw.column(1), pair.converted.column(1));
}
