use std::collections::BTreeMap;

use crate::conversion::{ConversionRegistry, Transfer};
use crate::core::ChannelInfo;
use crate::error::{SessionError, SessionResult};
use super::types::{SensorDescriptor, SensorKind};

/// Maximum rate in Hz indexed by active channel count
pub const RATE_TABLE: [u32; 9] = [0, 8000, 5000, 4000, 3000, 3000, 2000, 2000, 2000];

/// Maximum supported rate for `channel_count` active channels
pub fn max_rate(channel_count: usize) -> Option<u32> {
    RATE_TABLE
        .get(channel_count)
        .copied()
        .filter(|rate| *rate > 0)
}

/// Validate a requested rate, substituting the maximum when it is absent,
/// zero, or above what `channel_count` channels support.
pub fn resolve_rate(requested: Option<u32>, channel_count: usize) -> SessionResult<u32> {
    let max = max_rate(channel_count).ok_or_else(|| {
        SessionError::InvalidConfiguration(format!(
            "no supported rate for {} channel(s)",
            channel_count
        ))
    })?;

    match requested {
        Some(rate) if rate > 0 && rate <= max => Ok(rate),
        Some(rate) => {
            log::warn!("Invalid rate {} Hz for {} channel(s)", rate, channel_count);
            log::info!("Setting rate to {}", max);
            Ok(max)
        }
        None => {
            log::info!("Setting rate to {}", max);
            Ok(max)
        }
    }
}

/// Build the device channel mask from hardware port numbers.
///
/// The mask is as wide as the highest port. Port `p` sets bit `p - 1`;
/// port 0 wraps around to the highest bit.
pub fn channel_mask<I>(ports: I) -> SessionResult<u32>
where
    I: IntoIterator<Item = u8>,
{
    let ports: Vec<u8> = ports.into_iter().collect();
    let width = ports.iter().copied().max().unwrap_or(0) as u32;

    if width == 0 {
        return Err(SessionError::InvalidConfiguration(
            "no sensor ports to build a channel mask from".to_string(),
        ));
    }
    if width > u32::BITS {
        return Err(SessionError::InvalidConfiguration(format!(
            "port {} exceeds the {}-bit channel mask",
            width,
            u32::BITS
        )));
    }

    let mask = ports
        .iter()
        .fold(0u32, |mask, &port| mask | (1 << mask_bit(port, width)));

    Ok(mask)
}

/// Bit armed for `port` in a channel mask `width` bits wide
pub fn mask_bit(port: u8, width: u32) -> u32 {
    if port == 0 {
        width.saturating_sub(1)
    } else {
        port as u32 - 1
    }
}

/// One physical acquisition line
#[derive(Debug, Clone)]
pub struct Channel {
    /// Column position in emitted batches
    pub index: usize,
    pub port: u8,
    /// Channel mask bit; columns follow ascending bit order
    pub bit: u32,
    pub kind: SensorKind,
    pub max_rate: u32,
    pub transfer: Option<Transfer>,
}

impl Channel {
    pub fn info(&self) -> ChannelInfo {
        ChannelInfo {
            index: self.index,
            port: self.port,
            kind: self.kind,
            unit: self.transfer.map(|t| t.unit.to_string()),
        }
    }
}

/// Session-wide channel layout, built once before streaming starts
#[derive(Debug, Clone)]
pub struct ChannelMap {
    channels: Vec<Channel>,
    mask: u32,
    rate: u32,
    resolution: u8,
}

impl ChannelMap {
    /// Lay out channels in the order the device delivers them (ascending
    /// mask bit), pick a transfer function per sensor kind, and resolve the
    /// acquisition rate for the number of armed bits.
    ///
    /// Two ports arming the same bit is `InvalidConfiguration`: the device
    /// would deliver fewer values per frame than there are sensors.
    pub fn build(
        sensors: &BTreeMap<u8, SensorDescriptor>,
        registry: &ConversionRegistry,
        requested_rate: Option<u32>,
        resolution: u8,
    ) -> SessionResult<Self> {
        let mask = channel_mask(sensors.keys().copied())?;
        let width = sensors.keys().copied().max().map_or(0, u32::from);

        let mut slots: Vec<(u32, u8, SensorKind)> = sensors
            .iter()
            .map(|(&port, descriptor)| (mask_bit(port, width), port, descriptor.kind()))
            .collect();
        slots.sort_by_key(|&(bit, port, _)| (bit, port));

        if let Some(clash) = slots.windows(2).find(|w| w[0].0 == w[1].0) {
            let (bit, first, _) = clash[0];
            let second = clash[1].1;
            log::warn!("Ports {} and {} share channel mask bit {}", first, second, bit);
            return Err(SessionError::InvalidConfiguration(format!(
                "ports {} and {} both map to channel mask bit {}",
                first, second, bit
            )));
        }

        let armed = mask.count_ones() as usize;
        let rate = resolve_rate(requested_rate, armed)?;
        let max = max_rate(armed).unwrap_or(rate);

        let channels = slots
            .into_iter()
            .enumerate()
            .map(|(index, (bit, port, kind))| {
                let transfer = registry.lookup(kind);
                log::debug!(
                    "Channel {} (port {}, bit {}): {} -> {}",
                    index,
                    port,
                    bit,
                    kind,
                    transfer.map(|t| t.name).unwrap_or("raw")
                );
                Channel {
                    index,
                    port,
                    bit,
                    kind,
                    max_rate: max,
                    transfer,
                }
            })
            .collect();

        Ok(Self {
            channels,
            mask,
            rate,
            resolution,
        })
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn has_conversions(&self) -> bool {
        self.channels.iter().any(|c| c.transfer.is_some())
    }

    pub fn channel_info(&self) -> Vec<ChannelInfo> {
        self.channels.iter().map(Channel::info).collect()
    }

    /// Apply each channel's transfer function to its column. Columns
    /// without a transfer function, or past the mapped channels, are copied.
    pub fn convert(&self, columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
        columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                match self.channels.get(index).and_then(|c| c.transfer) {
                    Some(transfer) => column
                        .iter()
                        .map(|&raw| transfer.convert(raw, self.resolution))
                        .collect(),
                    None => column.clone(),
                }
            })
            .collect()
    }
}
