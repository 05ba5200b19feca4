//! Application traffic sent by the AP to each station.

use ofdma_stats_core::{
    DataRate, StationId, Time,
    config::RunConfig,
    defaults::{BULK_MAX_BYTES, BULK_SEND_SIZE},
};
use std::{fmt, time::Duration};

/// Port the steady rate sinks listen on.
pub const STEADY_RATE_PORT: u16 = 50_000;
/// Port the bulk transfer sinks listen on.
pub const BULK_TRANSFER_PORT: u16 = 50_001;

/// Steady rate clients wake up on this grid, so that the clients installed
/// on different stations start sending together.
const STEADY_RATE_WAKE_INTERVAL: Duration = Duration::from_millis(10);
const STEADY_RATE_START_OFFSET: Duration = Duration::from_millis(110);
const BULK_TRANSFER_START_OFFSET: Duration = Duration::from_millis(47);

/// The traffic client installed for one station.
///
/// Stations alternate between the two profiles: odd stations receive a
/// steady rate flow of small packets, even stations a bulk transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficProfile {
    /// constant bit rate flow of fixed size packets
    SteadyRate {
        rate: DataRate,
        packet_size: u32,
        port: u16,
    },
    /// sends as fast as the network allows until `max_bytes` were sent
    BulkTransfer {
        send_size: u32,
        max_bytes: u64,
        port: u16,
    },
}

impl TrafficProfile {
    /// the profile of `station`, selected by the parity of its index.
    ///
    /// ```
    /// # use ofdma_stats::TrafficProfile;
    /// # use ofdma_stats_core::{Config, StationId};
    /// let run = Config::default().resolve().unwrap();
    ///
    /// assert!(TrafficProfile::for_station(StationId::new(0), &run).is_bulk_transfer());
    /// assert!(!TrafficProfile::for_station(StationId::new(1), &run).is_bulk_transfer());
    /// ```
    pub fn for_station(station: StationId, run: &RunConfig) -> Self {
        if station.is_even() {
            Self::BulkTransfer {
                send_size: BULK_SEND_SIZE,
                max_bytes: BULK_MAX_BYTES,
                port: BULK_TRANSFER_PORT,
            }
        } else {
            Self::SteadyRate {
                rate: run.data_rate,
                packet_size: run.payload_size,
                port: STEADY_RATE_PORT,
            }
        }
    }

    pub fn is_bulk_transfer(&self) -> bool {
        matches!(self, Self::BulkTransfer { .. })
    }

    /// size of the packets the client hands to the transport
    pub fn packet_size(&self) -> u32 {
        match self {
            Self::SteadyRate { packet_size, .. } => *packet_size,
            Self::BulkTransfer { send_size, .. } => *send_size,
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::SteadyRate { port, .. } | Self::BulkTransfer { port, .. } => *port,
        }
    }

    /// delay between the association of the station and the installation
    /// of its client.
    ///
    /// Steady rate clients are installed on the next multiple of their wake
    /// interval after `now`, plus a fixed offset.
    pub fn install_delay(&self, now: Time) -> Duration {
        match self {
            Self::SteadyRate { .. } => {
                let interval = STEADY_RATE_WAKE_INTERVAL.as_nanos() as u64;
                let aligned = now.as_nanos().div_ceil(interval) * interval;
                Duration::from_nanos(aligned - now.as_nanos()) + STEADY_RATE_START_OFFSET
            }
            Self::BulkTransfer { .. } => BULK_TRANSFER_START_OFFSET,
        }
    }
}

impl fmt::Display for TrafficProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SteadyRate {
                rate, packet_size, ..
            } => write!(f, "steady rate {rate} ({packet_size} B packets)"),
            Self::BulkTransfer { max_bytes, .. } => write!(f, "bulk transfer ({max_bytes} B)"),
        }
    }
}
