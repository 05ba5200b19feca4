use std::time::Duration;

/// Default application payload size, in bytes.
///
/// Application packets smaller than the configured payload size are
/// control traffic (TCP acks, pings) and are not correlated for latency.
pub const DEFAULT_PAYLOAD_SIZE: u32 = 160;

/// Default duration of the measurement window.
pub const DEFAULT_SIMULATION_TIME: Duration = Duration::from_secs(2);

/// Default warm-up period between the start of the traffic and the
/// start of the statistics collection.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(1);

/// Default number of non-AP stations.
pub const DEFAULT_STATIONS: u16 = 10;

pub const DEFAULT_CHANNEL_WIDTH: u16 = 20;

pub const DEFAULT_GUARD_INTERVAL: u16 = 3_200;

pub const DEFAULT_MCS: u8 = 0;

/// Default maximum number of RUs allocated per DL MU PPDU.
pub const DEFAULT_MAX_RUS: u8 = 4;

pub const DEFAULT_DL_ACK_SEQUENCE: u8 = 1;

/// Duration of the reachability probe run against a freshly associated
/// station. The next station starts associating once it elapses.
///
/// ```
/// # use ofdma_stats_core::defaults::*;
/// assert_eq!(
///     DEFAULT_PING_DURATION.as_millis(),
///     125
/// );
/// ```
pub const DEFAULT_PING_DURATION: Duration = Duration::from_millis(125);

/// Interval between two reachability probes.
pub const PING_INTERVAL: Duration = Duration::from_millis(50);

/// Send size of the bulk transfer profile, in bytes.
pub const BULK_SEND_SIZE: u32 = 2_048;

/// Total amount of bytes a bulk transfer client sends before going quiet.
pub const BULK_MAX_BYTES: u64 = 10_240_000;

/// Surplus applied when deriving queue size, MSDU lifetime and data rate.
pub(crate) const SURPLUS: u64 = 2;

/// Over-provisioning applied to the PHY rate when deriving the default
/// per-station data rate.
pub(crate) const DATA_RATE_SURPLUS: f64 = 1.2;
