//! Run configuration.
//!
//! A [`Config`] is what the user asks for. It may leave some parameters
//! unset (`0`), in which case [`Config::resolve`] derives them from the PHY
//! rate the way the measurement campaign sizes its queues. Every invalid
//! setting is reported before the run starts.

use crate::{
    DataRate, defaults,
    phy::{self, ChannelWidth, GuardInterval, HeMcs},
    running_stat::MinTracking,
};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid channel bandwidth {0} MHz (must be 20, 40, 80 or 160)")]
    InvalidChannelWidth(u16),
    #[error("Invalid guard interval {0}ns (must be 800, 1600 or 3200)")]
    InvalidGuardInterval(u16),
    #[error("Invalid HE MCS {0} (must be 0 to 11)")]
    InvalidMcs(u8),
    #[error("Invalid DL ack sequence type {0} (must be 1 to 3)")]
    InvalidAckSequence(u8),
    #[error("At least one non-AP station is required")]
    NoStations,
    #[error("The payload size must not be zero")]
    ZeroPayload,
    #[error("The measurement duration must not be zero")]
    ZeroSimulationTime,
    #[error("The maximum number of RUs per DL MU PPDU must not be zero")]
    ZeroMaxRus,
}

/// Acknowledgment sequence used after a DL MU PPDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckSequence {
    /// acknowledgments solicited one station at a time
    SuFormat = 1,
    /// a MU-BAR trigger frame follows the DL MU PPDU
    MuBar = 2,
    /// MU-BARs aggregated to the PSDUs of the DL MU PPDU
    AggregateMuBar = 3,
}

impl TryFrom<u8> for AckSequence {
    type Error = ConfigError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::SuFormat),
            2 => Ok(Self::MuBar),
            3 => Ok(Self::AggregateMuBar),
            other => Err(ConfigError::InvalidAckSequence(other)),
        }
    }
}

/// The user facing run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// application payload size, in bytes
    pub payload_size: u32,
    /// duration of the statistics collection window
    pub simulation_time: Duration,
    /// delay between the start of the traffic and the start of the
    /// statistics collection
    pub warmup: Duration,
    /// number of non-AP stations
    pub stations: u16,
    /// channel width in MHz
    pub channel_width: u16,
    /// guard interval in nanoseconds
    pub guard_interval: u16,
    pub mcs: u8,
    pub max_rus: u8,
    pub dl_ack_sequence: u8,
    pub enable_dl_ofdma: bool,
    pub enable_ul_ofdma: bool,
    /// size of the EDCA queue in packets, `0` to derive it
    pub mac_queue_size: u32,
    /// maximum MSDU lifetime, [`Duration::ZERO`] to derive it
    pub msdu_lifetime: Duration,
    /// per-station rate of the steady rate profile, `None` to derive it
    pub data_rate: Option<DataRate>,
    /// reachability verification window of every station
    pub ping_duration: Duration,
    pub seed: u64,
    /// keep `0.0` as the "no sample yet" marker of the minimums
    pub legacy_min_sentinel: bool,
}

/// A validated [`Config`] with every derived parameter filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub payload_size: u32,
    pub simulation_time: Duration,
    pub warmup: Duration,
    pub stations: u16,
    pub channel_width: ChannelWidth,
    pub guard_interval: GuardInterval,
    pub mcs: HeMcs,
    pub max_rus: u8,
    pub ack_sequence: AckSequence,
    pub enable_dl_ofdma: bool,
    pub enable_ul_ofdma: bool,
    /// PHY rate of a full-width, single stream HE PPDU, in bits per second
    pub phy_rate: u64,
    pub mac_queue_size: u32,
    pub msdu_lifetime: Duration,
    pub data_rate: DataRate,
    pub ping_duration: Duration,
    pub seed: u64,
    pub min_tracking: MinTracking,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            payload_size: defaults::DEFAULT_PAYLOAD_SIZE,
            simulation_time: defaults::DEFAULT_SIMULATION_TIME,
            warmup: defaults::DEFAULT_WARMUP,
            stations: defaults::DEFAULT_STATIONS,
            channel_width: defaults::DEFAULT_CHANNEL_WIDTH,
            guard_interval: defaults::DEFAULT_GUARD_INTERVAL,
            mcs: defaults::DEFAULT_MCS,
            max_rus: defaults::DEFAULT_MAX_RUS,
            dl_ack_sequence: defaults::DEFAULT_DL_ACK_SEQUENCE,
            enable_dl_ofdma: true,
            enable_ul_ofdma: false,
            mac_queue_size: 0,
            msdu_lifetime: Duration::ZERO,
            data_rate: None,
            ping_duration: defaults::DEFAULT_PING_DURATION,
            seed: 0,
            legacy_min_sentinel: false,
        }
    }
}

impl Config {
    /// report the first invalid setting, if any
    pub fn validate(&self) -> Result<(), ConfigError> {
        ChannelWidth::try_from(self.channel_width)?;
        GuardInterval::try_from(self.guard_interval)?;
        HeMcs::try_from(self.mcs)?;
        AckSequence::try_from(self.dl_ack_sequence)?;

        if self.stations == 0 {
            return Err(ConfigError::NoStations);
        }
        if self.payload_size == 0 {
            return Err(ConfigError::ZeroPayload);
        }
        if self.simulation_time.is_zero() {
            return Err(ConfigError::ZeroSimulationTime);
        }
        if self.max_rus == 0 {
            return Err(ConfigError::ZeroMaxRus);
        }

        Ok(())
    }

    /// validate the configuration and derive the unset parameters.
    ///
    /// ```
    /// # use ofdma_stats_core::Config;
    /// let run = Config::default().resolve().unwrap();
    /// assert_eq!(run.mac_queue_size, 620);
    /// assert_eq!(run.msdu_lifetime.as_millis(), 217);
    /// ```
    pub fn resolve(&self) -> Result<RunConfig, ConfigError> {
        self.validate()?;

        let channel_width = ChannelWidth::try_from(self.channel_width)?;
        let guard_interval = GuardInterval::try_from(self.guard_interval)?;
        let mcs = HeMcs::try_from(self.mcs)?;
        let ack_sequence = AckSequence::try_from(self.dl_ack_sequence)?;

        let phy_rate = phy::he_data_rate(mcs, channel_width, guard_interval, 1);
        let stations = u64::from(self.stations);
        let payload = u64::from(self.payload_size);

        // bytes sent at the PHY rate during the longest PPDU
        let ampdu_size =
            (phy_rate as f64 * phy::MAX_HE_SU_PPDU_DURATION.as_secs_f64() / 8.0) as u64;
        let msdus_per_ampdu = ampdu_size / payload;
        let derived_queue_size = msdus_per_ampdu * stations * defaults::SURPLUS;
        let queue_size = if self.mac_queue_size == 0 {
            u32::try_from(derived_queue_size).unwrap_or(u32::MAX)
        } else {
            self.mac_queue_size
        };

        // the lifetime must exceed the time the AP takes to drain its queue
        let msdu_lifetime = if self.msdu_lifetime.is_zero() {
            let drain_ms = derived_queue_size as f64 * payload as f64 * 8.0 * 1_000.0
                / phy_rate as f64
                * defaults::SURPLUS as f64;
            Duration::from_millis(drain_ms as u64)
        } else {
            self.msdu_lifetime
        };

        let data_rate = self.data_rate.unwrap_or_else(|| {
            let bps = phy_rate as f64 * defaults::DATA_RATE_SURPLUS / stations as f64
                * defaults::SURPLUS as f64;
            DataRate::from_bits_per_sec(bps.round() as u64)
        });

        let min_tracking = if self.legacy_min_sentinel {
            MinTracking::ZeroSentinel
        } else {
            MinTracking::Exact
        };

        Ok(RunConfig {
            payload_size: self.payload_size,
            simulation_time: self.simulation_time,
            warmup: self.warmup,
            stations: self.stations,
            channel_width,
            guard_interval,
            mcs,
            max_rus: self.max_rus,
            ack_sequence,
            enable_dl_ofdma: self.enable_dl_ofdma,
            enable_ul_ofdma: self.enable_ul_ofdma,
            phy_rate,
            mac_queue_size: queue_size,
            msdu_lifetime,
            data_rate,
            ping_duration: self.ping_duration,
            seed: self.seed,
            min_tracking,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_defaults() {
        let run = Config::default().resolve().unwrap();

        assert_eq!(run.phy_rate, 7_312_500);
        assert_eq!(run.channel_width.channel_number(), 36);
        // 5_012 bytes per A-MPDU, 31 MSDUs, 10 stations, surplus 2
        assert_eq!(run.mac_queue_size, 620);
        assert_eq!(run.msdu_lifetime, Duration::from_millis(217));
        // 7.3125 Mb/s * 1.2 / 10 * 2
        assert_eq!(run.data_rate.bits_per_sec(), 1_755_000);
        assert_eq!(run.min_tracking, MinTracking::Exact);
    }

    #[test]
    fn explicit_values_are_kept() {
        let config = Config {
            mac_queue_size: 100,
            msdu_lifetime: Duration::from_millis(50),
            data_rate: Some(DataRate::from_bits_per_sec(64_000)),
            legacy_min_sentinel: true,
            ..Config::default()
        };
        let run = config.resolve().unwrap();

        assert_eq!(run.mac_queue_size, 100);
        assert_eq!(run.msdu_lifetime, Duration::from_millis(50));
        assert_eq!(run.data_rate.bits_per_sec(), 64_000);
        assert_eq!(run.min_tracking, MinTracking::ZeroSentinel);
    }

    #[test]
    fn invalid_settings_fail_before_the_run() {
        let check = |config: Config, expected: ConfigError| {
            assert_eq!(config.resolve().unwrap_err(), expected);
        };

        check(
            Config {
                channel_width: 25,
                ..Config::default()
            },
            ConfigError::InvalidChannelWidth(25),
        );
        check(
            Config {
                dl_ack_sequence: 4,
                ..Config::default()
            },
            ConfigError::InvalidAckSequence(4),
        );
        check(
            Config {
                stations: 0,
                ..Config::default()
            },
            ConfigError::NoStations,
        );
        check(
            Config {
                simulation_time: Duration::ZERO,
                ..Config::default()
            },
            ConfigError::ZeroSimulationTime,
        );
    }
}
