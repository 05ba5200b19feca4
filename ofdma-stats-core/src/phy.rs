//! HE (802.11ax) PHY arithmetic needed to derive run parameters and to
//! convert trigger frame fields into durations.
//!
//! This is not a PHY model. It only carries the handful of closed form
//! relations the statistics need.

use crate::config::ConfigError;
use std::time::Duration;

/// Maximum duration of an HE SU PPDU (aPPDUMaxTime).
pub const MAX_HE_SU_PPDU_DURATION: Duration = Duration::from_micros(5_484);

/// Duration of an HE OFDM symbol, excluding the guard interval.
const HE_SYMBOL_DURATION_NS: u64 = 12_800;

/// L-STF + L-LTF + L-SIG
const LEGACY_PREAMBLE: Duration = Duration::from_micros(20);

/// the `m` term of the L-SIG LENGTH computation for HE TB PPDUs
const HE_TB_LENGTH_M: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelWidth {
    Mhz20,
    Mhz40,
    Mhz80,
    Mhz160,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GuardInterval {
    Ns800,
    Ns1600,
    Ns3200,
}

/// HE modulation and coding scheme, `0..=11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeMcs(u8);

impl ChannelWidth {
    pub const fn mhz(self) -> u16 {
        match self {
            Self::Mhz20 => 20,
            Self::Mhz40 => 40,
            Self::Mhz80 => 80,
            Self::Mhz160 => 160,
        }
    }

    /// the 5 GHz channel number the BSS operates on for this width
    pub const fn channel_number(self) -> u8 {
        match self {
            Self::Mhz20 => 36,
            Self::Mhz40 => 38,
            Self::Mhz80 => 42,
            Self::Mhz160 => 50,
        }
    }

    /// number of data subcarriers of a full-width HE PPDU
    const fn data_subcarriers(self) -> u64 {
        match self {
            Self::Mhz20 => 234,
            Self::Mhz40 => 468,
            Self::Mhz80 => 980,
            Self::Mhz160 => 1_960,
        }
    }
}

impl TryFrom<u16> for ChannelWidth {
    type Error = ConfigError;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            20 => Ok(Self::Mhz20),
            40 => Ok(Self::Mhz40),
            80 => Ok(Self::Mhz80),
            160 => Ok(Self::Mhz160),
            other => Err(ConfigError::InvalidChannelWidth(other)),
        }
    }
}

impl GuardInterval {
    pub const fn nanos(self) -> u16 {
        match self {
            Self::Ns800 => 800,
            Self::Ns1600 => 1_600,
            Self::Ns3200 => 3_200,
        }
    }
}

impl TryFrom<u16> for GuardInterval {
    type Error = ConfigError;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            800 => Ok(Self::Ns800),
            1_600 => Ok(Self::Ns1600),
            3_200 => Ok(Self::Ns3200),
            other => Err(ConfigError::InvalidGuardInterval(other)),
        }
    }
}

impl HeMcs {
    pub const fn index(self) -> u8 {
        self.0
    }

    /// (coded bits per subcarrier, coding rate numerator, coding rate denominator)
    const fn modulation(self) -> (u64, u64, u64) {
        match self.0 {
            0 => (1, 1, 2),
            1 => (2, 1, 2),
            2 => (2, 3, 4),
            3 => (4, 1, 2),
            4 => (4, 3, 4),
            5 => (6, 2, 3),
            6 => (6, 3, 4),
            7 => (6, 5, 6),
            8 => (8, 3, 4),
            9 => (8, 5, 6),
            10 => (10, 3, 4),
            _ => (10, 5, 6),
        }
    }
}

impl TryFrom<u8> for HeMcs {
    type Error = ConfigError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 11 {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidMcs(value))
        }
    }
}

/// HE data rate in bits per second of a full-width PPDU.
///
/// ```
/// # use ofdma_stats_core::phy::*;
/// let rate = he_data_rate(
///     HeMcs::try_from(0).unwrap(),
///     ChannelWidth::Mhz20,
///     GuardInterval::Ns3200,
///     1,
/// );
/// assert_eq!(rate, 7_312_500);
/// ```
pub fn he_data_rate(
    mcs: HeMcs,
    width: ChannelWidth,
    guard_interval: GuardInterval,
    spatial_streams: u8,
) -> u64 {
    let (bits, num, den) = mcs.modulation();
    let symbol_ns = HE_SYMBOL_DURATION_NS + u64::from(guard_interval.nanos());

    width.data_subcarriers() * bits * num * u64::from(spatial_streams) * 1_000_000_000
        / (den * symbol_ns)
}

/// Convert the UL Length subfield of a trigger frame (the L-SIG LENGTH the
/// responding stations must use) into the duration of the solicited HE TB
/// PPDU.
///
/// ```
/// # use ofdma_stats_core::phy::he_tb_duration_from_ul_length;
/// # use std::time::Duration;
/// // ceil((1_000 + 3 + 2) / 3) * 4µs + 20µs
/// assert_eq!(he_tb_duration_from_ul_length(1_000), Duration::from_micros(1_360));
/// ```
pub fn he_tb_duration_from_ul_length(ul_length: u16) -> Duration {
    let symbols = (u64::from(ul_length) + 3 + HE_TB_LENGTH_M).div_ceil(3);
    Duration::from_micros(symbols * 4) + LEGACY_PREAMBLE
}
