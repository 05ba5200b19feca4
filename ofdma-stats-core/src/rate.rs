use logos::{Lexer, Logos};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;

/// An application data rate, in bits per second.
///
/// Units are decimal (`1kbps` is `1_000` bits per second), the way link
/// and application rates are quoted for Wi-Fi.
///
/// ```
/// # use ofdma_stats_core::DataRate;
/// let rate: DataRate = "1500kbps".parse().unwrap();
/// assert_eq!(rate.bits_per_sec(), 1_500_000);
/// assert_eq!(rate.to_string(), "1500kbps");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DataRate(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataRateParseError {
    #[error("Expecting to parse a number")]
    MissingNumber,
    #[error("Expecting to parse a unit (bps, kbps, mbps, gbps)")]
    MissingUnit,
    #[error("Not expecting any other tokens to parse a data rate")]
    TrailingTokens,
    #[error("Invalid number `{0}'")]
    InvalidNumber(String),
}

impl DataRate {
    pub const fn from_bits_per_sec(bps: u64) -> Self {
        Self(bps)
    }

    pub const fn bits_per_sec(self) -> u64 {
        self.0
    }

    /// time needed to emit `bytes` at this rate.
    ///
    /// A zero rate never emits anything and returns [`Duration::MAX`].
    pub fn transmission_time(self, bytes: u32) -> Duration {
        if self.0 == 0 {
            return Duration::MAX;
        }
        let nanos = u128::from(bytes) * 8 * 1_000_000_000 / u128::from(self.0);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

const K: u64 = 1_000;
const M: u64 = 1_000_000;
const G: u64 = 1_000_000_000;

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v >= G && v % G == 0 {
            write!(f, "{}gbps", v / G)
        } else if v >= M && v % M == 0 {
            write!(f, "{}mbps", v / M)
        } else if v >= K && v % K == 0 {
            write!(f, "{}kbps", v / K)
        } else {
            write!(f, "{v}bps")
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum DataRateToken {
    #[token("bps")]
    Bps,
    #[token("kbps")]
    Kbps,
    #[token("mbps")]
    Mbps,
    #[token("gbps")]
    Gbps,

    #[regex("[0-9]+(\\.[0-9]+)?")]
    Value,
}

impl FromStr for DataRate {
    type Err = DataRateParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, DataRateToken>::new(s);

        let Some(Ok(DataRateToken::Value)) = lex.next() else {
            return Err(DataRateParseError::MissingNumber);
        };
        let number: f64 = lex
            .slice()
            .parse()
            .map_err(|_| DataRateParseError::InvalidNumber(lex.slice().to_owned()))?;
        let Some(Ok(token)) = lex.next() else {
            return Err(DataRateParseError::MissingUnit);
        };
        let scale = match token {
            DataRateToken::Bps => 1,
            DataRateToken::Kbps => K,
            DataRateToken::Mbps => M,
            DataRateToken::Gbps => G,
            DataRateToken::Value => return Err(DataRateParseError::MissingUnit),
        };

        if lex.next().is_some() {
            return Err(DataRateParseError::TrailingTokens);
        }

        Ok(Self((number * scale as f64).round() as u64))
    }
}
