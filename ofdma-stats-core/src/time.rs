//! Virtual time.
//!
//! [`Time`] is a point on the simulated clock, counted in nanoseconds from
//! the beginning of the run. It never goes backward: events are delivered
//! in non decreasing [`Time`] order.
//!
//! [`Duration`] wraps [`std::time::Duration`] to give it a compact human
//! representation (`"1s500ms"`) that can be parsed back.

use logos::{Lexer, Logos};
use std::{
    fmt,
    num::ParseIntError,
    ops::{Add, AddAssign},
    str::FromStr,
    time,
};
use thiserror::Error;

/// A point on the virtual clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time(u64);

impl Time {
    /// The beginning of the simulation.
    pub const ZERO: Self = Self(0);

    #[inline(always)]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    #[inline(always)]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros * 1_000)
    }

    #[inline(always)]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    #[inline(always)]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1_000_000_000)
    }

    #[inline(always)]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// the elapsed virtual time since the beginning of the run
    #[inline(always)]
    pub const fn since_start(self) -> time::Duration {
        time::Duration::from_nanos(self.0)
    }

    /// time elapsed between `earlier` and `self`.
    ///
    /// Returns `None` if `earlier` is later than `self`.
    ///
    /// ```
    /// # use ofdma_stats_core::Time;
    /// # use std::time::Duration;
    /// let a = Time::from_millis(10);
    /// let b = Time::from_millis(15);
    /// assert_eq!(b.checked_duration_since(a), Some(Duration::from_millis(5)));
    /// assert_eq!(a.checked_duration_since(b), None);
    /// ```
    #[inline]
    pub fn checked_duration_since(self, earlier: Time) -> Option<time::Duration> {
        self.0.checked_sub(earlier.0).map(time::Duration::from_nanos)
    }

    /// time elapsed between `earlier` and `self`, or zero if `earlier`
    /// is later than `self`.
    #[inline]
    pub fn saturating_duration_since(self, earlier: Time) -> time::Duration {
        self.checked_duration_since(earlier).unwrap_or_default()
    }
}

impl Add<time::Duration> for Time {
    type Output = Self;

    fn add(self, rhs: time::Duration) -> Self::Output {
        let nanos = u64::try_from(rhs.as_nanos()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(nanos))
    }
}

impl AddAssign<time::Duration> for Time {
    fn add_assign(&mut self, rhs: time::Duration) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Duration::new(self.since_start()).fmt(f)
    }
}

/// a [`std::time::Duration`] with a compact human readable form.
///
/// ```
/// # use ofdma_stats_core::time::Duration;
/// let duration: Duration = "1s 500ms".parse().unwrap();
/// assert_eq!(duration.to_string(), "1s500ms");
/// assert_eq!(duration.into_duration().as_millis(), 1_500);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(time::Duration);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("Failed to parse `{input}'")]
    InvalidToken { input: String },
    #[error("Expecting duration to start with a number, cannot parse `{input}'")]
    MissingNumber { input: String },
    #[error("Expecting a unit after the number, cannot parse `{input}'")]
    MissingUnit { input: String },
    #[error("Empty duration")]
    Empty,
    #[error("Invalid number: {0}")]
    InvalidNumber(#[from] ParseIntError),
}

impl Duration {
    pub const fn new(dur: time::Duration) -> Self {
        Self(dur)
    }

    #[inline]
    pub fn into_duration(self) -> time::Duration {
        self.0
    }
}

impl From<time::Duration> for Duration {
    fn from(value: time::Duration) -> Self {
        Self(value)
    }
}

impl From<Duration> for time::Duration {
    fn from(value: Duration) -> Self {
        value.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut nanos = self.0.as_nanos();
        if nanos == 0 {
            return f.write_str("0ns");
        }

        const UNITS: [(u128, &str); 5] = [
            (60_000_000_000, "m"),
            (1_000_000_000, "s"),
            (1_000_000, "ms"),
            (1_000, "µs"),
            (1, "ns"),
        ];

        for (scale, unit) in UNITS {
            let value = nanos / scale;
            if value > 0 {
                write!(f, "{value}{unit}")?;
                nanos %= scale;
            }
        }
        Ok(())
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lex = Lexer::<'_, Token>::new(s);

        let mut total = time::Duration::ZERO;
        let mut parsed_any = false;

        while let Some(next) = lex.next() {
            let token = next.map_err(|()| DurationParseError::InvalidToken {
                input: s.to_owned(),
            })?;

            if token != Token::Value {
                return Err(DurationParseError::MissingNumber {
                    input: s.to_owned(),
                });
            }
            let number: u64 = lex.slice().parse()?;

            let Some(Ok(measure)) = lex.next() else {
                return Err(DurationParseError::MissingUnit {
                    input: s.to_owned(),
                });
            };
            total += match measure {
                Token::NanoSeconds => time::Duration::from_nanos(number),
                Token::MicroSeconds => time::Duration::from_micros(number),
                Token::MilliSeconds => time::Duration::from_millis(number),
                Token::Seconds => time::Duration::from_secs(number),
                Token::Minutes => time::Duration::from_secs(number * 60),
                Token::Value => {
                    return Err(DurationParseError::MissingUnit {
                        input: s.to_owned(),
                    });
                }
            };
            parsed_any = true;
        }

        if parsed_any {
            Ok(Self(total))
        } else {
            Err(DurationParseError::Empty)
        }
    }
}

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \t\n\f]+")] // Ignore this regex pattern between tokens
enum Token {
    #[token("ns")]
    NanoSeconds,
    #[regex("us|μs|µs")]
    MicroSeconds,
    #[token("ms")]
    MilliSeconds,
    #[token("s")]
    Seconds,
    #[token("m")]
    Minutes,

    #[regex("[0-9]+")]
    Value,
}
