use std::{fmt, num::ParseIntError, str};
use thiserror::Error;

/// The identifier of a non-AP station in the run.
///
/// Stations are numbered from `0` in the order they were created. The
/// identifier is assigned at setup time and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(C)]
pub struct StationId(u16);

/// Association identifier handed out by the access point.
///
/// Multi-user transmissions (RU allocations, trigger frame user info
/// fields) address stations by their [`Aid`], not by their MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Aid(u16);

/// A 48 bits IEEE 802 MAC address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddress([u8; 6]);

/// Unique identifier of an application packet for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PacketUid(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MacAddressParseError {
    #[error("Expecting 6 colon separated octets, found {0}")]
    InvalidLength(usize),
    #[error("Invalid octet: {0}")]
    InvalidOctet(#[from] ParseIntError),
}

impl StationId {
    pub const ZERO: Self = StationId::new(0);

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// `true` for stations at an even position in the onboarding order
    #[inline(always)]
    pub const fn is_even(self) -> bool {
        self.0 % 2 == 0
    }

    #[must_use = "function does not modify the current value"]
    pub fn next(self) -> Self {
        Self::new(self.0 + 1)
    }
}

impl Aid {
    /// The AID used to key single-user PSDUs.
    pub const SU: Self = Aid(u16::MAX);

    pub const fn new(aid: u16) -> Self {
        Self(aid)
    }

    #[inline(always)]
    pub const fn into_u16(self) -> u16 {
        self.0
    }
}

impl MacAddress {
    pub const BROADCAST: Self = MacAddress([0xff; 6]);

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// allocate an address from a sequence number, the same way
    /// simulators hand out consecutive addresses
    /// (`1` becomes `00:00:00:00:00:01`).
    ///
    /// ```
    /// # use ofdma_stats_core::MacAddress;
    /// assert_eq!(MacAddress::from_sequence(258).to_string(), "00:00:00:00:01:02");
    /// ```
    pub fn from_sequence(sequence: u64) -> Self {
        let bytes = sequence.to_be_bytes();
        let mut octets = [0; 6];
        octets.copy_from_slice(&bytes[2..]);
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl PacketUid {
    pub const fn new(uid: u64) -> Self {
        Self(uid)
    }

    #[must_use = "function does not modify the current value"]
    pub fn next(self) -> Self {
        Self::new(self.0 + 1)
    }
}

impl str::FromStr for StationId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl str::FromStr for MacAddress {
    type Err = MacAddressParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 {
            return Err(MacAddressParseError::InvalidLength(parts.len()));
        }

        let mut octets = [0; 6];
        for (octet, part) in octets.iter_mut().zip(parts) {
            *octet = u8::from_str_radix(part, 16)?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for PacketUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MacAddress")
            .field(&format_args!("{self}"))
            .finish()
    }
}
