use crate::{
    Time,
    frame::{ForwardedFrame, MsduItem},
    id::{MacAddress, PacketUid, StationId},
};
use std::{fmt, time::Duration};

/// The named event streams a substrate emits.
///
/// Statistics collection subscribes to every stream at the end of the
/// warm-up and unsubscribes at the end of the measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventStream {
    ForwardDown,
    Dequeue,
    Expired,
    TxFailed,
    Txop,
    AppTx,
    AppRx,
}

/// An application packet, as seen at the MAC service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppPacket {
    pub uid: PacketUid,
    /// payload size in bytes
    pub size: u32,
}

/// A timestamped notification emitted by the substrate.
///
/// The timestamp is not part of the event: it is the virtual time at
/// which the event is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetEvent {
    /// PSDUs forwarded down to the PHY, on the AP or on a station
    ForwardDown(ForwardedFrame),
    /// an MSDU dequeued from the AP's EDCA queue
    Dequeue(MsduItem),
    /// an MSDU dropped because its lifetime expired
    Expired(MsduItem),
    /// an MPDU addressed to `receiver` was not acknowledged
    TxFailed { receiver: MacAddress },
    /// a TXOP of the AP ended
    Txop { start: Time, duration: Duration },
    /// a packet handed to the MAC for transmission
    AppTx(AppPacket),
    /// a packet delivered by the MAC of `station`
    AppRx {
        packet: AppPacket,
        station: StationId,
    },
}

impl EventStream {
    pub const ALL: [Self; 7] = [
        Self::ForwardDown,
        Self::Dequeue,
        Self::Expired,
        Self::TxFailed,
        Self::Txop,
        Self::AppTx,
        Self::AppRx,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::ForwardDown => "ForwardDown",
            Self::Dequeue => "Dequeue",
            Self::Expired => "Expired",
            Self::TxFailed => "TxErrHeader",
            Self::Txop => "TxopTrace",
            Self::AppTx => "MacTx",
            Self::AppRx => "MacRx",
        }
    }
}

impl fmt::Display for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl NetEvent {
    /// the stream this event is published on
    pub fn stream(&self) -> EventStream {
        match self {
            Self::ForwardDown(_) => EventStream::ForwardDown,
            Self::Dequeue(_) => EventStream::Dequeue,
            Self::Expired(_) => EventStream::Expired,
            Self::TxFailed { .. } => EventStream::TxFailed,
            Self::Txop { .. } => EventStream::Txop,
            Self::AppTx(_) => EventStream::AppTx,
            Self::AppRx { .. } => EventStream::AppRx,
        }
    }
}
