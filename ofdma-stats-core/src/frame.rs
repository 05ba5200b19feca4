//! What the statistics see of a transmission handed down to the PHY.

use crate::{
    Time,
    id::{Aid, MacAddress, PacketUid},
    phy,
};
use std::{collections::BTreeMap, time::Duration};

/// PPDU format of a transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preamble {
    NonHt,
    HeSu,
    HeExtSu,
    /// downlink multi-user PPDU (DL OFDMA)
    HeMu,
    /// trigger based PPDU, sent by stations in response to a trigger frame
    HeTb,
}

/// The transmission parameters of a PPDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxVector {
    pub preamble: Preamble,
    /// stations allocated a resource unit, in allocation order. Empty for
    /// single user PPDUs.
    pub ru_allocation: Vec<Aid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// solicits HE TB PPDUs carrying uplink data
    Basic,
    /// solicits block acks
    MuBar,
    MuRts,
    /// solicits buffer status reports
    Bsrp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerFrame {
    pub kind: TriggerKind,
    /// the UL Length subfield: L-SIG LENGTH of the solicited HE TB PPDUs
    pub ul_length: u16,
    /// one user info field per addressed station
    pub user_info: Vec<Aid>,
}

/// The kind of the first MPDU of a PSDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    QosData,
    Trigger(TriggerFrame),
    /// management and other control frames
    Other,
}

/// A PSDU: the aggregate sent to one receiver in a PPDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Psdu {
    /// `Addr1`
    pub receiver: MacAddress,
    /// `Addr2`
    pub transmitter: MacAddress,
    /// size in bytes
    pub size: u32,
    pub kind: FrameKind,
}

/// The PSDUs of a PPDU, keyed by the AID of their station.
///
/// Single user PPDUs hold one PSDU keyed by [`Aid::SU`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PsduMap(BTreeMap<Aid, Psdu>);

/// A PPDU forwarded down to the PHY, as reported by the substrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedFrame {
    pub psdus: PsduMap,
    pub tx_vector: TxVector,
    /// on-air duration of the PPDU, as computed by the substrate PHY
    pub tx_duration: Duration,
    /// address of the access point of the BSS
    pub bssid: MacAddress,
}

/// An MSDU leaving (or expiring in) the AP's EDCA queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsduItem {
    pub receiver: MacAddress,
    pub uid: PacketUid,
    pub size: u32,
    /// when the MSDU was enqueued
    pub enqueued_at: Time,
}

impl Preamble {
    #[inline]
    pub fn is_dl_multi_user(self) -> bool {
        matches!(self, Self::HeMu)
    }

    #[inline]
    pub fn is_trigger_based(self) -> bool {
        matches!(self, Self::HeTb)
    }
}

impl TxVector {
    pub fn single_user(preamble: Preamble) -> Self {
        Self {
            preamble,
            ru_allocation: Vec::new(),
        }
    }

    pub fn dl_multi_user(ru_allocation: Vec<Aid>) -> Self {
        Self {
            preamble: Preamble::HeMu,
            ru_allocation,
        }
    }

    /// number of resource units allocated in the PPDU
    #[inline]
    pub fn ru_count(&self) -> usize {
        self.ru_allocation.len()
    }
}

impl TriggerFrame {
    pub fn basic(ul_length: u16, user_info: Vec<Aid>) -> Self {
        Self {
            kind: TriggerKind::Basic,
            ul_length,
            user_info,
        }
    }

    #[inline]
    pub fn is_basic(&self) -> bool {
        self.kind == TriggerKind::Basic
    }

    /// the uplink duration granted to each addressed station.
    ///
    /// Every addressed station is told the same UL Length, hence is
    /// granted the same duration.
    pub fn granted_duration(&self) -> Duration {
        phy::he_tb_duration_from_ul_length(self.ul_length)
    }
}

impl Psdu {
    pub fn qos_data(transmitter: MacAddress, receiver: MacAddress, size: u32) -> Self {
        Self {
            receiver,
            transmitter,
            size,
            kind: FrameKind::QosData,
        }
    }

    pub fn trigger(transmitter: MacAddress, trigger: TriggerFrame) -> Self {
        Self {
            receiver: MacAddress::BROADCAST,
            transmitter,
            size: 0,
            kind: FrameKind::Trigger(trigger),
        }
    }

    #[inline]
    pub fn is_qos_data(&self) -> bool {
        matches!(self.kind, FrameKind::QosData)
    }

    pub fn as_trigger(&self) -> Option<&TriggerFrame> {
        match &self.kind {
            FrameKind::Trigger(trigger) => Some(trigger),
            _ => None,
        }
    }
}

impl PsduMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single_user(psdu: Psdu) -> Self {
        let mut map = Self::new();
        map.insert(Aid::SU, psdu);
        map
    }

    pub fn insert(&mut self, aid: Aid, psdu: Psdu) -> Option<Psdu> {
        self.0.insert(aid, psdu)
    }

    pub fn get(&self, aid: &Aid) -> Option<&Psdu> {
        self.0.get(aid)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// the PSDU with the lowest AID
    pub fn first(&self) -> Option<&Psdu> {
        self.0.values().next()
    }

    /// the only PSDU of the map, if there is exactly one
    pub fn single(&self) -> Option<&Psdu> {
        if self.0.len() == 1 { self.first() } else { None }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Aid, &Psdu)> {
        self.0.iter()
    }
}

impl FromIterator<(Aid, Psdu)> for PsduMap {
    fn from_iter<I: IntoIterator<Item = (Aid, Psdu)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_psdu_lookup() {
        let ap = MacAddress::from_sequence(100);
        let sta = MacAddress::from_sequence(1);
        let map = PsduMap::single_user(Psdu::qos_data(ap, sta, 1_500));

        assert_eq!(map.len(), 1);
        assert_eq!(map.single().map(|psdu| psdu.receiver), Some(sta));
        assert!(map.get(&Aid::SU).is_some());
    }

    #[test]
    fn multi_psdu_has_no_single() {
        let ap = MacAddress::from_sequence(100);
        let map: PsduMap = [
            (Aid::new(1), Psdu::qos_data(ap, MacAddress::from_sequence(1), 10)),
            (Aid::new(2), Psdu::qos_data(ap, MacAddress::from_sequence(2), 20)),
        ]
        .into_iter()
        .collect();

        assert!(map.single().is_none());
        assert_eq!(map.first().map(|psdu| psdu.size), Some(10));
    }

    #[test]
    fn trigger_grants_the_same_duration_to_everyone() {
        let trigger = TriggerFrame::basic(1_000, vec![Aid::new(1), Aid::new(2)]);
        assert!(trigger.is_basic());
        assert_eq!(trigger.granted_duration(), Duration::from_micros(1_360));
    }
}
