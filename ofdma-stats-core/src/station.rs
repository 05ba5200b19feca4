//! Per-station accounting.

use crate::{
    RunningStat, Time,
    id::{Aid, MacAddress, StationId},
    running_stat::MinTracking,
};
use std::{collections::HashMap, time::Duration};

/// Everything measured about one non-AP station.
///
/// Created when the station's device is set up, mutated only while the
/// statistics are being collected, read once the collection stopped.
#[derive(Debug, Clone)]
pub struct StationRecord {
    id: StationId,
    address: MacAddress,
    aid: Option<Aid>,

    pub(crate) failed: u64,
    pub(crate) expired: u64,

    /// A-MPDU sizes in bytes; the count is the number of A-MPDUs
    pub(crate) ampdu_size: RunningStat,
    /// A-MPDU size to largest A-MPDU size in the DL MU PPDU
    pub(crate) ampdu_ratio: RunningStat,
    /// milliseconds
    pub(crate) hol_delay: RunningStat,
    pub(crate) last_dequeue: Option<Time>,

    /// HE TB PPDU duration to granted duration
    pub(crate) ul_length_ratio: RunningStat,
    pub(crate) solicited_triggers: u64,
    pub(crate) answered_triggers: u64,

    pub(crate) latencies: Vec<Duration>,

    pub(crate) rx_bytes_start: u64,
    pub(crate) rx_bytes_stop: u64,
}

/// The stations of the BSS.
///
/// Frames address stations by MAC address or by AID; both resolve to the
/// same [`StationRecord`]. Resolving a station that was never set up (or
/// an AID that was never handed out) is a broken invariant and panics.
#[derive(Debug, Clone, Default)]
pub struct StationTable {
    records: Vec<StationRecord>,
    by_address: HashMap<MacAddress, StationId>,
    by_aid: HashMap<Aid, StationId>,
}

impl StationRecord {
    fn new(id: StationId, address: MacAddress, tracking: MinTracking) -> Self {
        Self {
            id,
            address,
            aid: None,
            failed: 0,
            expired: 0,
            ampdu_size: RunningStat::with_tracking(tracking),
            ampdu_ratio: RunningStat::with_tracking(tracking),
            hol_delay: RunningStat::with_tracking(tracking),
            last_dequeue: None,
            ul_length_ratio: RunningStat::with_tracking(tracking),
            solicited_triggers: 0,
            answered_triggers: 0,
            latencies: Vec::new(),
            rx_bytes_start: 0,
            rx_bytes_stop: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> StationId {
        self.id
    }

    #[inline]
    pub fn address(&self) -> MacAddress {
        self.address
    }

    #[inline]
    pub fn aid(&self) -> Option<Aid> {
        self.aid
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn expired(&self) -> u64 {
        self.expired
    }

    pub fn ampdu_size(&self) -> &RunningStat {
        &self.ampdu_size
    }

    pub fn ampdu_ratio(&self) -> &RunningStat {
        &self.ampdu_ratio
    }

    pub fn hol_delay(&self) -> &RunningStat {
        &self.hol_delay
    }

    pub fn last_dequeue(&self) -> Option<Time> {
        self.last_dequeue
    }

    pub fn ul_length_ratio(&self) -> &RunningStat {
        &self.ul_length_ratio
    }

    pub fn solicited_triggers(&self) -> u64 {
        self.solicited_triggers
    }

    pub fn answered_triggers(&self) -> u64 {
        self.answered_triggers
    }

    pub fn latencies(&self) -> &[Duration] {
        &self.latencies
    }

    /// bytes received by the station's application during the collection
    pub fn rx_bytes(&self) -> u64 {
        self.rx_bytes_stop.saturating_sub(self.rx_bytes_start)
    }
}

impl StationTable {
    /// create one record per address; the n-th address becomes
    /// [`StationId`] `n`.
    pub fn new(addresses: impl IntoIterator<Item = MacAddress>, tracking: MinTracking) -> Self {
        let mut table = Self::default();
        let mut id = StationId::ZERO;
        for address in addresses {
            let previous = table.by_address.insert(address, id);
            assert!(previous.is_none(), "station address {address} set up twice");
            table.records.push(StationRecord::new(id, address, tracking));
            id = id.next();
        }
        table
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// record the AID the access point gave to `station` on association
    pub fn associate(&mut self, station: StationId, aid: Aid) {
        let record = self.get_mut(station);
        if let Some(previous) = record.aid.replace(aid) {
            self.by_aid.remove(&previous);
        }
        self.by_aid.insert(aid, station);
    }

    pub fn get(&self, station: StationId) -> &StationRecord {
        self.records
            .get(station.index())
            .unwrap_or_else(|| panic!("no record for station {station}"))
    }

    pub fn get_mut(&mut self, station: StationId) -> &mut StationRecord {
        self.records
            .get_mut(station.index())
            .unwrap_or_else(|| panic!("no record for station {station}"))
    }

    pub fn id_of_address(&self, address: MacAddress) -> StationId {
        *self
            .by_address
            .get(&address)
            .unwrap_or_else(|| panic!("no station with address {address}"))
    }

    pub fn id_of_aid(&self, aid: Aid) -> StationId {
        *self
            .by_aid
            .get(&aid)
            .unwrap_or_else(|| panic!("no station associated with AID {aid}"))
    }

    pub fn by_address_mut(&mut self, address: MacAddress) -> &mut StationRecord {
        let id = self.id_of_address(address);
        self.get_mut(id)
    }

    pub fn by_aid_mut(&mut self, aid: Aid) -> &mut StationRecord {
        let id = self.id_of_aid(aid);
        self.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StationRecord> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut StationRecord> {
        self.records.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: u64) -> StationTable {
        StationTable::new((1..=n).map(MacAddress::from_sequence), MinTracking::Exact)
    }

    #[test]
    fn ids_follow_setup_order() {
        let table = table(3);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.id_of_address(MacAddress::from_sequence(3)),
            StationId::new(2)
        );
        assert_eq!(
            table.get(StationId::new(1)).address(),
            MacAddress::from_sequence(2)
        );
    }

    #[test]
    fn association_maps_aid() {
        let mut table = table(2);
        table.associate(StationId::new(1), Aid::new(7));

        assert_eq!(table.id_of_aid(Aid::new(7)), StationId::new(1));
        assert_eq!(table.get(StationId::new(1)).aid(), Some(Aid::new(7)));
        assert_eq!(table.get(StationId::ZERO).aid(), None);
    }

    #[test]
    fn reassociation_forgets_previous_aid() {
        let mut table = table(1);
        table.associate(StationId::ZERO, Aid::new(1));
        table.associate(StationId::ZERO, Aid::new(2));

        assert_eq!(table.id_of_aid(Aid::new(2)), StationId::ZERO);
        assert!(std::panic::catch_unwind(|| table.id_of_aid(Aid::new(1))).is_err());
    }

    #[test]
    #[should_panic(expected = "no station with address")]
    fn unknown_address_is_fatal() {
        table(1).by_address_mut(MacAddress::from_sequence(9));
    }

    #[test]
    #[should_panic(expected = "no station associated with AID")]
    fn unknown_aid_is_fatal() {
        table(1).by_aid_mut(Aid::new(3));
    }

    #[test]
    fn rx_bytes_is_the_window_difference() {
        let mut table = table(1);
        let record = table.get_mut(StationId::ZERO);
        record.rx_bytes_start = 1_000;
        record.rx_bytes_stop = 4_500;
        assert_eq!(record.rx_bytes(), 3_500);
    }
}
