//! End-to-end latency and head-of-line delay.

use crate::{
    GlobalAggregate, RunningStat, StationTable, Time,
    event::AppPacket,
    frame::MsduItem,
    id::{PacketUid, StationId},
};
use std::{collections::HashMap, time::Duration};
use tracing::trace;

/// Correlates application sends with receptions, and dequeues with the
/// previous dequeue.
///
/// A send whose reception never arrives stays pending forever: it never
/// produces a latency sample.
#[derive(Debug, Clone)]
pub struct LatencyCorrelator {
    /// packets smaller than this are control traffic and ignored
    min_payload: u32,
    /// MSDUs dequeued later than this after their enqueue were dropped
    msdu_lifetime: Duration,
    pending: HashMap<PacketUid, Time>,
}

/// What a dequeue did to the head-of-line accounting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HolOutcome {
    /// BSS-wide sample, in milliseconds
    pub bss: Option<f64>,
    /// per-station sample, in milliseconds
    pub station: Option<f64>,
}

impl LatencyCorrelator {
    pub fn new(min_payload: u32, msdu_lifetime: Duration) -> Self {
        Self {
            min_payload,
            msdu_lifetime,
            pending: HashMap::new(),
        }
    }

    /// number of sent packets still waiting for their reception
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn on_send(&mut self, now: Time, packet: &AppPacket) {
        if packet.size < self.min_payload {
            return;
        }
        // a uid sent again before its reception keeps its first send time
        self.pending.entry(packet.uid).or_insert(now);
    }

    /// correlate a reception with its send. Returns the latency sample, if
    /// the reception matched a pending send. A packet is only ever matched
    /// once.
    pub fn on_receive(
        &mut self,
        now: Time,
        packet: &AppPacket,
        station: StationId,
        stations: &mut StationTable,
    ) -> Option<Duration> {
        if packet.size < self.min_payload {
            return None;
        }
        let sent_at = self.pending.remove(&packet.uid)?;
        let latency = now.saturating_duration_since(sent_at);

        trace!(%station, uid = %packet.uid, ?latency, "latency sample");
        stations.get_mut(station).latencies.push(latency);
        Some(latency)
    }

    /// account for an MSDU leaving the AP queue.
    ///
    /// MSDUs that outlived their lifetime were discarded, not sent: they
    /// leave the head-of-line state untouched. Otherwise the gap since the
    /// previous dequeue is a sample when strictly positive; a zero gap is
    /// an MSDU aggregated to the burst just counted. The last dequeue time
    /// moves to `now` in both cases.
    pub fn on_dequeue(
        &mut self,
        now: Time,
        item: &MsduItem,
        stations: &mut StationTable,
        global: &mut GlobalAggregate,
    ) -> Option<HolOutcome> {
        if now.saturating_duration_since(item.enqueued_at) > self.msdu_lifetime {
            return None;
        }

        let bss = hol_sample(now, &mut global.last_dequeue, &mut global.hol_delay);

        let record = stations.by_address_mut(item.receiver);
        let station = hol_sample(now, &mut record.last_dequeue, &mut record.hol_delay);

        Some(HolOutcome { bss, station })
    }
}

fn hol_sample(now: Time, last: &mut Option<Time>, stat: &mut RunningStat) -> Option<f64> {
    let sample = last
        .replace(now)
        .and_then(|last| now.checked_duration_since(last))
        .filter(|gap| !gap.is_zero())
        .map(|gap| gap.as_nanos() as f64 / 1_000_000.0);

    if let Some(sample) = sample {
        stat.observe(sample);
    }
    sample
}
