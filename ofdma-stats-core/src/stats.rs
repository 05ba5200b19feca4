//! Final statistics of a run.
//!
//! [`Report`] is a point-in-time snapshot of everything the engine
//! measured. Obtain one via [`Engine::report`](crate::Engine::report) once
//! the collection stopped.

use crate::{
    GlobalAggregate, StationRecord,
    id::{Aid, MacAddress, StationId},
    running_stat::StatSnapshot,
};
use std::time::Duration;

/// Snapshot of the statistics of a single station.
#[derive(Debug, Clone, PartialEq)]
pub struct StationStats {
    /// The station's identifier.
    pub id: StationId,
    pub address: MacAddress,
    pub aid: Option<Aid>,
    /// Application throughput over the collection window, in Mbit/s.
    pub throughput_mbps: f64,
    /// MPDUs addressed to the station that were not acknowledged.
    pub failed: u64,
    /// MSDUs addressed to the station dropped because their lifetime
    /// expired.
    pub expired: u64,
    /// A-MPDU sizes in bytes.
    pub ampdu_size: StatSnapshot,
    /// A-MPDU size relative to the largest A-MPDU of the DL MU PPDU.
    pub ampdu_ratio: StatSnapshot,
    /// Head-of-line delay in milliseconds.
    pub hol_delay: StatSnapshot,
    /// HE TB PPDU duration relative to the granted duration.
    pub ul_length_ratio: StatSnapshot,
    pub solicited_triggers: u64,
    pub answered_triggers: u64,
    /// Mean end-to-end latency; `None` when no packet was correlated.
    pub average_latency: Option<Duration>,
    pub latency_samples: usize,
}

/// Snapshot of the BSS-wide statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct BssStats {
    pub dl_mu_completeness: StatSnapshot,
    /// Head-of-line delay in milliseconds.
    pub hol_delay: StatSnapshot,
    pub he_tb_completeness: StatSnapshot,
    pub basic_triggers_sent: u64,
    pub failed_triggers: u64,
    pub max_txop: Duration,
}

/// Point-in-time snapshot of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Length of the collection window the throughputs are computed over.
    pub duration: Duration,
    /// Per-station statistics, in [`StationId`] order.
    pub stations: Vec<StationStats>,
    pub bss: BssStats,
}

impl StationStats {
    pub(crate) fn new(record: &StationRecord, duration: Duration) -> Self {
        Self {
            id: record.id(),
            address: record.address(),
            aid: record.aid(),
            throughput_mbps: throughput_mbps(record.rx_bytes(), duration),
            failed: record.failed(),
            expired: record.expired(),
            ampdu_size: record.ampdu_size().snapshot(),
            ampdu_ratio: record.ampdu_ratio().snapshot(),
            hol_delay: record.hol_delay().snapshot(),
            ul_length_ratio: record.ul_length_ratio().snapshot(),
            solicited_triggers: record.solicited_triggers(),
            answered_triggers: record.answered_triggers(),
            average_latency: average(record.latencies()),
            latency_samples: record.latencies().len(),
        }
    }

    /// Share of the trigger frames addressed to the station that it did
    /// not respond to; `0.0` when it was never solicited.
    pub fn unresponded_trigger_ratio(&self) -> f64 {
        if self.solicited_triggers == 0 {
            return 0.0;
        }
        let missed = self.solicited_triggers.saturating_sub(self.answered_triggers);
        missed as f64 / self.solicited_triggers as f64
    }
}

impl From<&GlobalAggregate> for BssStats {
    fn from(global: &GlobalAggregate) -> Self {
        Self {
            dl_mu_completeness: global.dl_mu_completeness().snapshot(),
            hol_delay: global.hol_delay().snapshot(),
            he_tb_completeness: global.he_tb_completeness().snapshot(),
            basic_triggers_sent: global.basic_triggers_sent(),
            failed_triggers: global.failed_triggers(),
            max_txop: global.max_txop(),
        }
    }
}

impl Report {
    pub fn total_throughput_mbps(&self) -> f64 {
        self.stations.iter().map(|s| s.throughput_mbps).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.stations.iter().map(|s| s.failed).sum()
    }

    pub fn total_expired(&self) -> u64 {
        self.stations.iter().map(|s| s.expired).sum()
    }

    /// Share of the solicited HE TB PPDUs that were never sent, over all
    /// the stations; `0.0` when no trigger frame was sent.
    pub fn missing_he_tb_ratio(&self) -> f64 {
        let (solicited, answered) = self.stations.iter().fold((0, 0), |(s, a), station| {
            (s + station.solicited_triggers, a + station.answered_triggers)
        });
        if solicited == 0 {
            return 0.0;
        }
        solicited.saturating_sub(answered) as f64 / solicited as f64
    }
}

/// bytes received over `duration`, in Mbit/s
fn throughput_mbps(bytes: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }
    bytes as f64 * 8.0 / (duration.as_secs_f64() * 1e6)
}

fn average(latencies: &[Duration]) -> Option<Duration> {
    if latencies.is_empty() {
        return None;
    }
    let total: Duration = latencies.iter().sum();
    Some(total / latencies.len() as u32)
}
