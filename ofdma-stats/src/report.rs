//! Plain text rendering of a [`Report`].

use ofdma_stats_core::{Report, config::RunConfig, running_stat::StatSnapshot, stats::StationStats};
use std::fmt;

/// Renders a [`Report`] and the parameters of the run it was measured on.
///
/// Per-station lists are written in [`StationId`](ofdma_stats_core::StationId)
/// order.
pub struct TextReport<'a> {
    run: &'a RunConfig,
    report: &'a Report,
}

impl<'a> TextReport<'a> {
    pub fn new(run: &'a RunConfig, report: &'a Report) -> Self {
        Self { run, report }
    }

    fn header(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let run = self.run;
        writeln!(
            f,
            "Stations: {}, channel width: {} MHz, GI: {} ns, MCS: {}, max RUs: {}",
            run.stations,
            run.channel_width.mhz(),
            run.guard_interval.nanos(),
            run.mcs.index(),
            run.max_rus,
        )?;
        writeln!(
            f,
            "DL OFDMA: {}, UL OFDMA: {}, ack sequence: {:?}",
            on_off(run.enable_dl_ofdma),
            on_off(run.enable_ul_ofdma),
            run.ack_sequence,
        )?;
        writeln!(
            f,
            "Payload: {} B, data rate: {}, queue size: {} packets, MSDU lifetime: {} ms",
            run.payload_size,
            run.data_rate,
            run.mac_queue_size,
            run.msdu_lifetime.as_millis(),
        )?;
        writeln!(
            f,
            "Warm-up: {:?}, measured: {:?}, seed: {}",
            run.warmup, self.report.duration, run.seed,
        )
    }

    fn per_station<F>(&self, f: &mut fmt::Formatter<'_>, title: &str, cell: F) -> fmt::Result
    where
        F: Fn(&StationStats) -> String,
    {
        writeln!(f)?;
        writeln!(f, "{title}")?;
        let cells = self.report.stations.iter().map(&cell).collect::<Vec<_>>();
        writeln!(f, "{}", cells.join(" "))
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

fn value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| format!("{v:.3}"))
}

/// `(min,max,avg)`
fn min_max_mean(stat: &StatSnapshot) -> String {
    if stat.count == 0 {
        return "(-,-,-)".to_owned();
    }
    format!("({},{},{:.3})", value(stat.min), value(stat.max), stat.mean)
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        let bss = &report.bss;

        self.header(f)?;

        self.per_station(f, "Throughput (Mbps)", |s| format!("{:.3}", s.throughput_mbps))?;
        writeln!(f, "Total: {:.3}", report.total_throughput_mbps())?;

        self.per_station(f, "TX failures", |s| s.failed.to_string())?;
        writeln!(f, "Total: {}", report.total_failed())?;

        self.per_station(f, "Expired MSDUs", |s| s.expired.to_string())?;
        writeln!(f, "Total: {}", report.total_expired())?;

        self.per_station(f, "(Min,Max,Count) A-MPDU size", |s| {
            let size = &s.ampdu_size;
            let bytes = |v: Option<f64>| v.map_or_else(|| "-".to_owned(), |v| format!("{v:.0}"));
            format!("({},{},{})", bytes(size.min), bytes(size.max), size.count)
        })?;

        writeln!(f)?;
        writeln!(
            f,
            "Maximum TXOP duration: {:.3} ms",
            bss.max_txop.as_secs_f64() * 1_000.0
        )?;

        self.per_station(f, "(Min,Max,Avg) A-MPDU ratio", |s| min_max_mean(&s.ampdu_ratio))?;

        writeln!(f)?;
        writeln!(
            f,
            "(Min,Max,Avg) DL MU PPDU completeness: {}",
            min_max_mean(&bss.dl_mu_completeness)
        )?;

        self.per_station(f, "(Min,Max,Avg) HOL delay (ms)", |s| min_max_mean(&s.hol_delay))?;
        writeln!(f, "BSS: {}", min_max_mean(&bss.hol_delay))?;

        self.per_station(f, "Average latency (ms)", |s| {
            value(s.average_latency.map(|l| l.as_secs_f64() * 1_000.0))
        })?;

        if !self.run.enable_ul_ofdma {
            return Ok(());
        }

        self.per_station(
            f,
            "Unresponded TF ratio / (Min,Max,Avg) UL length ratio",
            |s| {
                format!(
                    "{:.3}/{}",
                    s.unresponded_trigger_ratio(),
                    min_max_mean(&s.ul_length_ratio)
                )
            },
        )?;

        writeln!(f)?;
        writeln!(
            f,
            "(Failed, Sent) basic TFs: ({}, {})",
            bss.failed_triggers, bss.basic_triggers_sent
        )?;
        writeln!(f, "Missing HE TB PPDU ratio: {:.3}", report.missing_he_tb_ratio())?;
        writeln!(
            f,
            "(Min,Max,Avg) HE TB PPDU completeness: {}",
            min_max_mean(&bss.he_tb_completeness)
        )
    }
}
