use crate::{RunningStat, Time, running_stat::MinTracking};
use std::time::Duration;

/// BSS-wide counterparts of the per-station accounting.
///
/// One instance per run, owned by the [`Engine`](crate::Engine).
#[derive(Debug, Clone, Default)]
pub struct GlobalAggregate {
    /// bytes sent in a DL MU PPDU to the bytes the PPDU could have carried
    pub(crate) dl_mu_completeness: RunningStat,
    /// milliseconds, between two head-of-line dequeues from the AP queue
    pub(crate) hol_delay: RunningStat,
    pub(crate) last_dequeue: Option<Time>,
    /// HE TB PPDU durations to the overall time granted by the soliciting
    /// basic trigger frame
    pub(crate) he_tb_completeness: RunningStat,
    pub(crate) basic_triggers_sent: u64,
    /// basic trigger frames nobody responded to
    pub(crate) failed_triggers: u64,
    pub(crate) max_txop: Duration,
}

impl GlobalAggregate {
    pub fn new(tracking: MinTracking) -> Self {
        Self {
            dl_mu_completeness: RunningStat::with_tracking(tracking),
            hol_delay: RunningStat::with_tracking(tracking),
            last_dequeue: None,
            he_tb_completeness: RunningStat::with_tracking(tracking),
            basic_triggers_sent: 0,
            failed_triggers: 0,
            max_txop: Duration::ZERO,
        }
    }

    pub fn dl_mu_completeness(&self) -> &RunningStat {
        &self.dl_mu_completeness
    }

    pub fn hol_delay(&self) -> &RunningStat {
        &self.hol_delay
    }

    pub fn last_dequeue(&self) -> Option<Time> {
        self.last_dequeue
    }

    pub fn he_tb_completeness(&self) -> &RunningStat {
        &self.he_tb_completeness
    }

    pub fn basic_triggers_sent(&self) -> u64 {
        self.basic_triggers_sent
    }

    pub fn failed_triggers(&self) -> u64 {
        self.failed_triggers
    }

    pub fn max_txop(&self) -> Duration {
        self.max_txop
    }

    /// account for a TXOP of the AP
    pub(crate) fn observe_txop(&mut self, duration: Duration) {
        self.max_txop = self.max_txop.max(duration);
    }
}
