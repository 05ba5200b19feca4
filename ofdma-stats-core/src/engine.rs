//! The statistics engine.
//!
//! [`Engine`] owns every accumulator of a run and routes each
//! [`NetEvent`] to the handler accounting for it. It is driven by a single
//! thread of control: events must be fed in non decreasing [`Time`] order.

use crate::{
    AggregationEventHandler, GlobalAggregate, LatencyCorrelator, StationTable,
    TriggerFrameTracker,
    aggregation::FrameClass,
    config::RunConfig,
    event::NetEvent,
    id::{Aid, MacAddress, StationId},
    running_stat::MinTracking,
    stats::{BssStats, Report, StationStats},
    time::Time,
};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Where the engine is in its collection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Collection {
    #[default]
    NotStarted,
    Running {
        since: Time,
    },
    Stopped {
        since: Time,
        until: Time,
    },
}

/// What an [`Engine`] needs to know about the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// application packets smaller than this are not correlated
    pub min_payload: u32,
    /// dequeued MSDUs older than this were dropped
    pub msdu_lifetime: Duration,
    pub min_tracking: MinTracking,
}

#[derive(Debug, Clone)]
pub struct Engine {
    stations: StationTable,
    global: GlobalAggregate,
    latency: LatencyCorrelator,
    triggers: TriggerFrameTracker,
    aggregation: AggregationEventHandler,

    collection: Collection,
    last_event: Time,
}

impl From<&RunConfig> for EngineConfig {
    fn from(run: &RunConfig) -> Self {
        Self {
            min_payload: run.payload_size,
            msdu_lifetime: run.msdu_lifetime,
            min_tracking: run.min_tracking,
        }
    }
}

impl Engine {
    /// create the engine and one record per station address; the n-th
    /// address becomes [`StationId`] `n`.
    pub fn new(config: EngineConfig, addresses: impl IntoIterator<Item = MacAddress>) -> Self {
        Self {
            stations: StationTable::new(addresses, config.min_tracking),
            global: GlobalAggregate::new(config.min_tracking),
            latency: LatencyCorrelator::new(config.min_payload, config.msdu_lifetime),
            triggers: TriggerFrameTracker::new(),
            aggregation: AggregationEventHandler::new(),
            collection: Collection::NotStarted,
            last_event: Time::ZERO,
        }
    }

    /// record the AID `station` received when it associated
    pub fn associate(&mut self, station: StationId, aid: Aid) {
        debug!(%station, %aid, "station associated");
        self.stations.associate(station, aid);
    }

    pub fn stations(&self) -> &StationTable {
        &self.stations
    }

    pub fn global(&self) -> &GlobalAggregate {
        &self.global
    }

    pub fn latency(&self) -> &LatencyCorrelator {
        &self.latency
    }

    pub fn triggers(&self) -> &TriggerFrameTracker {
        &self.triggers
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// open the collection window, sampling the bytes every station
    /// received so far.
    ///
    /// # Panics
    ///
    /// if the collection was already started.
    pub fn start_collection(&mut self, now: Time, mut rx_bytes: impl FnMut(StationId) -> u64) {
        assert_eq!(
            self.collection,
            Collection::NotStarted,
            "statistics collection started twice"
        );

        for record in self.stations.iter_mut() {
            record.rx_bytes_start = rx_bytes(record.id());
            record.rx_bytes_stop = record.rx_bytes_start;
        }
        self.collection = Collection::Running { since: now };
        self.last_event = now;
        info!(%now, stations = self.stations.len(), "statistics collection started");
    }

    /// close the collection window, sampling the bytes every station
    /// received so far.
    ///
    /// # Panics
    ///
    /// if the collection is not running.
    pub fn stop_collection(&mut self, now: Time, mut rx_bytes: impl FnMut(StationId) -> u64) {
        let Collection::Running { since } = self.collection else {
            panic!("statistics collection stopped while {:?}", self.collection);
        };

        for record in self.stations.iter_mut() {
            record.rx_bytes_stop = rx_bytes(record.id());
        }
        self.collection = Collection::Stopped { since, until: now };
        info!(
            %now,
            pending = self.latency.pending(),
            "statistics collection stopped"
        );
    }

    /// account for `event`, delivered at `now`.
    ///
    /// # Panics
    ///
    /// if the collection is not running, or if the event references a
    /// station that was never set up.
    pub fn observe(&mut self, now: Time, event: &NetEvent) {
        assert!(
            matches!(self.collection, Collection::Running { .. }),
            "{} event delivered while {:?}",
            event.stream(),
            self.collection
        );
        debug_assert!(now >= self.last_event, "event delivered out of order");
        self.last_event = now;

        trace!(%now, stream = %event.stream(), "event");

        match event {
            NetEvent::ForwardDown(frame) => {
                let class = self.aggregation.on_forward_down(
                    frame,
                    &mut self.stations,
                    &mut self.global,
                    &mut self.triggers,
                );
                if class == FrameClass::Ignored {
                    trace!(%now, "forwarded frame not accounted");
                }
            }
            NetEvent::Dequeue(item) => {
                self.latency
                    .on_dequeue(now, item, &mut self.stations, &mut self.global);
            }
            NetEvent::Expired(item) => {
                self.stations.by_address_mut(item.receiver).expired += 1;
            }
            NetEvent::TxFailed { receiver } => {
                self.stations.by_address_mut(*receiver).failed += 1;
            }
            NetEvent::Txop { duration, .. } => {
                self.global.observe_txop(*duration);
            }
            NetEvent::AppTx(packet) => {
                self.latency.on_send(now, packet);
            }
            NetEvent::AppRx { packet, station } => {
                self.latency
                    .on_receive(now, packet, *station, &mut self.stations);
            }
        }
    }

    /// snapshot every statistic.
    ///
    /// Throughputs are computed over the collection window; they are zero
    /// until the collection stopped.
    pub fn report(&self) -> Report {
        let duration = match self.collection {
            Collection::Stopped { since, until } => until.saturating_duration_since(since),
            Collection::NotStarted | Collection::Running { .. } => Duration::ZERO,
        };

        Report {
            duration,
            stations: self
                .stations
                .iter()
                .map(|record| StationStats::new(record, duration))
                .collect(),
            bss: BssStats::from(&self.global),
        }
    }
}
