//! Sequential onboarding of the stations.
//!
//! Stations associate one at a time: station `n + 1` starts associating
//! only once the reachability verification of station `n` elapsed. Each
//! station gets its traffic client installed while it is being verified.
//! Once the last station is onboarded every client starts, and the
//! statistics are collected over `[warmup, warmup + simulation_time]`
//! after that instant.

use crate::{
    EventBus, Scheduled, Scheduler, StatsSink, Substrate, SubstrateContext, TrafficProfile,
    substrate::rx_bytes_of,
};
use ofdma_stats_core::{Aid, StationId, Time, config::RunConfig, defaults::PING_INTERVAL};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// A continuation of the onboarding, scheduled on the virtual clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    StartAssociation,
    /// reported by the substrate once the station associated
    Associated { station: StationId, aid: Aid },
    InstallClient { station: StationId },
    /// the end of the reachability verification of `station`; advances to
    /// the next station, or starts the traffic after the last one
    VerificationElapsed { station: StationId },
    StartStatistics,
    StopStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StationPhase {
    Unassociated,
    Associating,
    Verifying,
    ClientInstalled,
    TrafficStarted,
    StatsCollecting,
    StatsStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Onboarding { current: StationId },
    WarmingUp { since: Time },
    Collecting { since: Time },
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneKind {
    AssociationStarted(StationId),
    Associated(StationId),
    ClientInstalled(StationId),
    VerificationElapsed(StationId),
    TrafficStarted,
    StatisticsStarted,
    StatisticsStopped,
}

/// A dated transition of the onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub at: Time,
    pub kind: MilestoneKind,
}

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("Onboarding step {step:?} received while {phase:?}")]
    OutOfOrder { step: Step, phase: RunPhase },
    #[error("Station {station} associated while station {expected} was onboarding")]
    UnexpectedAssociation {
        station: StationId,
        expected: StationId,
    },
    #[error("Station {station} is {actual:?}, expected {expected:?}")]
    StationPhase {
        station: StationId,
        expected: StationPhase,
        actual: StationPhase,
    },
    #[error(transparent)]
    Sink(#[from] anyhow::Error),
}

/// What the orchestrator drives.
pub struct OnboardingContext<'a, S: ?Sized, K: ?Sized> {
    pub queue: &'a mut Scheduler<Scheduled>,
    pub substrate: &'a mut S,
    pub bus: &'a mut EventBus,
    pub sink: &'a mut K,
}

pub struct OnboardingOrchestrator {
    ping_duration: Duration,
    warmup: Duration,
    simulation_time: Duration,

    profiles: Vec<TrafficProfile>,
    stations: Vec<StationPhase>,
    run: RunPhase,

    timeline: Vec<Milestone>,
}

impl OnboardingOrchestrator {
    pub fn new(run: &RunConfig) -> Self {
        let profiles: Vec<_> = (0..run.stations)
            .map(|n| TrafficProfile::for_station(StationId::new(n), run))
            .collect();

        Self {
            ping_duration: run.ping_duration,
            warmup: run.warmup,
            simulation_time: run.simulation_time,
            stations: vec![StationPhase::Unassociated; profiles.len()],
            profiles,
            run: RunPhase::Onboarding {
                current: StationId::ZERO,
            },
            timeline: Vec::new(),
        }
    }

    pub fn run_phase(&self) -> RunPhase {
        self.run
    }

    pub fn is_done(&self) -> bool {
        self.run == RunPhase::Done
    }

    pub fn phase_of(&self, station: StationId) -> StationPhase {
        self.stations[station.index()]
    }

    pub fn profile_of(&self, station: StationId) -> TrafficProfile {
        self.profiles[station.index()]
    }

    /// every transition so far, in virtual time order
    pub fn timeline(&self) -> &[Milestone] {
        &self.timeline
    }

    /// when `kind` happened, if it did
    pub fn milestone(&self, kind: MilestoneKind) -> Option<Time> {
        self.timeline
            .iter()
            .find(|milestone| milestone.kind == kind)
            .map(|milestone| milestone.at)
    }

    /// schedule the association of the first station at the current time
    pub fn start(&self, queue: &mut Scheduler<Scheduled>) {
        queue.schedule_in(Duration::ZERO, Scheduled::Step(Step::StartAssociation));
    }

    pub fn handle<S, K>(
        &mut self,
        step: Step,
        ctx: &mut OnboardingContext<'_, S, K>,
    ) -> Result<(), OnboardingError>
    where
        S: Substrate + ?Sized,
        K: StatsSink + ?Sized,
    {
        let now = ctx.queue.now();
        debug!(%now, ?step, "onboarding step");

        match (step, self.run) {
            (Step::StartAssociation, RunPhase::Onboarding { current }) => {
                self.start_association(now, current, ctx)
            }
            (Step::Associated { station, aid }, RunPhase::Onboarding { current }) => {
                if station != current {
                    return Err(OnboardingError::UnexpectedAssociation {
                        station,
                        expected: current,
                    });
                }
                self.associated(now, station, aid, ctx)
            }
            (Step::InstallClient { station }, RunPhase::Onboarding { .. }) => {
                self.install_client(now, station, ctx)
            }
            (Step::VerificationElapsed { station }, RunPhase::Onboarding { current })
                if station == current =>
            {
                self.verification_elapsed(now, station, ctx)
            }
            (Step::StartStatistics, RunPhase::WarmingUp { .. }) => {
                self.start_statistics(now, ctx)
            }
            (Step::StopStatistics, RunPhase::Collecting { .. }) => {
                self.stop_statistics(now, ctx)
            }
            (step, phase) => Err(OnboardingError::OutOfOrder { step, phase }),
        }
    }

    fn record(&mut self, at: Time, kind: MilestoneKind) {
        self.timeline.push(Milestone { at, kind });
    }

    fn transition(
        &mut self,
        station: StationId,
        expected: StationPhase,
        next: StationPhase,
    ) -> Result<(), OnboardingError> {
        let phase = &mut self.stations[station.index()];
        if *phase != expected {
            return Err(OnboardingError::StationPhase {
                station,
                expected,
                actual: *phase,
            });
        }
        *phase = next;
        Ok(())
    }

    fn start_association<S, K>(
        &mut self,
        now: Time,
        station: StationId,
        ctx: &mut OnboardingContext<'_, S, K>,
    ) -> Result<(), OnboardingError>
    where
        S: Substrate + ?Sized,
        K: StatsSink + ?Sized,
    {
        self.transition(station, StationPhase::Unassociated, StationPhase::Associating)?;
        self.record(now, MilestoneKind::AssociationStarted(station));
        info!(%now, %station, "starting association");

        ctx.substrate
            .associate(&mut SubstrateContext::new(ctx.queue), station);
        Ok(())
    }

    fn associated<S, K>(
        &mut self,
        now: Time,
        station: StationId,
        aid: Aid,
        ctx: &mut OnboardingContext<'_, S, K>,
    ) -> Result<(), OnboardingError>
    where
        S: Substrate + ?Sized,
        K: StatsSink + ?Sized,
    {
        self.transition(station, StationPhase::Associating, StationPhase::Verifying)?;
        self.record(now, MilestoneKind::Associated(station));
        info!(%now, %station, %aid, "station associated");

        ctx.sink.associate(station, aid)?;
        ctx.substrate.probe(
            &mut SubstrateContext::new(ctx.queue),
            station,
            self.ping_duration,
            PING_INTERVAL,
        );

        // the client is installed before the verification ends, even when
        // the verification is shorter than the profile's install delay
        let install_delay = self
            .profile_of(station)
            .install_delay(now)
            .min(self.ping_duration);
        ctx.queue.schedule_in(
            install_delay,
            Scheduled::Step(Step::InstallClient { station }),
        );
        ctx.queue.schedule_in(
            self.ping_duration,
            Scheduled::Step(Step::VerificationElapsed { station }),
        );
        Ok(())
    }

    fn install_client<S, K>(
        &mut self,
        now: Time,
        station: StationId,
        ctx: &mut OnboardingContext<'_, S, K>,
    ) -> Result<(), OnboardingError>
    where
        S: Substrate + ?Sized,
        K: StatsSink + ?Sized,
    {
        self.transition(station, StationPhase::Verifying, StationPhase::ClientInstalled)?;
        self.record(now, MilestoneKind::ClientInstalled(station));

        let profile = self.profile_of(station);
        debug!(%now, %station, %profile, "traffic client installed");
        ctx.substrate
            .install_client(&mut SubstrateContext::new(ctx.queue), station, profile);
        Ok(())
    }

    fn verification_elapsed<S, K>(
        &mut self,
        now: Time,
        station: StationId,
        ctx: &mut OnboardingContext<'_, S, K>,
    ) -> Result<(), OnboardingError>
    where
        S: Substrate + ?Sized,
        K: StatsSink + ?Sized,
    {
        let phase = self.phase_of(station);
        if phase != StationPhase::ClientInstalled {
            return Err(OnboardingError::StationPhase {
                station,
                expected: StationPhase::ClientInstalled,
                actual: phase,
            });
        }
        self.record(now, MilestoneKind::VerificationElapsed(station));

        let next = station.next();
        if next.index() < self.stations.len() {
            self.run = RunPhase::Onboarding { current: next };
            self.start_association(now, next, ctx)
        } else {
            self.start_traffic(now, ctx);
            Ok(())
        }
    }

    fn start_traffic<S, K>(&mut self, now: Time, ctx: &mut OnboardingContext<'_, S, K>)
    where
        S: Substrate + ?Sized,
        K: StatsSink + ?Sized,
    {
        self.stations.fill(StationPhase::TrafficStarted);
        self.run = RunPhase::WarmingUp { since: now };
        self.record(now, MilestoneKind::TrafficStarted);
        info!(%now, stations = self.stations.len(), warmup = ?self.warmup, "starting traffic");

        ctx.substrate
            .start_clients(&mut SubstrateContext::new(ctx.queue));
        ctx.queue
            .schedule_in(self.warmup, Scheduled::Step(Step::StartStatistics));
    }

    fn start_statistics<S, K>(
        &mut self,
        now: Time,
        ctx: &mut OnboardingContext<'_, S, K>,
    ) -> Result<(), OnboardingError>
    where
        S: Substrate + ?Sized,
        K: StatsSink + ?Sized,
    {
        ctx.sink.start_collection(now, rx_bytes_of(&*ctx.substrate))?;
        ctx.bus.connect_all();

        self.stations.fill(StationPhase::StatsCollecting);
        self.run = RunPhase::Collecting { since: now };
        self.record(now, MilestoneKind::StatisticsStarted);

        ctx.queue
            .schedule_in(self.simulation_time, Scheduled::Step(Step::StopStatistics));
        Ok(())
    }

    fn stop_statistics<S, K>(
        &mut self,
        now: Time,
        ctx: &mut OnboardingContext<'_, S, K>,
    ) -> Result<(), OnboardingError>
    where
        S: Substrate + ?Sized,
        K: StatsSink + ?Sized,
    {
        ctx.bus.disconnect_all();
        ctx.sink.stop_collection(now, rx_bytes_of(&*ctx.substrate))?;
        ctx.substrate
            .stop_clients(&mut SubstrateContext::new(ctx.queue));

        self.stations.fill(StationPhase::StatsStopped);
        self.run = RunPhase::Done;
        self.record(now, MilestoneKind::StatisticsStopped);
        info!(
            %now,
            delivered = ctx.bus.delivered(),
            dropped = ctx.bus.dropped(),
            "statistics stopped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use ofdma_stats_core::{Config, MacAddress, NetEvent};

    /// associates every station 2ms after being asked to
    #[derive(Default)]
    struct Immediate {
        installed: Vec<StationId>,
        started: bool,
        stopped: bool,
    }

    impl Substrate for Immediate {
        fn bssid(&self) -> MacAddress {
            MacAddress::new([0, 0, 0, 0, 0, 0xaa])
        }
        fn stations(&self) -> Vec<MacAddress> {
            (1..=3).map(MacAddress::from_sequence).collect()
        }
        fn associate(&mut self, ctx: &mut SubstrateContext<'_>, station: StationId) {
            let aid = Aid::new(station.index() as u16 + 1);
            ctx.associated_in(Duration::from_millis(2), station, aid);
        }
        fn probe(&mut self, _: &mut SubstrateContext<'_>, _: StationId, _: Duration, _: Duration) {}
        fn install_client(
            &mut self,
            _: &mut SubstrateContext<'_>,
            station: StationId,
            _: TrafficProfile,
        ) {
            self.installed.push(station);
        }
        fn start_clients(&mut self, _: &mut SubstrateContext<'_>) {
            self.started = true;
        }
        fn stop_clients(&mut self, _: &mut SubstrateContext<'_>) {
            self.stopped = true;
        }
        fn rx_bytes(&self, _: StationId) -> u64 {
            0
        }
        fn on_timer(&mut self, _: &mut SubstrateContext<'_>, _: u64) {}
    }

    #[derive(Default)]
    struct Associations(Vec<(StationId, Aid)>);

    impl StatsSink for Associations {
        fn associate(&mut self, station: StationId, aid: Aid) -> Result<()> {
            self.0.push((station, aid));
            Ok(())
        }
        fn start_collection(&mut self, _: Time, _: Vec<u64>) -> Result<()> {
            Ok(())
        }
        fn observe(&mut self, _: Time, _: NetEvent) -> Result<()> {
            Ok(())
        }
        fn stop_collection(&mut self, _: Time, _: Vec<u64>) -> Result<()> {
            Ok(())
        }
    }

    fn run_config() -> RunConfig {
        Config {
            stations: 3,
            ..Config::default()
        }
        .resolve()
        .unwrap()
    }

    fn drive(
        orchestrator: &mut OnboardingOrchestrator,
        substrate: &mut Immediate,
        sink: &mut Associations,
    ) -> Result<(), OnboardingError> {
        let mut queue = Scheduler::new();
        let mut bus = EventBus::new();
        orchestrator.start(&mut queue);

        while let Some((_, item)) = queue.pop() {
            if let Scheduled::Step(step) = item {
                let mut ctx = OnboardingContext {
                    queue: &mut queue,
                    substrate: &mut *substrate,
                    bus: &mut bus,
                    sink: &mut *sink,
                };
                orchestrator.handle(step, &mut ctx)?;
            }
        }
        Ok(())
    }

    #[test]
    fn stations_onboard_one_at_a_time() {
        let run = run_config();
        let mut orchestrator = OnboardingOrchestrator::new(&run);
        let mut substrate = Immediate::default();
        let mut sink = Associations::default();

        drive(&mut orchestrator, &mut substrate, &mut sink).unwrap();

        assert!(orchestrator.is_done());
        assert!(substrate.started && substrate.stopped);
        assert_eq!(
            substrate.installed,
            vec![StationId::new(0), StationId::new(1), StationId::new(2)]
        );
        assert_eq!(
            sink.0,
            vec![
                (StationId::new(0), Aid::new(1)),
                (StationId::new(1), Aid::new(2)),
                (StationId::new(2), Aid::new(3)),
            ]
        );

        // association (2ms) + verification (125ms) per station
        for n in 0..3u16 {
            let station = StationId::new(n);
            let started = orchestrator
                .milestone(MilestoneKind::AssociationStarted(station))
                .unwrap();
            assert_eq!(started, Time::from_millis(127 * u64::from(n)));
        }

        let traffic = orchestrator.milestone(MilestoneKind::TrafficStarted).unwrap();
        assert_eq!(traffic, Time::from_millis(3 * 127));
        assert_eq!(
            orchestrator.milestone(MilestoneKind::StatisticsStarted),
            Some(traffic + run.warmup)
        );
        assert_eq!(
            orchestrator.milestone(MilestoneKind::StatisticsStopped),
            Some(traffic + run.warmup + run.simulation_time)
        );
        assert_eq!(
            orchestrator.phase_of(StationId::new(2)),
            StationPhase::StatsStopped
        );
    }

    #[test]
    fn client_installed_before_a_short_verification_ends() {
        let run = Config {
            stations: 3,
            ping_duration: Duration::from_millis(20),
            ..Config::default()
        }
        .resolve()
        .unwrap();
        let mut orchestrator = OnboardingOrchestrator::new(&run);

        drive(
            &mut orchestrator,
            &mut Immediate::default(),
            &mut Associations::default(),
        )
        .unwrap();

        let installed = orchestrator
            .milestone(MilestoneKind::ClientInstalled(StationId::new(1)))
            .unwrap();
        let elapsed = orchestrator
            .milestone(MilestoneKind::VerificationElapsed(StationId::new(1)))
            .unwrap();
        assert_eq!(installed, elapsed);
        assert!(orchestrator.is_done());
    }

    #[test]
    fn association_of_another_station_is_rejected() {
        let run = run_config();
        let mut orchestrator = OnboardingOrchestrator::new(&run);
        let mut queue = Scheduler::new();
        let mut ctx = OnboardingContext {
            queue: &mut queue,
            substrate: &mut Immediate::default(),
            bus: &mut EventBus::new(),
            sink: &mut Associations::default(),
        };

        orchestrator.handle(Step::StartAssociation, &mut ctx).unwrap();
        let error = orchestrator
            .handle(
                Step::Associated {
                    station: StationId::new(1),
                    aid: Aid::new(2),
                },
                &mut ctx,
            )
            .unwrap_err();

        assert!(matches!(
            error,
            OnboardingError::UnexpectedAssociation { .. }
        ));
    }

    #[test]
    fn statistics_cannot_start_during_onboarding() {
        let run = run_config();
        let mut orchestrator = OnboardingOrchestrator::new(&run);
        let mut queue = Scheduler::new();
        let mut ctx = OnboardingContext {
            queue: &mut queue,
            substrate: &mut Immediate::default(),
            bus: &mut EventBus::new(),
            sink: &mut Associations::default(),
        };

        let error = orchestrator
            .handle(Step::StartStatistics, &mut ctx)
            .unwrap_err();
        assert!(matches!(error, OnboardingError::OutOfOrder { .. }));
        assert!(!ctx.bus.is_connected(ofdma_stats_core::EventStream::Dequeue));
    }
}
