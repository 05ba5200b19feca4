/*!
# OFDMA statistics runs

Onboards the stations of a BSS one at a time, lets their traffic warm up,
then collects the statistics of [`ofdma_stats_core`] over a fixed window
of virtual time.

```
use ofdma_stats::{Simulation, Substrate as _, SyntheticSubstrate};
use ofdma_stats_core::{Config, Engine, EngineConfig};
use std::time::Duration;

let run = Config {
    stations: 2,
    warmup: Duration::from_millis(20),
    simulation_time: Duration::from_millis(50),
    ..Config::default()
}
.resolve()?;

let substrate = SyntheticSubstrate::new(&run);
let engine = Engine::new(EngineConfig::from(&run), substrate.stations());

let mut simulation = Simulation::new(&run, substrate, engine);
simulation.run()?;

let report = simulation.into_sink().report();
assert_eq!(report.stations.len(), 2);
# Ok::<(), anyhow::Error>(())
```
*/

mod bus;
mod orchestrator;
mod profile;
mod report;
mod scheduler;
mod simulation;
mod sink;
mod substrate;
mod synthetic;
mod worker;

// convenient re-export of `ofdma_stats_core` core objects
pub use ofdma_stats_core::{
    Config, ConfigError, Engine, EngineConfig, EventStream, NetEvent, Report, RunConfig,
    StationId, Time,
};

pub use self::{
    bus::EventBus,
    orchestrator::{
        Milestone, MilestoneKind, OnboardingContext, OnboardingError, OnboardingOrchestrator,
        RunPhase, StationPhase, Step,
    },
    profile::{BULK_TRANSFER_PORT, STEADY_RATE_PORT, TrafficProfile},
    report::TextReport,
    scheduler::Scheduler,
    simulation::Simulation,
    sink::StatsSink,
    substrate::{Scheduled, Substrate, SubstrateContext, rx_bytes_of},
    synthetic::{Anomalies, SyntheticSubstrate},
    worker::StatsWorker,
};
