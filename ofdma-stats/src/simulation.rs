//! The virtual time event loop of a run.

use crate::{
    EventBus, OnboardingContext, OnboardingOrchestrator, Scheduled, Scheduler, StatsSink,
    Substrate, SubstrateContext,
};
use anyhow::{Context as _, Result, bail};
use ofdma_stats_core::{Time, config::RunConfig};
use tracing::{debug, info};

/// Drives a [`Substrate`] and the [`OnboardingOrchestrator`] on a shared
/// virtual clock, forwarding the subscribed events to a [`StatsSink`].
///
/// Items scheduled at the same virtual time are dispatched in the order
/// they were scheduled.
pub struct Simulation<S, K> {
    queue: Scheduler<Scheduled>,
    substrate: S,
    sink: K,
    bus: EventBus,
    orchestrator: OnboardingOrchestrator,
    dispatched: u64,
}

impl<S, K> Simulation<S, K>
where
    S: Substrate,
    K: StatsSink,
{
    pub fn new(run: &RunConfig, substrate: S, sink: K) -> Self {
        let mut queue = Scheduler::new();
        let orchestrator = OnboardingOrchestrator::new(run);
        orchestrator.start(&mut queue);

        Self {
            queue,
            substrate,
            sink,
            bus: EventBus::new(),
            orchestrator,
            dispatched: 0,
        }
    }

    pub fn now(&self) -> Time {
        self.queue.now()
    }

    pub fn orchestrator(&self) -> &OnboardingOrchestrator {
        &self.orchestrator
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// dispatch the next scheduled item. Returns `false` once the
    /// statistics collection stopped.
    pub fn step(&mut self) -> Result<bool> {
        if self.orchestrator.is_done() {
            return Ok(false);
        }

        let Some((now, item)) = self.queue.pop() else {
            bail!(
                "Simulation stalled at {} in {:?}: nothing left to do",
                self.queue.now(),
                self.orchestrator.run_phase()
            );
        };
        self.dispatched += 1;

        match item {
            Scheduled::Step(step) => {
                let mut ctx = OnboardingContext {
                    queue: &mut self.queue,
                    substrate: &mut self.substrate,
                    bus: &mut self.bus,
                    sink: &mut self.sink,
                };
                self.orchestrator
                    .handle(step, &mut ctx)
                    .with_context(|| format!("Failed to onboard at {now}"))?;
            }
            Scheduled::Event(event) => {
                self.bus
                    .publish(now, event, &mut self.sink)
                    .with_context(|| format!("Failed to forward event at {now}"))?;
            }
            Scheduled::Timer(token) => {
                self.substrate
                    .on_timer(&mut SubstrateContext::new(&mut self.queue), token);
            }
        }

        Ok(!self.orchestrator.is_done())
    }

    /// run until the statistics collection stopped
    pub fn run(&mut self) -> Result<()> {
        info!(stations = self.substrate.stations().len(), "simulation started");

        while self.step()? {}

        debug!(
            dispatched = self.dispatched,
            delivered = self.bus.delivered(),
            dropped = self.bus.dropped(),
            "event loop finished"
        );
        info!(now = %self.now(), "simulation finished");
        Ok(())
    }
}
