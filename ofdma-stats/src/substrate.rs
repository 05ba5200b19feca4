//! The network simulator the statistics are collected from.

use crate::{Scheduler, Step, TrafficProfile};
use ofdma_stats_core::{Aid, MacAddress, NetEvent, StationId, Time};
use std::time::Duration;

/// Everything that can be scheduled on the virtual clock of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum Scheduled {
    /// a continuation of the onboarding
    Step(Step),
    /// an event emitted by the substrate
    Event(NetEvent),
    /// a timer armed by the substrate, handed back to
    /// [`Substrate::on_timer`]
    Timer(u64),
}

/// What a [`Substrate`] may do with the virtual clock.
pub struct SubstrateContext<'a> {
    queue: &'a mut Scheduler<Scheduled>,
}

/// The radio, MAC and IP layers of the simulated network.
///
/// Nothing happens synchronously: the substrate reacts to the orchestrator
/// by scheduling events, timers and onboarding notifications through the
/// [`SubstrateContext`].
pub trait Substrate {
    /// address of the access point
    fn bssid(&self) -> MacAddress;

    /// addresses of the stations, the n-th being [`StationId`] `n`
    fn stations(&self) -> Vec<MacAddress>;

    /// let `station` associate with the access point. The substrate
    /// reports the association with [`SubstrateContext::associated_in`].
    fn associate(&mut self, ctx: &mut SubstrateContext<'_>, station: StationId);

    /// probe the reachability of `station` from the access point every
    /// `interval` during `duration`, establishing the ARP entries and the
    /// block ack agreements on the way
    fn probe(
        &mut self,
        ctx: &mut SubstrateContext<'_>,
        station: StationId,
        duration: Duration,
        interval: Duration,
    );

    /// install the traffic client of `station`; it stays quiet until
    /// [`Substrate::start_clients`]
    fn install_client(
        &mut self,
        ctx: &mut SubstrateContext<'_>,
        station: StationId,
        profile: TrafficProfile,
    );

    fn start_clients(&mut self, ctx: &mut SubstrateContext<'_>);

    /// tear down every traffic client
    fn stop_clients(&mut self, ctx: &mut SubstrateContext<'_>);

    /// bytes received by the application sink of `station` so far
    fn rx_bytes(&self, station: StationId) -> u64;

    /// a timer armed with [`SubstrateContext::wake_in`] expired
    fn on_timer(&mut self, ctx: &mut SubstrateContext<'_>, token: u64);
}

impl<'a> SubstrateContext<'a> {
    pub(crate) fn new(queue: &'a mut Scheduler<Scheduled>) -> Self {
        Self { queue }
    }

    #[inline]
    pub fn now(&self) -> Time {
        self.queue.now()
    }

    /// emit `event` `delay` from now
    pub fn emit_in(&mut self, delay: Duration, event: NetEvent) {
        self.queue.schedule_in(delay, Scheduled::Event(event));
    }

    pub fn emit_now(&mut self, event: NetEvent) {
        self.emit_in(Duration::ZERO, event)
    }

    pub fn wake_in(&mut self, delay: Duration, token: u64) {
        self.queue.schedule_in(delay, Scheduled::Timer(token));
    }

    /// report that `station` associated, receiving `aid`, `delay` from now
    pub fn associated_in(&mut self, delay: Duration, station: StationId, aid: Aid) {
        self.queue
            .schedule_in(delay, Scheduled::Step(Step::Associated { station, aid }));
    }
}

/// the bytes every station received so far, indexed by [`StationId`]
pub fn rx_bytes_of<S>(substrate: &S) -> Vec<u64>
where
    S: Substrate + ?Sized,
{
    (0..substrate.stations().len())
        .map(|n| substrate.rx_bytes(StationId::new(n as u16)))
        .collect()
}
