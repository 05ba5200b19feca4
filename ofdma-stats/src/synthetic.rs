//! A deterministic, self-contained stand-in for the network simulator.
//!
//! The access point serves the stations in rounds. Every round it
//! generates the application traffic of the installed clients, drops the
//! MSDUs that outlived their lifetime, sends one DL PPDU (multi-user when
//! DL OFDMA is enabled and several stations have data), then optionally
//! solicits the stations with a basic trigger frame. All the randomness
//! (association delays, losses, silent RUs, trigger responses) comes from
//! a single [`ChaChaRng`] seeded from the run configuration: the same seed
//! produces the same events.

use crate::{Substrate, SubstrateContext, TrafficProfile};
use ofdma_stats_core::{
    Aid, AppPacket, MacAddress, NetEvent, PacketUid, StationId, Time,
    config::RunConfig,
    frame::{ForwardedFrame, MsduItem, Preamble, Psdu, PsduMap, TriggerFrame, TxVector},
    phy::MAX_HE_SU_PPDU_DURATION,
};
use rand_chacha::ChaChaRng;
use rand_core::{Rng, SeedableRng as _};
use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};
use tracing::{debug, trace};

const SIFS: Duration = Duration::from_micros(16);
const AIFS: Duration = Duration::from_micros(43);
const SLOT: Duration = Duration::from_micros(9);
const CW_MIN: u64 = 15;
const PREAMBLE: Duration = Duration::from_micros(40);
const BLOCK_ACK: Duration = Duration::from_micros(68);
const TRIGGER_DURATION: Duration = Duration::from_micros(100);
/// how long an idle AP waits before checking its queues again
const IDLE_POLL: Duration = Duration::from_millis(1);

/// size of the echo requests of the reachability probe; below any sensible
/// payload size, so never correlated for latency
const PROBE_SIZE: u32 = 84;
const PROBE_RTT: Duration = Duration::from_micros(800);
/// bulk transfer clients keep at most this many packets queued at the AP
const BULK_BACKLOG: usize = 64;
const UL_LENGTH_RANGE: (u64, u64) = (400, 2_000);
const UL_RESPONSE_SIZE: (u64, u64) = (64, 1_500);
const ASSOCIATION_DELAY_MICROS: (u64, u64) = (1_000, 5_000);

const TXOP_TIMER: u64 = 0;

/// Probabilities of the anomalies the synthetic network produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anomalies {
    /// a PSDU of a DL PPDU is not acknowledged
    pub dl_loss: f64,
    /// a station without buffered data is allocated an RU anyway
    pub silent_ru: f64,
    /// an addressed station responds to a basic trigger frame
    pub ul_response: f64,
}

impl Default for Anomalies {
    fn default() -> Self {
        Self {
            dl_loss: 0.05,
            silent_ru: 0.1,
            ul_response: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Client {
    profile: TrafficProfile,
    sent_bytes: u64,
    /// fraction of a packet the steady rate client owes
    credit: f64,
}

#[derive(Debug, Clone, Copy)]
struct Queued {
    uid: PacketUid,
    size: u32,
    enqueued_at: Time,
}

pub struct SyntheticSubstrate {
    bssid: MacAddress,
    addresses: Vec<MacAddress>,
    aids: Vec<Option<Aid>>,
    rng: ChaChaRng,
    anomalies: Anomalies,

    phy_rate: u64,
    max_rus: usize,
    dl_ofdma: bool,
    ul_ofdma: bool,
    msdu_lifetime: Duration,
    queue_capacity: usize,

    clients: Vec<Option<Client>>,
    queues: Vec<VecDeque<Queued>>,
    rx_bytes: Vec<u64>,
    /// bytes in flight, credited to the station when the timer expires
    deliveries: HashMap<u64, (usize, u64)>,
    next_token: u64,
    next_uid: PacketUid,
    next_dl: usize,
    next_ul: usize,

    running: bool,
    last_round: Time,
}

impl SyntheticSubstrate {
    pub fn new(run: &RunConfig) -> Self {
        Self::with_anomalies(run, Anomalies::default())
    }

    pub fn with_anomalies(run: &RunConfig, anomalies: Anomalies) -> Self {
        let stations = usize::from(run.stations);

        Self {
            bssid: MacAddress::from_sequence(0),
            addresses: (1..=stations as u64).map(MacAddress::from_sequence).collect(),
            aids: vec![None; stations],
            rng: ChaChaRng::seed_from_u64(run.seed),
            anomalies,
            phy_rate: run.phy_rate,
            max_rus: usize::from(run.max_rus),
            dl_ofdma: run.enable_dl_ofdma,
            ul_ofdma: run.enable_ul_ofdma,
            msdu_lifetime: run.msdu_lifetime,
            queue_capacity: run.mac_queue_size as usize,
            clients: vec![None; stations],
            queues: vec![VecDeque::new(); stations],
            rx_bytes: vec![0; stations],
            deliveries: HashMap::new(),
            next_token: TXOP_TIMER + 1,
            next_uid: PacketUid::new(0),
            next_dl: 0,
            next_ul: 0,
            running: false,
            last_round: Time::ZERO,
        }
    }

    fn chance(&mut self, probability: f64) -> bool {
        let sample = (self.rng.next_u64() as f64) * (1.0 / (u64::MAX as f64 + 1.0));
        sample < probability
    }

    /// uniform in `[low, high]`
    fn uniform(&mut self, (low, high): (u64, u64)) -> u64 {
        low + self.rng.next_u64() % (high - low + 1)
    }

    fn station(index: usize) -> StationId {
        StationId::new(index as u16)
    }

    fn queued(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    fn next_uid(&mut self) -> PacketUid {
        let uid = self.next_uid;
        self.next_uid = uid.next();
        uid
    }

    /// hand a packet of `size` bytes for `index` to the AP's MAC
    fn send(&mut self, ctx: &mut SubstrateContext<'_>, index: usize, size: u32) {
        let uid = self.next_uid();
        ctx.emit_now(NetEvent::AppTx(AppPacket { uid, size }));

        // a full queue drops the packet: it is never received
        if self.queued() < self.queue_capacity {
            self.queues[index].push_back(Queued {
                uid,
                size,
                enqueued_at: ctx.now(),
            });
        }
    }

    fn generate_traffic(&mut self, ctx: &mut SubstrateContext<'_>) {
        let elapsed = ctx.now().saturating_duration_since(self.last_round);
        self.last_round = ctx.now();

        for index in 0..self.clients.len() {
            let Some(mut client) = self.clients[index] else {
                continue;
            };

            match client.profile {
                TrafficProfile::SteadyRate {
                    rate, packet_size, ..
                } => {
                    client.credit += rate.bits_per_sec() as f64 * elapsed.as_secs_f64()
                        / 8.0
                        / f64::from(packet_size);
                    while client.credit >= 1.0 {
                        client.credit -= 1.0;
                        client.sent_bytes += u64::from(packet_size);
                        self.send(ctx, index, packet_size);
                    }
                }
                TrafficProfile::BulkTransfer {
                    send_size,
                    max_bytes,
                    ..
                } => {
                    while client.sent_bytes < max_bytes
                        && self.queues[index].len() < BULK_BACKLOG
                        && self.queued() < self.queue_capacity
                    {
                        let size = (max_bytes - client.sent_bytes).min(u64::from(send_size));
                        client.sent_bytes += size;
                        self.send(ctx, index, size as u32);
                    }
                }
            }

            self.clients[index] = Some(client);
        }
    }

    fn expire(&mut self, ctx: &mut SubstrateContext<'_>) {
        let now = ctx.now();
        for (index, queue) in self.queues.iter_mut().enumerate() {
            while let Some(head) = queue.front()
                && now.saturating_duration_since(head.enqueued_at) > self.msdu_lifetime
            {
                let Some(head) = queue.pop_front() else {
                    break;
                };
                ctx.emit_now(NetEvent::Expired(MsduItem {
                    receiver: self.addresses[index],
                    uid: head.uid,
                    size: head.size,
                    enqueued_at: head.enqueued_at,
                }));
            }
        }
    }

    /// pick the stations served by the next DL PPDU, round robin
    fn allocate(&mut self) -> Vec<usize> {
        let n = self.queues.len();
        let max = if self.dl_ofdma { self.max_rus } else { 1 };

        let mut selected = Vec::with_capacity(max);
        for offset in 0..n {
            let index = (self.next_dl + offset) % n;
            if !self.queues[index].is_empty() {
                selected.push(index);
                if selected.len() == max {
                    break;
                }
            }
        }
        if let Some(last) = selected.last() {
            self.next_dl = (last + 1) % n;
        }

        // an RU may be handed to an associated station with nothing to receive
        if selected.len() > 1 && selected.len() < max && self.chance(self.anomalies.silent_ru) {
            if let Some(idle) = (0..n).find(|index| {
                self.queues[*index].is_empty() && self.aids[*index].is_some()
            }) {
                selected.push(idle);
            }
        }
        selected
    }

    /// returns how long the AP occupied the medium
    fn downlink(&mut self, ctx: &mut SubstrateContext<'_>) -> Duration {
        let selected = self.allocate();
        if selected.is_empty() {
            return Duration::ZERO;
        }
        let multi_user = selected.len() > 1;

        let ppdu_bytes = self.phy_rate * MAX_HE_SU_PPDU_DURATION.as_micros() as u64 / 8 / 1_000_000;
        let ru_bytes = ppdu_bytes / selected.len() as u64;

        // MSDUs of every PSDU, dequeued head first
        let mut psdus: Vec<(usize, Vec<Queued>)> = Vec::with_capacity(selected.len());
        for &index in &selected {
            let mut msdus = Vec::new();
            let mut bytes = 0u64;
            while let Some(head) = self.queues[index].front()
                && (msdus.is_empty() || bytes + u64::from(head.size) <= ru_bytes)
            {
                let Some(head) = self.queues[index].pop_front() else {
                    break;
                };
                bytes += u64::from(head.size);
                ctx.emit_now(NetEvent::Dequeue(MsduItem {
                    receiver: self.addresses[index],
                    uid: head.uid,
                    size: head.size,
                    enqueued_at: head.enqueued_at,
                }));
                msdus.push(head);
            }
            psdus.push((index, msdus));
        }

        let largest = psdus
            .iter()
            .map(|(_, msdus)| msdus.iter().map(|m| u64::from(m.size)).sum::<u64>())
            .max()
            .unwrap_or_default();
        let ru_rate = (self.phy_rate / selected.len() as u64).max(1);
        // a single MSDU larger than its RU stretches the PPDU
        let tx_duration = PREAMBLE + Duration::from_nanos(largest * 8 * 1_000_000_000 / ru_rate);

        let mut map = PsduMap::new();
        let mut allocation = Vec::with_capacity(psdus.len());
        for (index, msdus) in &psdus {
            let aid = self.aids[*index].unwrap_or(Aid::SU);
            let size: u64 = msdus.iter().map(|m| u64::from(m.size)).sum();
            allocation.push(aid);
            if size == 0 {
                continue;
            }
            let psdu = Psdu::qos_data(self.bssid, self.addresses[*index], size as u32);
            if multi_user {
                map.insert(aid, psdu);
            } else {
                map = PsduMap::single_user(psdu);
            }
        }
        let tx_vector = if multi_user {
            TxVector::dl_multi_user(allocation)
        } else {
            TxVector::single_user(Preamble::HeSu)
        };
        trace!(stations = psdus.len(), ?tx_duration, "DL PPDU");
        ctx.emit_now(NetEvent::ForwardDown(ForwardedFrame {
            psdus: map,
            tx_vector,
            tx_duration,
            bssid: self.bssid,
        }));

        let acked = tx_duration + SIFS + BLOCK_ACK;
        for (index, msdus) in psdus {
            if msdus.is_empty() {
                continue;
            }
            if self.chance(self.anomalies.dl_loss) {
                ctx.emit_in(
                    acked,
                    NetEvent::TxFailed {
                        receiver: self.addresses[index],
                    },
                );
                continue;
            }

            let station = Self::station(index);
            let mut bytes = 0;
            for msdu in msdus {
                bytes += u64::from(msdu.size);
                let packet = AppPacket {
                    uid: msdu.uid,
                    size: msdu.size,
                };
                ctx.emit_in(tx_duration, NetEvent::AppRx { packet, station });
            }
            let token = self.next_token;
            self.next_token += 1;
            self.deliveries.insert(token, (index, bytes));
            ctx.wake_in(tx_duration, token);
        }

        acked
    }

    /// returns how long the trigger frame exchange lasted
    fn uplink(&mut self, ctx: &mut SubstrateContext<'_>, after: Duration) -> Duration {
        let n = self.aids.len();
        let addressed: Vec<usize> = (0..n)
            .map(|offset| (self.next_ul + offset) % n)
            .filter(|index| self.aids[*index].is_some())
            .take(self.max_rus)
            .collect();
        let Some(last) = addressed.last() else {
            return Duration::ZERO;
        };
        self.next_ul = (last + 1) % n;

        let ul_length = self.uniform(UL_LENGTH_RANGE) as u16;
        let user_info = addressed
            .iter()
            .filter_map(|index| self.aids[*index])
            .collect();
        let trigger = TriggerFrame::basic(ul_length, user_info);
        let granted = trigger.granted_duration();

        ctx.emit_in(
            after,
            NetEvent::ForwardDown(ForwardedFrame {
                psdus: PsduMap::single_user(Psdu::trigger(self.bssid, trigger)),
                tx_vector: TxVector::single_user(Preamble::NonHt),
                tx_duration: TRIGGER_DURATION,
                bssid: self.bssid,
            }),
        );

        let responses_at = after + TRIGGER_DURATION + SIFS;
        for index in addressed {
            if !self.chance(self.anomalies.ul_response) {
                continue;
            }
            // padding shortens some HE TB PPDUs below the granted duration
            let fill = if self.chance(0.5) { 1.0 } else { 0.5 };
            let size = self.uniform(UL_RESPONSE_SIZE) as u32;
            ctx.emit_in(
                responses_at,
                NetEvent::ForwardDown(ForwardedFrame {
                    psdus: PsduMap::single_user(Psdu::qos_data(
                        self.addresses[index],
                        self.bssid,
                        size,
                    )),
                    tx_vector: TxVector::single_user(Preamble::HeTb),
                    tx_duration: granted.mul_f64(fill),
                    bssid: self.bssid,
                }),
            );
        }

        TRIGGER_DURATION + SIFS + granted + SIFS + BLOCK_ACK
    }

    fn round(&mut self, ctx: &mut SubstrateContext<'_>) {
        if !self.running {
            return;
        }

        self.generate_traffic(ctx);
        self.expire(ctx);

        let start = ctx.now();
        let dl = self.downlink(ctx);
        let ul = if self.ul_ofdma {
            self.uplink(ctx, dl + SIFS)
        } else {
            Duration::ZERO
        };

        let txop = if ul.is_zero() { dl } else { dl + SIFS + ul };
        if txop.is_zero() {
            ctx.wake_in(IDLE_POLL, TXOP_TIMER);
            return;
        }
        ctx.emit_in(txop, NetEvent::Txop { start, duration: txop });

        let backoff = AIFS + SLOT * self.uniform((0, CW_MIN)) as u32;
        ctx.wake_in(txop + backoff, TXOP_TIMER);
    }
}

impl Substrate for SyntheticSubstrate {
    fn bssid(&self) -> MacAddress {
        self.bssid
    }

    fn stations(&self) -> Vec<MacAddress> {
        self.addresses.clone()
    }

    fn associate(&mut self, ctx: &mut SubstrateContext<'_>, station: StationId) {
        let aid = Aid::new(station.index() as u16 + 1);
        self.aids[station.index()] = Some(aid);

        let delay = Duration::from_micros(self.uniform(ASSOCIATION_DELAY_MICROS));
        debug!(%station, %aid, ?delay, "association");
        ctx.associated_in(delay, station, aid);
    }

    fn probe(
        &mut self,
        ctx: &mut SubstrateContext<'_>,
        station: StationId,
        duration: Duration,
        interval: Duration,
    ) {
        let mut at = Duration::ZERO;
        while at < duration {
            let packet = AppPacket {
                uid: self.next_uid(),
                size: PROBE_SIZE,
            };
            ctx.emit_in(at, NetEvent::AppTx(packet));
            ctx.emit_in(at + PROBE_RTT, NetEvent::AppRx { packet, station });
            at += interval;
        }
    }

    fn install_client(
        &mut self,
        _ctx: &mut SubstrateContext<'_>,
        station: StationId,
        profile: TrafficProfile,
    ) {
        self.clients[station.index()] = Some(Client {
            profile,
            sent_bytes: 0,
            credit: 0.0,
        });
    }

    fn start_clients(&mut self, ctx: &mut SubstrateContext<'_>) {
        self.running = true;
        self.last_round = ctx.now();
        ctx.wake_in(Duration::ZERO, TXOP_TIMER);
    }

    fn stop_clients(&mut self, _ctx: &mut SubstrateContext<'_>) {
        self.running = false;
        self.clients.fill(None);
    }

    fn rx_bytes(&self, station: StationId) -> u64 {
        self.rx_bytes[station.index()]
    }

    fn on_timer(&mut self, ctx: &mut SubstrateContext<'_>, token: u64) {
        if token == TXOP_TIMER {
            self.round(ctx);
        } else if let Some((index, bytes)) = self.deliveries.remove(&token) {
            self.rx_bytes[index] += bytes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Scheduled, Scheduler};
    use ofdma_stats_core::Config;

    fn run_config(seed: u64) -> RunConfig {
        Config {
            stations: 4,
            enable_ul_ofdma: true,
            seed,
            ..Config::default()
        }
        .resolve()
        .unwrap()
    }

    /// associate and install every station, then let the traffic flow for
    /// `duration`; returns every event emitted
    fn traffic(seed: u64, duration: Duration) -> Vec<(Time, NetEvent)> {
        let run = run_config(seed);
        let mut substrate = SyntheticSubstrate::new(&run);
        let mut queue = Scheduler::new();
        let mut ctx = SubstrateContext::new(&mut queue);

        for n in 0..run.stations {
            let station = StationId::new(n);
            substrate.associate(&mut ctx, station);
            let profile = TrafficProfile::for_station(station, &run);
            substrate.install_client(&mut ctx, station, profile);
        }
        substrate.start_clients(&mut ctx);

        let mut events = Vec::new();
        while let Some((now, item)) = queue.pop() {
            if now > Time::ZERO + duration {
                break;
            }
            match item {
                Scheduled::Event(event) => events.push((now, event)),
                Scheduled::Timer(token) => {
                    substrate.on_timer(&mut SubstrateContext::new(&mut queue), token)
                }
                Scheduled::Step(_) => (),
            }
        }
        events
    }

    #[test]
    fn same_seed_same_events() {
        let a = traffic(7, Duration::from_millis(50));
        let b = traffic(7, Duration::from_millis(50));
        assert!(!a.is_empty());
        assert_eq!(a, b);

        let c = traffic(8, Duration::from_millis(50));
        assert_ne!(a, c);
    }

    #[test]
    fn emits_every_stream() {
        let events = traffic(1, Duration::from_millis(500));
        let has = |check: fn(&NetEvent) -> bool| events.iter().any(|(_, event)| check(event));

        assert!(has(|e| matches!(e, NetEvent::AppTx(_))));
        assert!(has(|e| matches!(e, NetEvent::AppRx { .. })));
        assert!(has(|e| matches!(e, NetEvent::Dequeue(_))));
        assert!(has(|e| matches!(e, NetEvent::Txop { .. })));
        assert!(has(|e| matches!(e, NetEvent::TxFailed { .. })));
        assert!(has(|e| match e {
            NetEvent::ForwardDown(frame) => frame.tx_vector.preamble == Preamble::HeMu,
            _ => false,
        }));
        assert!(has(|e| match e {
            NetEvent::ForwardDown(frame) => frame.tx_vector.preamble == Preamble::HeTb,
            _ => false,
        }));
    }

    #[test]
    fn events_never_go_back_in_time() {
        let events = traffic(3, Duration::from_millis(100));
        assert!(events.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    }
}
