//! Subscription of the statistics to the substrate's event streams.

use crate::StatsSink;
use anyhow::Result;
use ofdma_stats_core::{EventStream, NetEvent, Time};
use std::collections::BTreeSet;
use tracing::debug;

/// Forwards the events of the connected streams to a [`StatsSink`], and
/// drops the others.
///
/// Disconnecting is exact: once [`EventBus::disconnect`] returned, no
/// event of that stream reaches the sink, even if it was emitted at the
/// very same virtual time.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    connected: BTreeSet<EventStream>,
    delivered: u64,
    dropped: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, stream: EventStream) {
        if self.connected.insert(stream) {
            debug!(%stream, "trace connected");
        }
    }

    pub fn disconnect(&mut self, stream: EventStream) {
        if self.connected.remove(&stream) {
            debug!(%stream, "trace disconnected");
        }
    }

    pub fn connect_all(&mut self) {
        for stream in EventStream::ALL {
            self.connect(stream);
        }
    }

    pub fn disconnect_all(&mut self) {
        for stream in EventStream::ALL {
            self.disconnect(stream);
        }
    }

    pub fn is_connected(&self, stream: EventStream) -> bool {
        self.connected.contains(&stream)
    }

    /// events handed to the sink so far
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// events emitted while their stream was not connected
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// hand `event` to `sink` if its stream is connected. Returns whether
    /// the event was delivered.
    pub fn publish<K>(&mut self, now: Time, event: NetEvent, sink: &mut K) -> Result<bool>
    where
        K: StatsSink + ?Sized,
    {
        if !self.is_connected(event.stream()) {
            self.dropped += 1;
            return Ok(false);
        }

        sink.observe(now, event)?;
        self.delivered += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofdma_stats_core::{Aid, MacAddress, StationId};

    #[derive(Default)]
    struct Recorder(Vec<(Time, NetEvent)>);

    impl StatsSink for Recorder {
        fn associate(&mut self, _: StationId, _: Aid) -> Result<()> {
            Ok(())
        }
        fn start_collection(&mut self, _: Time, _: Vec<u64>) -> Result<()> {
            Ok(())
        }
        fn observe(&mut self, now: Time, event: NetEvent) -> Result<()> {
            self.0.push((now, event));
            Ok(())
        }
        fn stop_collection(&mut self, _: Time, _: Vec<u64>) -> Result<()> {
            Ok(())
        }
    }

    fn failure() -> NetEvent {
        NetEvent::TxFailed {
            receiver: MacAddress::from_sequence(1),
        }
    }

    #[test]
    fn only_connected_streams_are_delivered() {
        let mut bus = EventBus::new();
        let mut sink = Recorder::default();

        assert!(!bus.publish(Time::ZERO, failure(), &mut sink).unwrap());

        bus.connect(EventStream::TxFailed);
        assert!(bus.publish(Time::from_millis(1), failure(), &mut sink).unwrap());

        let txop = NetEvent::Txop {
            start: Time::ZERO,
            duration: std::time::Duration::from_millis(1),
        };
        assert!(!bus.publish(Time::from_millis(2), txop, &mut sink).unwrap());

        assert_eq!(sink.0, vec![(Time::from_millis(1), failure())]);
        assert_eq!(bus.delivered(), 1);
        assert_eq!(bus.dropped(), 2);
    }

    #[test]
    fn disconnect_is_exact() {
        let mut bus = EventBus::new();
        let mut sink = Recorder::default();
        let now = Time::from_secs(3);

        bus.connect_all();
        assert!(bus.publish(now, failure(), &mut sink).unwrap());
        bus.disconnect_all();
        assert!(!bus.publish(now, failure(), &mut sink).unwrap());

        for stream in EventStream::ALL {
            assert!(!bus.is_connected(stream));
        }
        assert_eq!(sink.0.len(), 1);
    }
}
