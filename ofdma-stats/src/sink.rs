use anyhow::Result;
use ofdma_stats_core::{Aid, Engine, NetEvent, StationId, Time};

/// Where the collected events go.
///
/// Implemented by the [`Engine`] itself, and by the
/// [`StatsWorker`](crate::StatsWorker) which runs an engine on a
/// dedicated thread.
pub trait StatsSink {
    fn associate(&mut self, station: StationId, aid: Aid) -> Result<()>;

    /// `rx_bytes[n]` is the amount of bytes station `n` received so far
    fn start_collection(&mut self, now: Time, rx_bytes: Vec<u64>) -> Result<()>;

    fn observe(&mut self, now: Time, event: NetEvent) -> Result<()>;

    /// `rx_bytes[n]` is the amount of bytes station `n` received so far
    fn stop_collection(&mut self, now: Time, rx_bytes: Vec<u64>) -> Result<()>;
}

fn received(rx_bytes: &[u64], station: StationId) -> u64 {
    rx_bytes.get(station.index()).copied().unwrap_or_default()
}

impl StatsSink for Engine {
    fn associate(&mut self, station: StationId, aid: Aid) -> Result<()> {
        Engine::associate(self, station, aid);
        Ok(())
    }

    fn start_collection(&mut self, now: Time, rx_bytes: Vec<u64>) -> Result<()> {
        Engine::start_collection(self, now, |station| received(&rx_bytes, station));
        Ok(())
    }

    fn observe(&mut self, now: Time, event: NetEvent) -> Result<()> {
        Engine::observe(self, now, &event);
        Ok(())
    }

    fn stop_collection(&mut self, now: Time, rx_bytes: Vec<u64>) -> Result<()> {
        Engine::stop_collection(self, now, |station| received(&rx_bytes, station));
        Ok(())
    }
}
