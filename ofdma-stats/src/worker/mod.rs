mod command;

use self::command::{Command, CommandReceiver, CommandSender, command_channel};
use crate::StatsSink;
use anyhow::{Context, Result, bail};
use ofdma_stats_core::{Aid, Engine, NetEvent, Report, StationId, Time};
use std::thread::JoinHandle;
use tracing::debug;

/// An [`Engine`] running on its own thread.
///
/// The simulation hands the events over a channel and carries on without
/// waiting for them to be accounted for. Commands are processed in the
/// order they were sent, so the engine sees exactly what a synchronous
/// engine would.
pub struct StatsWorker {
    commands: CommandSender,

    thread: JoinHandle<Result<Engine>>,
}

struct Accountant {
    engine: Engine,

    commands: CommandReceiver,
}

impl StatsWorker {
    pub fn spawn(engine: Engine) -> Result<Self> {
        let (commands, receiver) = command_channel();

        let accountant = Accountant {
            engine,
            commands: receiver,
        };

        let thread = std::thread::Builder::new()
            .name("ofdma-stats".to_owned())
            .spawn(|| accountant_run(accountant))
            .context("Failed to spawn the statistics worker thread")?;

        Ok(Self { commands, thread })
    }

    /// snapshot the statistics accounted for so far
    pub fn report(&mut self) -> Result<Report> {
        self.commands.send_report()
    }

    /// wait for every pending event to be accounted for, and hand back the
    /// engine
    pub fn shutdown(self) -> Result<Engine> {
        let Self { commands, thread } = self;
        // closing the channel is the stop signal
        drop(commands);

        match thread.join() {
            Err(join_error) => {
                bail!("Statistics worker failed to clean shutdown: {join_error:?}")
            }
            Ok(Err(error)) => Err(error).context("Statistics worker failed with error"),
            Ok(Ok(engine)) => Ok(engine),
        }
    }

    pub fn finish(self) -> Result<Report> {
        self.shutdown().map(|engine| engine.report())
    }
}

impl StatsSink for StatsWorker {
    fn associate(&mut self, station: StationId, aid: Aid) -> Result<()> {
        self.commands
            .send_blocking(Command::Associate(station, aid))
            .context("Failed to send association command")
    }

    fn start_collection(&mut self, now: Time, rx_bytes: Vec<u64>) -> Result<()> {
        self.commands
            .send_blocking(Command::Start { now, rx_bytes })
            .context("Failed to send start command")
    }

    fn observe(&mut self, now: Time, event: NetEvent) -> Result<()> {
        self.commands
            .send_blocking(Command::Observe(now, event))
            .context("Failed to send event")
    }

    fn stop_collection(&mut self, now: Time, rx_bytes: Vec<u64>) -> Result<()> {
        self.commands
            .send_blocking(Command::Stop { now, rx_bytes })
            .context("Failed to send stop command")
    }
}

impl Accountant {
    fn inbound(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Associate(station, aid) => {
                StatsSink::associate(&mut self.engine, station, aid)?
            }
            Command::Start { now, rx_bytes } => {
                StatsSink::start_collection(&mut self.engine, now, rx_bytes)?
            }
            Command::Observe(now, event) => StatsSink::observe(&mut self.engine, now, event)?,
            Command::Stop { now, rx_bytes } => {
                StatsSink::stop_collection(&mut self.engine, now, rx_bytes)?
            }
            Command::Report(reply) => {
                let Ok(()) = reply.send(self.engine.report()) else {
                    // the requester gave up waiting, nothing to do
                    return Ok(());
                };
            }
        }
        Ok(())
    }
}

fn accountant_run(mut accountant: Accountant) -> Result<Engine> {
    let mut processed = 0u64;

    // a closed channel means the worker was shut down
    while let Ok(command) = accountant.commands.recv() {
        accountant.inbound(command)?;
        processed += 1;
    }

    debug!(processed, "statistics worker stopped");
    Ok(accountant.engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ofdma_stats_core::{EngineConfig, MacAddress, running_stat::MinTracking};
    use std::time::Duration;

    fn engine() -> Engine {
        let config = EngineConfig {
            min_payload: 160,
            msdu_lifetime: Duration::from_millis(200),
            min_tracking: MinTracking::Exact,
        };
        Engine::new(config, (1..=2).map(MacAddress::from_sequence))
    }

    fn drive(sink: &mut impl StatsSink) {
        sink.associate(StationId::new(0), Aid::new(1)).unwrap();
        sink.associate(StationId::new(1), Aid::new(2)).unwrap();
        sink.start_collection(Time::from_secs(1), vec![0, 100]).unwrap();
        for n in 0..10 {
            let receiver = MacAddress::from_sequence(1 + n % 2);
            sink.observe(Time::from_secs(1) + Duration::from_millis(n), NetEvent::TxFailed {
                receiver,
            })
            .unwrap();
        }
        sink.stop_collection(Time::from_secs(2), vec![1_000_000, 100])
            .unwrap();
    }

    #[test]
    fn same_report_as_the_engine() {
        let mut direct = engine();
        drive(&mut direct);

        let mut worker = StatsWorker::spawn(engine()).unwrap();
        drive(&mut worker);
        let report = worker.finish().unwrap();

        assert_eq!(report, direct.report());
        assert_eq!(report.total_failed(), 10);
        assert_eq!(report.stations[0].throughput_mbps, 8.0);
        assert_eq!(report.stations[1].throughput_mbps, 0.0);
    }

    #[test]
    fn report_while_running() {
        let mut worker = StatsWorker::spawn(engine()).unwrap();
        worker.associate(StationId::new(0), Aid::new(1)).unwrap();
        worker.start_collection(Time::ZERO, vec![0, 0]).unwrap();
        worker
            .observe(Time::from_millis(1), NetEvent::TxFailed {
                receiver: MacAddress::from_sequence(1),
            })
            .unwrap();

        let report = worker.report().unwrap();
        assert_eq!(report.stations[0].failed, 1);
        assert_eq!(report.duration, Duration::ZERO);

        worker.shutdown().unwrap();
    }

    #[test]
    fn engine_panic_is_an_error() {
        let mut worker = StatsWorker::spawn(engine()).unwrap();
        // observing before the collection started is a bug of the caller
        let _ = worker.observe(Time::ZERO, NetEvent::TxFailed {
            receiver: MacAddress::from_sequence(1),
        });

        assert!(worker.shutdown().is_err());
    }
}
