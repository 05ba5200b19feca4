use anyhow::{Context, Result, anyhow};
use ofdma_stats_core::{Aid, NetEvent, Report, StationId, Time};
use std::sync::mpsc::{Receiver, RecvError, SyncSender, TrySendError, sync_channel};

pub(crate) enum Command {
    Associate(StationId, Aid),
    Start { now: Time, rx_bytes: Vec<u64> },
    Observe(Time, NetEvent),
    Stop { now: Time, rx_bytes: Vec<u64> },
    Report(SyncSender<Report>),
}

pub(crate) struct CommandSender(SyncSender<Command>);

pub(crate) struct CommandReceiver(Receiver<Command>);

pub(crate) fn command_channel() -> (CommandSender, CommandReceiver) {
    let (sender, receiver) = sync_channel(1_024 * 1_024);

    (CommandSender(sender), CommandReceiver(receiver))
}

impl CommandSender {
    pub(crate) fn send(&mut self, command: Command) -> Result<(), TrySendError<Command>> {
        self.0.try_send(command)
    }

    /// like [`CommandSender::send`] but waits for room in the channel
    /// instead of failing when the worker falls behind
    pub(crate) fn send_blocking(&mut self, command: Command) -> Result<()> {
        match self.send(command) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(command)) => self
                .0
                .send(command)
                .map_err(|_| anyhow!("Statistics worker stopped")),
            Err(TrySendError::Disconnected(_)) => Err(anyhow!("Statistics worker stopped")),
        }
    }

    pub(crate) fn send_report(&mut self) -> Result<Report> {
        let (reply, answer) = sync_channel(1);

        self.send_blocking(Command::Report(reply))
            .context("Failed to send report command")?;

        answer
            .recv()
            .context("Failed to receive the report from the statistics worker.")
    }
}

impl CommandReceiver {
    pub(crate) fn recv(&mut self) -> Result<Command, RecvError> {
        self.0.recv()
    }
}
