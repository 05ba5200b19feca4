use anyhow::{Context, Result};
use clap::Parser;
use ofdma_stats::{Simulation, StatsWorker, Substrate as _, SyntheticSubstrate, TextReport};
use ofdma_stats_core::{
    Config, DataRate, Engine, EngineConfig, Report, RunConfig, defaults, time::Duration,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Collect the statistics of an OFDMA measurement run over a synthetic
/// BSS
#[derive(Parser)]
#[command(name = "ofdma-stats", version, about)]
struct Command {
    /// application payload size, in bytes
    #[arg(long, default_value_t = defaults::DEFAULT_PAYLOAD_SIZE)]
    payload_size: u32,

    /// duration of the statistics collection (e.g. `2s`, `1s500ms`)
    #[arg(long, default_value = "2s")]
    simulation_time: Duration,

    /// delay between the start of the traffic and the collection
    #[arg(long, default_value = "1s")]
    warmup: Duration,

    /// number of non-AP stations
    #[arg(long, default_value_t = defaults::DEFAULT_STATIONS)]
    stations: u16,

    /// channel width in MHz: 20, 40, 80 or 160
    #[arg(long, default_value_t = defaults::DEFAULT_CHANNEL_WIDTH)]
    channel_width: u16,

    /// guard interval in ns: 800, 1600 or 3200
    #[arg(long, default_value_t = defaults::DEFAULT_GUARD_INTERVAL)]
    guard_interval: u16,

    /// HE MCS, 0 to 11
    #[arg(long, default_value_t = defaults::DEFAULT_MCS)]
    mcs: u8,

    /// maximum number of RUs per DL MU PPDU
    #[arg(long, default_value_t = defaults::DEFAULT_MAX_RUS)]
    max_rus: u8,

    /// acknowledgment sequence after DL MU PPDUs, 1 to 3
    #[arg(long, default_value_t = defaults::DEFAULT_DL_ACK_SEQUENCE)]
    dl_ack_sequence: u8,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    enable_dl_ofdma: bool,

    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    enable_ul_ofdma: bool,

    /// size of the EDCA queue in packets; derived from the PHY rate when
    /// unset
    #[arg(long)]
    mac_queue_size: Option<u32>,

    /// maximum MSDU lifetime; derived from the PHY rate when unset
    #[arg(long)]
    msdu_lifetime: Option<Duration>,

    /// rate of the steady rate clients (e.g. `10mbps`); derived from the
    /// PHY rate when unset
    #[arg(long)]
    data_rate: Option<DataRate>,

    /// reachability verification window of every station
    #[arg(long, default_value = "125ms")]
    ping_duration: Duration,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// report `0` as the minimum of statistics that never went below it
    #[arg(long)]
    legacy_min_sentinel: bool,

    /// account for the events on a dedicated thread
    #[arg(long)]
    threaded: bool,

    /// log every routing decision
    #[arg(short, long)]
    verbose: bool,
}

impl Command {
    fn config(&self) -> Config {
        Config {
            payload_size: self.payload_size,
            simulation_time: self.simulation_time.into_duration(),
            warmup: self.warmup.into_duration(),
            stations: self.stations,
            channel_width: self.channel_width,
            guard_interval: self.guard_interval,
            mcs: self.mcs,
            max_rus: self.max_rus,
            dl_ack_sequence: self.dl_ack_sequence,
            enable_dl_ofdma: self.enable_dl_ofdma,
            enable_ul_ofdma: self.enable_ul_ofdma,
            mac_queue_size: self.mac_queue_size.unwrap_or_default(),
            msdu_lifetime: self.msdu_lifetime.unwrap_or_default().into_duration(),
            data_rate: self.data_rate,
            ping_duration: self.ping_duration.into_duration(),
            seed: self.seed,
            legacy_min_sentinel: self.legacy_min_sentinel,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(run: &RunConfig, threaded: bool) -> Result<Report> {
    let substrate = SyntheticSubstrate::new(run);
    let engine = Engine::new(EngineConfig::from(run), substrate.stations());

    if threaded {
        let worker = StatsWorker::spawn(engine)?;
        let mut simulation = Simulation::new(run, substrate, worker);
        simulation.run()?;
        simulation.into_sink().finish()
    } else {
        let mut simulation = Simulation::new(run, substrate, engine);
        simulation.run()?;
        Ok(simulation.into_sink().report())
    }
}

fn main() -> Result<()> {
    let cmd = Command::parse();
    init_tracing(cmd.verbose);

    let config = cmd.config();
    let run_config = config.resolve().context("Invalid configuration")?;
    info!(
        stations = run_config.stations,
        phy_rate = run_config.phy_rate,
        queue_size = run_config.mac_queue_size,
        msdu_lifetime = ?run_config.msdu_lifetime,
        data_rate = %run_config.data_rate,
        "configuration resolved"
    );

    let report = run(&run_config, cmd.threaded).context("Simulation failed")?;

    print!("{}", TextReport::new(&run_config, &report));
    Ok(())
}
