/*!
# OFDMA statistics engine

Online statistics over the events a Wi-Fi network simulator emits while
an access point schedules DL and UL OFDMA transmissions to its stations.

The [`Engine`] consumes timestamped [`NetEvent`]s (PPDUs forwarded down
to the PHY, MSDUs leaving the AP queue, failures, application sends and
receptions) and incrementally maintains per-station and BSS-wide
[`RunningStat`]s:

* A-MPDU sizes, and the completeness of DL MU PPDUs;
* head-of-line delay at the AP;
* completeness of the HE TB PPDUs solicited by basic trigger frames, and
  the trigger frames no station responded to;
* end-to-end latency of the application packets;
* throughput over the collection window.

```
# use ofdma_stats_core::{Engine, EngineConfig, MacAddress, NetEvent, Time, running_stat::MinTracking};
# use std::time::Duration;
let config = EngineConfig {
    min_payload: 160,
    msdu_lifetime: Duration::from_millis(200),
    min_tracking: MinTracking::Exact,
};
let mut engine = Engine::new(config, [MacAddress::from_sequence(1)]);

engine.start_collection(Time::from_secs(1), |_| 0);
engine.observe(
    Time::from_secs(2),
    &NetEvent::TxFailed { receiver: MacAddress::from_sequence(1) },
);
engine.stop_collection(Time::from_secs(3), |_| 1_000_000);

let report = engine.report();
assert_eq!(report.stations[0].failed, 1);
assert_eq!(report.stations[0].throughput_mbps, 4.0);
```
*/

mod aggregate;
pub mod aggregation;
pub mod config;
pub mod defaults;
mod engine;
pub mod event;
pub mod frame;
mod id;
pub mod latency;
pub mod phy;
mod rate;
pub mod running_stat;
mod station;
pub mod stats;
pub mod time;
pub mod trigger;

pub use self::{
    aggregate::GlobalAggregate,
    aggregation::AggregationEventHandler,
    config::{Config, ConfigError, RunConfig},
    engine::{Collection, Engine, EngineConfig},
    event::{AppPacket, EventStream, NetEvent},
    id::{Aid, MacAddress, MacAddressParseError, PacketUid, StationId},
    latency::LatencyCorrelator,
    rate::{DataRate, DataRateParseError},
    running_stat::RunningStat,
    station::{StationRecord, StationTable},
    stats::Report,
    time::{DurationParseError, Time},
    trigger::TriggerFrameTracker,
};
