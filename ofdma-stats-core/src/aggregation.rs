//! Classification and accounting of PPDUs forwarded down to the PHY.

use crate::{
    GlobalAggregate, StationTable, TriggerFrameTracker,
    frame::ForwardedFrame,
    trigger::WindowOutcome,
};
use tracing::{debug, warn};

/// The accounting path a forwarded PPDU takes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameClass {
    /// HE TB PPDU carrying uplink data; holds the ratio of its duration to
    /// the granted duration, if a trigger window was open
    UplinkResponse(Option<f64>),
    /// uplink data that was not solicited by a trigger frame
    UplinkOther,
    /// downlink data, single or multi user
    Downlink,
    /// a basic trigger frame; holds how the previous window was scored
    BasicTrigger(Option<WindowOutcome>),
    /// anything else: not accounted
    Ignored,
}

/// Routes forwarded PPDUs to the downlink, uplink or trigger accounting.
#[derive(Debug, Clone, Default)]
pub struct AggregationEventHandler;

impl AggregationEventHandler {
    pub fn new() -> Self {
        Self
    }

    /// account for a PPDU forwarded down to the PHY.
    ///
    /// The first matching rule wins:
    ///
    /// 1. a single QoS data PSDU addressed to the AP is uplink; it is
    ///    accounted only when sent in an HE TB PPDU;
    /// 2. QoS data in the first PSDU is downlink;
    /// 3. a single trigger frame is handed to the [`TriggerFrameTracker`]
    ///    when it is a basic trigger frame.
    pub fn on_forward_down(
        &self,
        frame: &ForwardedFrame,
        stations: &mut StationTable,
        global: &mut GlobalAggregate,
        triggers: &mut TriggerFrameTracker,
    ) -> FrameClass {
        let Some(first) = frame.psdus.first() else {
            return FrameClass::Ignored;
        };

        if let Some(psdu) = frame.psdus.single()
            && psdu.receiver == frame.bssid
            && psdu.is_qos_data()
        {
            if !frame.tx_vector.preamble.is_trigger_based() {
                return FrameClass::UplinkOther;
            }
            let station = stations.id_of_address(psdu.transmitter);
            let ratio = triggers.on_response(station, frame.tx_duration, stations);
            return FrameClass::UplinkResponse(ratio);
        }

        if first.is_qos_data() {
            self.downlink(frame, stations, global);
            return FrameClass::Downlink;
        }

        if let Some(trigger) = frame.psdus.single().and_then(|psdu| psdu.as_trigger()) {
            if !trigger.is_basic() {
                return FrameClass::Ignored;
            }
            let outcome = triggers.on_basic_trigger(trigger, stations, global);
            return FrameClass::BasicTrigger(outcome);
        }

        FrameClass::Ignored
    }

    fn downlink(
        &self,
        frame: &ForwardedFrame,
        stations: &mut StationTable,
        global: &mut GlobalAggregate,
    ) {
        let mut max_size = 0u64;
        let mut total = 0u64;

        for (_, psdu) in frame.psdus.iter() {
            let size = u64::from(psdu.size);
            max_size = max_size.max(size);
            total += size;

            stations
                .by_address_mut(psdu.receiver)
                .ampdu_size
                .observe(size as f64);
        }

        if frame.tx_vector.preamble.is_dl_multi_user() {
            self.dl_multi_user(frame, max_size, total, stations, global);
        }
    }

    fn dl_multi_user(
        &self,
        frame: &ForwardedFrame,
        max_size: u64,
        total: u64,
        stations: &mut StationTable,
        global: &mut GlobalAggregate,
    ) {
        let tx_vector = &frame.tx_vector;
        let max_possible = max_size * tx_vector.ru_count() as u64;
        if max_possible == 0 {
            warn!(
                rus = tx_vector.ru_count(),
                "DL MU PPDU without RU allocation or payload, not accounted"
            );
            return;
        }

        let completeness = total as f64 / max_possible as f64;
        debug!(completeness, rus = tx_vector.ru_count(), "DL MU PPDU");
        global.dl_mu_completeness.observe(completeness);

        // stations allocated an RU but silent are charged a zero ratio
        for aid in &tx_vector.ru_allocation {
            let size = frame.psdus.get(aid).map_or(0, |psdu| u64::from(psdu.size));
            let ratio = size as f64 / max_size as f64;
            stations.by_aid_mut(*aid).ampdu_ratio.observe(ratio);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Aid, MacAddress, StationId,
        frame::{Preamble, Psdu, PsduMap, TriggerFrame, TxVector},
        running_stat::MinTracking,
    };
    use std::time::Duration;

    const AP: MacAddress = MacAddress::new([0, 0, 0, 0, 0, 0xaa]);

    struct Fixture {
        handler: AggregationEventHandler,
        stations: StationTable,
        global: GlobalAggregate,
        triggers: TriggerFrameTracker,
    }

    impl Fixture {
        fn new() -> Self {
            let mut stations =
                StationTable::new((1..=2).map(MacAddress::from_sequence), MinTracking::Exact);
            stations.associate(StationId::new(0), Aid::new(1));
            stations.associate(StationId::new(1), Aid::new(2));
            Self {
                handler: AggregationEventHandler::new(),
                stations,
                global: GlobalAggregate::new(MinTracking::Exact),
                triggers: TriggerFrameTracker::new(),
            }
        }

        fn forward(&mut self, frame: &ForwardedFrame) -> FrameClass {
            self.handler.on_forward_down(
                frame,
                &mut self.stations,
                &mut self.global,
                &mut self.triggers,
            )
        }

        fn station(&self, id: u16) -> &crate::StationRecord {
            self.stations.get(StationId::new(id))
        }
    }

    fn sta(n: u64) -> MacAddress {
        MacAddress::from_sequence(n)
    }

    fn frame(psdus: PsduMap, tx_vector: TxVector) -> ForwardedFrame {
        ForwardedFrame {
            psdus,
            tx_vector,
            tx_duration: Duration::from_micros(500),
            bssid: AP,
        }
    }

    #[test]
    fn silent_station_is_charged_zero() {
        let mut fixture = Fixture::new();
        let psdus: PsduMap = [(Aid::new(1), Psdu::qos_data(AP, sta(1), 100))]
            .into_iter()
            .collect();
        let frame = frame(
            psdus,
            TxVector::dl_multi_user(vec![Aid::new(1), Aid::new(2)]),
        );

        assert_eq!(fixture.forward(&frame), FrameClass::Downlink);

        let a = fixture.station(0).ampdu_ratio().snapshot();
        let b = fixture.station(1).ampdu_ratio().snapshot();
        assert_eq!((a.count, a.mean), (1, 1.0));
        assert_eq!((b.count, b.mean), (1, 0.0));
        assert_eq!(fixture.global.dl_mu_completeness().mean(), 0.5);

        // only the station that received a PSDU has an A-MPDU size
        assert_eq!(fixture.station(0).ampdu_size().count(), 1);
        assert_eq!(fixture.station(1).ampdu_size().count(), 0);
    }

    #[test]
    fn dl_multi_user_ratios_against_largest_psdu() {
        let mut fixture = Fixture::new();
        let psdus: PsduMap = [
            (Aid::new(1), Psdu::qos_data(AP, sta(1), 400)),
            (Aid::new(2), Psdu::qos_data(AP, sta(2), 100)),
        ]
        .into_iter()
        .collect();
        let frame = frame(
            psdus,
            TxVector::dl_multi_user(vec![Aid::new(1), Aid::new(2)]),
        );

        fixture.forward(&frame);

        assert_eq!(fixture.station(0).ampdu_ratio().mean(), 1.0);
        assert_eq!(fixture.station(1).ampdu_ratio().mean(), 0.25);
        assert_eq!(fixture.global.dl_mu_completeness().mean(), 500.0 / 800.0);
        assert_eq!(fixture.station(0).ampdu_size().snapshot().max, Some(400.0));
    }

    #[test]
    fn dl_multi_user_without_payload_is_not_scored() {
        let mut fixture = Fixture::new();
        let psdus: PsduMap = [
            (Aid::new(1), Psdu::qos_data(AP, sta(1), 0)),
            (Aid::new(2), Psdu::qos_data(AP, sta(2), 0)),
        ]
        .into_iter()
        .collect();
        let frame = frame(
            psdus,
            TxVector::dl_multi_user(vec![Aid::new(1), Aid::new(2)]),
        );

        assert_eq!(fixture.forward(&frame), FrameClass::Downlink);
        assert!(fixture.global.dl_mu_completeness().is_empty());
        assert!(fixture.station(0).ampdu_ratio().is_empty());
        assert!(fixture.station(1).ampdu_ratio().is_empty());
    }

    #[test]
    fn dl_multi_user_without_allocation_is_not_scored() {
        let mut fixture = Fixture::new();
        let psdus: PsduMap = [(Aid::new(1), Psdu::qos_data(AP, sta(1), 100))]
            .into_iter()
            .collect();
        let frame = frame(psdus, TxVector::dl_multi_user(Vec::new()));

        assert_eq!(fixture.forward(&frame), FrameClass::Downlink);
        assert!(fixture.global.dl_mu_completeness().is_empty());
        assert!(fixture.station(0).ampdu_ratio().is_empty());
        // the size is still observed
        assert_eq!(fixture.station(0).ampdu_size().count(), 1);
    }

    #[test]
    fn single_user_downlink_only_counts_sizes() {
        let mut fixture = Fixture::new();
        let frame = frame(
            PsduMap::single_user(Psdu::qos_data(AP, sta(2), 1_500)),
            TxVector::single_user(Preamble::HeSu),
        );

        assert_eq!(fixture.forward(&frame), FrameClass::Downlink);
        assert_eq!(fixture.station(1).ampdu_size().count(), 1);
        assert!(fixture.station(1).ampdu_ratio().is_empty());
        assert!(fixture.global.dl_mu_completeness().is_empty());
    }

    #[test]
    fn uplink_response_goes_to_the_open_window() {
        let mut fixture = Fixture::new();
        let trigger = TriggerFrame::basic(1_000, vec![Aid::new(1), Aid::new(2)]);
        let granted = trigger.granted_duration();

        let trigger_frame = frame(
            PsduMap::single_user(Psdu::trigger(AP, trigger)),
            TxVector::single_user(Preamble::HeSu),
        );
        assert_eq!(fixture.forward(&trigger_frame), FrameClass::BasicTrigger(None));

        let mut response = frame(
            PsduMap::single_user(Psdu::qos_data(sta(1), AP, 300)),
            TxVector::single_user(Preamble::HeTb),
        );
        response.tx_duration = granted;

        assert_eq!(fixture.forward(&response), FrameClass::UplinkResponse(Some(1.0)));
        assert_eq!(fixture.station(0).ul_length_ratio().count(), 1);
        assert_eq!(fixture.station(0).answered_triggers(), 1);
        assert_eq!(fixture.station(0).ampdu_size().count(), 0);
    }

    #[test]
    fn unsolicited_uplink_is_not_accounted() {
        let mut fixture = Fixture::new();
        let frame = frame(
            PsduMap::single_user(Psdu::qos_data(sta(1), AP, 300)),
            TxVector::single_user(Preamble::HeSu),
        );

        assert_eq!(fixture.forward(&frame), FrameClass::UplinkOther);
        assert_eq!(fixture.station(0).ampdu_size().count(), 0);
    }

    #[test]
    fn non_basic_trigger_and_empty_frames_are_ignored() {
        let mut fixture = Fixture::new();
        let mut trigger = TriggerFrame::basic(10, vec![Aid::new(1)]);
        trigger.kind = crate::frame::TriggerKind::MuBar;

        let mu_bar = frame(
            PsduMap::single_user(Psdu::trigger(AP, trigger)),
            TxVector::single_user(Preamble::HeSu),
        );
        assert_eq!(fixture.forward(&mu_bar), FrameClass::Ignored);
        assert_eq!(fixture.global.basic_triggers_sent(), 0);

        let empty = frame(PsduMap::new(), TxVector::single_user(Preamble::HeSu));
        assert_eq!(fixture.forward(&empty), FrameClass::Ignored);
    }
}
