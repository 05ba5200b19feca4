//! Basic trigger frame accounting.
//!
//! Each basic trigger frame opens an accounting window. The HE TB PPDUs
//! sent in response are attributed to the open window, and the window is
//! scored when the next basic trigger frame goes out. The window open at
//! the end of the run is never scored.

use crate::{GlobalAggregate, StationTable, frame::TriggerFrame, id::StationId};
use std::time::Duration;
use tracing::{debug, warn};

/// The accounting window of one basic trigger frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrigWindow {
    /// uplink duration granted to each addressed station
    pub granted: Duration,
    pub stations: Vec<StationId>,
    /// sum of the durations of the responses received so far
    pub responded: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum TrackerState {
    /// no basic trigger frame sent yet
    #[default]
    Idle,
    WindowOpen(TrigWindow),
}

/// How a window was scored when it closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowOutcome {
    /// no station responded
    Failed,
    /// ratio of the responded duration to the overall granted duration
    Completed(f64),
}

#[derive(Debug, Clone, Default)]
pub struct TriggerFrameTracker {
    state: TrackerState,
}

impl TrigWindow {
    /// duration granted to all the addressed stations together
    pub fn overall_granted(&self) -> Duration {
        self.granted * self.stations.len() as u32
    }
}

impl TriggerFrameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_window(&self) -> Option<&TrigWindow> {
        match &self.state {
            TrackerState::Idle => None,
            TrackerState::WindowOpen(window) => Some(window),
        }
    }

    /// a basic trigger frame went out: score the previous window and
    /// open a new one. Returns how the previous window was scored, if
    /// there was one.
    pub fn on_basic_trigger(
        &mut self,
        trigger: &TriggerFrame,
        stations: &mut StationTable,
        global: &mut GlobalAggregate,
    ) -> Option<WindowOutcome> {
        debug_assert!(trigger.is_basic());

        let outcome = match std::mem::take(&mut self.state) {
            TrackerState::Idle => None,
            TrackerState::WindowOpen(window) => Some(close(window, global)),
        };

        global.basic_triggers_sent += 1;

        let window = TrigWindow {
            granted: trigger.granted_duration(),
            stations: trigger
                .user_info
                .iter()
                .map(|aid| stations.id_of_aid(*aid))
                .collect(),
            responded: Duration::ZERO,
        };
        for station in &window.stations {
            stations.get_mut(*station).solicited_triggers += 1;
        }
        debug!(
            granted = ?window.granted,
            addressed = window.stations.len(),
            "trigger window opened"
        );
        self.state = TrackerState::WindowOpen(window);

        outcome
    }

    /// an HE TB PPDU of `duration` was sent by `station`. Returns the
    /// ratio of that duration to the duration granted to the station.
    ///
    /// Concurrent responses to the same trigger each add their own
    /// duration to the window.
    pub fn on_response(
        &mut self,
        station: StationId,
        duration: Duration,
        stations: &mut StationTable,
    ) -> Option<f64> {
        let TrackerState::WindowOpen(window) = &mut self.state else {
            warn!(%station, "HE TB PPDU without a preceding basic trigger frame");
            return None;
        };
        if window.granted.is_zero() {
            warn!(%station, "HE TB PPDU solicited with a zero UL Length");
            return None;
        }
        window.responded += duration;

        let ratio = duration.as_nanos() as f64 / window.granted.as_nanos() as f64;
        let record = stations.get_mut(station);
        record.ul_length_ratio.observe(ratio);
        record.answered_triggers += 1;
        Some(ratio)
    }
}

/// A window that granted nothing cannot be scored: it counts as failed,
/// like a window nobody responded to.
fn close(window: TrigWindow, global: &mut GlobalAggregate) -> WindowOutcome {
    let overall = window.overall_granted();
    if window.responded.is_zero() || overall.is_zero() {
        global.failed_triggers += 1;
        debug!(granted = ?overall, "trigger window closed without a response");
        return WindowOutcome::Failed;
    }

    let ratio = window.responded.as_nanos() as f64 / overall.as_nanos() as f64;

    // windows scored so far: every trigger sent but this one (still
    // counted in `basic_triggers_sent`) and the failed ones
    debug_assert_eq!(
        global.he_tb_completeness.count(),
        global.basic_triggers_sent - 1 - global.failed_triggers,
    );
    global.he_tb_completeness.observe(ratio);

    WindowOutcome::Completed(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Aid, MacAddress, running_stat::MinTracking};

    fn setup() -> (TriggerFrameTracker, StationTable, GlobalAggregate) {
        let mut stations =
            StationTable::new((1..=2).map(MacAddress::from_sequence), MinTracking::Exact);
        stations.associate(StationId::new(0), Aid::new(1));
        stations.associate(StationId::new(1), Aid::new(2));
        (
            TriggerFrameTracker::new(),
            stations,
            GlobalAggregate::new(MinTracking::Exact),
        )
    }

    fn trigger() -> TriggerFrame {
        TriggerFrame::basic(1_000, vec![Aid::new(1), Aid::new(2)])
    }

    #[test]
    fn first_trigger_closes_nothing() {
        let (mut tracker, mut stations, mut global) = setup();

        let outcome = tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);

        assert_eq!(outcome, None);
        assert_eq!(global.basic_triggers_sent(), 1);
        assert_eq!(global.failed_triggers(), 0);
        assert_eq!(stations.get(StationId::new(0)).solicited_triggers(), 1);
        assert_eq!(stations.get(StationId::new(1)).solicited_triggers(), 1);
        assert_eq!(
            tracker.open_window().map(TrigWindow::overall_granted),
            Some(Duration::from_micros(2 * 1_360))
        );
    }

    #[test]
    fn unanswered_then_answered_window() {
        let (mut tracker, mut stations, mut global) = setup();
        let granted = trigger().granted_duration();

        // window 1: nobody answers
        tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);

        // window 2: everyone answers with the full granted duration
        let outcome = tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);
        assert_eq!(outcome, Some(WindowOutcome::Failed));
        for station in [StationId::new(0), StationId::new(1)] {
            let ratio = tracker.on_response(station, granted, &mut stations);
            assert_eq!(ratio, Some(1.0));
        }

        // closing window 2
        let outcome = tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);
        assert_eq!(outcome, Some(WindowOutcome::Completed(1.0)));

        assert_eq!(global.failed_triggers(), 1);
        assert_eq!(global.basic_triggers_sent(), 3);
        assert_eq!(global.he_tb_completeness().count(), 1);
        assert_eq!(global.he_tb_completeness().mean(), 1.0);
    }

    #[test]
    fn partial_response_ratio() {
        let (mut tracker, mut stations, mut global) = setup();
        let granted = trigger().granted_duration();

        tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);
        let ratio = tracker.on_response(StationId::new(1), granted / 2, &mut stations);
        assert_eq!(ratio, Some(0.5));

        let outcome = tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);
        // half of one of two grants
        assert_eq!(outcome, Some(WindowOutcome::Completed(0.25)));

        let responder = stations.get(StationId::new(1));
        assert_eq!(responder.answered_triggers(), 1);
        assert_eq!(responder.solicited_triggers(), 2);
        assert_eq!(stations.get(StationId::new(0)).answered_triggers(), 0);
    }

    #[test]
    fn response_without_window_is_ignored() {
        let (mut tracker, mut stations, _) = setup();
        let ratio = tracker.on_response(StationId::new(0), Duration::from_micros(100), &mut stations);

        assert_eq!(ratio, None);
        assert!(stations.get(StationId::new(0)).ul_length_ratio().is_empty());
    }

    #[test]
    fn zero_grant_response_is_not_accounted() {
        let (mut tracker, mut stations, mut global) = setup();
        tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);
        tracker.state = TrackerState::WindowOpen(TrigWindow {
            granted: Duration::ZERO,
            stations: vec![StationId::new(0), StationId::new(1)],
            responded: Duration::ZERO,
        });

        let ratio =
            tracker.on_response(StationId::new(0), Duration::from_micros(300), &mut stations);

        assert_eq!(ratio, None);
        let record = stations.get(StationId::new(0));
        assert!(record.ul_length_ratio().is_empty());
        assert_eq!(record.answered_triggers(), 0);
        assert_eq!(
            tracker.open_window().map(|window| window.responded),
            Some(Duration::ZERO)
        );

        // nothing was attributed, so the window fails instead of scoring 0.0
        let outcome = tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);
        assert_eq!(outcome, Some(WindowOutcome::Failed));
        assert_eq!(global.failed_triggers(), 1);
        assert!(global.he_tb_completeness().is_empty());
    }

    #[test]
    fn window_addressing_nobody_fails() {
        let (mut tracker, mut stations, mut global) = setup();
        let nobody = TriggerFrame::basic(1_000, Vec::new());

        tracker.on_basic_trigger(&nobody, &mut stations, &mut global);
        let ratio =
            tracker.on_response(StationId::new(1), Duration::from_micros(500), &mut stations);
        assert!(ratio.is_some());

        let outcome = tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);
        assert_eq!(outcome, Some(WindowOutcome::Failed));
        assert_eq!(global.failed_triggers(), 1);
        assert!(global.he_tb_completeness().is_empty());
    }

    #[test]
    fn last_window_is_never_scored() {
        let (mut tracker, mut stations, mut global) = setup();
        tracker.on_basic_trigger(&trigger(), &mut stations, &mut global);
        tracker.on_response(StationId::new(0), Duration::from_micros(500), &mut stations);

        assert_eq!(global.he_tb_completeness().count(), 0);
        assert_eq!(global.failed_triggers(), 0);
    }
}
