/// How a [`RunningStat`] tracks its minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MinTracking {
    /// the minimum is unset until the first sample, after which every
    /// sample, including `0.0`, is taken into account.
    #[default]
    Exact,
    /// a minimum of `0.0` means "no sample yet": it is replaced by the
    /// next sample, whatever its value.
    ///
    /// This reproduces the accounting of the historical measurement
    /// scripts, where a legitimate zero sample (a silent station's ratio)
    /// is forgotten as soon as another sample arrives. Use it only to
    /// compare against results produced by those scripts.
    ZeroSentinel,
}

/// An O(1) accumulator of min, max, count and mean.
///
/// ```
/// # use ofdma_stats_core::RunningStat;
/// let mut stat = RunningStat::new();
/// stat.observe(2.0);
/// stat.observe(4.0);
///
/// let snapshot = stat.snapshot();
/// assert_eq!(snapshot.min, Some(2.0));
/// assert_eq!(snapshot.max, Some(4.0));
/// assert_eq!(snapshot.mean, 3.0);
/// assert_eq!(snapshot.count, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunningStat {
    count: u64,
    min: Option<f64>,
    max: Option<f64>,
    mean: f64,
    tracking: MinTracking,
}

/// Point-in-time copy of a [`RunningStat`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatSnapshot {
    /// `None` until the first sample
    pub min: Option<f64>,
    /// `None` until the first sample
    pub max: Option<f64>,
    /// `0.0` until the first sample
    pub mean: f64,
    pub count: u64,
}

impl RunningStat {
    pub fn new() -> Self {
        Self::with_tracking(MinTracking::Exact)
    }

    pub fn with_tracking(tracking: MinTracking) -> Self {
        Self {
            count: 0,
            min: None,
            max: None,
            mean: 0.0,
            tracking,
        }
    }

    /// account for a new sample.
    pub fn observe(&mut self, sample: f64) {
        self.min = match (self.min, self.tracking) {
            (None, _) => Some(sample),
            (Some(min), MinTracking::ZeroSentinel) if min == 0.0 => Some(sample),
            (Some(min), _) => Some(min.min(sample)),
        };
        self.max = Some(self.max.map_or(sample, |max| max.max(sample)));

        let count = self.count as f64;
        self.mean = (self.mean * count + sample) / (count + 1.0);
        self.count += 1;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn snapshot(&self) -> StatSnapshot {
        StatSnapshot {
            min: self.min,
            max: self.max,
            mean: self.mean,
            count: self.count,
        }
    }
}

impl StatSnapshot {
    /// `(min, max, mean)` with unset extremes rendered as `0.0`
    pub fn min_max_mean(&self) -> (f64, f64, f64) {
        (
            self.min.unwrap_or_default(),
            self.max.unwrap_or_default(),
            self.mean,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty() {
        let stat = RunningStat::new();
        assert!(stat.is_empty());
        assert_eq!(stat.snapshot(), StatSnapshot::default());
        assert_eq!(stat.snapshot().min_max_mean(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn invariants_hold_after_every_sample() {
        let samples = [3.5, 0.25, 7.0, 7.0, 0.25, 1.0, 12.75, 0.0, 4.2];
        let mut stat = RunningStat::new();

        for (i, &sample) in samples.iter().enumerate() {
            stat.observe(sample);

            let seen = &samples[..=i];
            let snapshot = stat.snapshot();
            let expected_min = seen.iter().copied().fold(f64::INFINITY, f64::min);
            let expected_max = seen.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let expected_mean = seen.iter().sum::<f64>() / seen.len() as f64;

            assert_eq!(snapshot.count, seen.len() as u64);
            assert_eq!(snapshot.min, Some(expected_min));
            assert_eq!(snapshot.max, Some(expected_max));
            assert_close(snapshot.mean, expected_mean);
            assert!(expected_min <= snapshot.mean + 1e-9);
            assert!(snapshot.mean <= expected_max + 1e-9);
        }
    }

    #[test]
    fn sample_equal_to_extreme_still_counts() {
        let mut stat = RunningStat::new();
        stat.observe(2.0);
        stat.observe(2.0);
        stat.observe(2.0);

        let snapshot = stat.snapshot();
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.min, Some(2.0));
        assert_eq!(snapshot.max, Some(2.0));
        assert_close(snapshot.mean, 2.0);
    }

    #[test]
    fn zero_sample_is_a_real_minimum() {
        let mut stat = RunningStat::new();
        stat.observe(0.0);
        stat.observe(0.5);

        assert_eq!(stat.snapshot().min, Some(0.0));
    }

    #[test]
    fn zero_sentinel_forgets_zero_minimum() {
        let mut stat = RunningStat::with_tracking(MinTracking::ZeroSentinel);
        stat.observe(0.0);
        stat.observe(0.5);
        stat.observe(0.75);

        let snapshot = stat.snapshot();
        assert_eq!(snapshot.min, Some(0.5));
        assert_eq!(snapshot.count, 3);
        assert_close(snapshot.mean, 1.25 / 3.0);
    }
}
