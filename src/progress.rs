//! Progress normalization
//!
//! Engines report progress inconsistently: sometimes exact byte counts,
//! sometimes only an estimated total, sometimes just a pre-formatted string.
//! [`ProgressSample::from_event`] folds those shapes into one sample using the
//! fallback order exact bytes > estimated bytes > label > unknown, and
//! [`ProgressTracker`] keeps the last known value so a sample without numbers
//! never resets a job to 0%.

use serde::{Deserialize, Serialize};

/// Raw progress report from an engine
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Bytes downloaded so far
    pub downloaded_bytes: Option<u64>,
    /// Exact total size, when the engine knows it
    pub total_bytes: Option<u64>,
    /// Estimated total size, when the exact one is unknown
    pub total_bytes_estimate: Option<u64>,
    /// Engine's own formatted percentage (e.g., " 42.1%")
    pub percent_label: Option<String>,
}

/// Normalized progress sample
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProgressSample {
    /// Percentage in [0, 100], if it could be computed
    pub percent: Option<f32>,
    /// Engine-supplied label, kept when no numeric data exists
    pub raw_label: Option<String>,
}

impl ProgressSample {
    /// Normalize a raw engine event
    pub fn from_event(event: &ProgressEvent) -> Self {
        let percent = event.downloaded_bytes.and_then(|done| {
            ratio(done, event.total_bytes).or_else(|| ratio(done, event.total_bytes_estimate))
        });

        let raw_label = if percent.is_none() {
            event
                .percent_label
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
        } else {
            None
        };

        Self { percent, raw_label }
    }

    /// Neither a number nor a label
    pub fn is_unknown(&self) -> bool {
        self.percent.is_none() && self.raw_label.is_none()
    }
}

fn ratio(done: u64, total: Option<u64>) -> Option<f32> {
    let total = total.filter(|t| *t > 0)?;
    let percent = (done as f64 / total as f64) * 100.0;
    Some(percent.clamp(0.0, 100.0) as f32)
}

/// Per-job progress state
///
/// Engines that fetch video and audio separately restart their byte counters
/// for the second stream; the tracker keeps the reported percentage from
/// moving backwards.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    last_percent: Option<f32>,
}

impl ProgressTracker {
    /// Tracker with no samples yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in an event and return the sample to publish, if anything changed
    ///
    /// Returns `None` for an unknown sample and for a percentage that does not
    /// advance past the last known one.
    pub fn observe(&mut self, event: &ProgressEvent) -> Option<ProgressSample> {
        let sample = ProgressSample::from_event(event);
        if sample.is_unknown() {
            return None;
        }

        match sample.percent {
            Some(p) => {
                if self.last_percent.is_some_and(|last| p <= last) {
                    return None;
                }
                self.last_percent = Some(p);
                Some(sample)
            }
            None => Some(sample),
        }
    }

    /// Last known percentage
    pub fn last_percent(&self) -> Option<f32> {
        self.last_percent
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn event(
        downloaded: Option<u64>,
        total: Option<u64>,
        estimate: Option<u64>,
        label: Option<&str>,
    ) -> ProgressEvent {
        ProgressEvent {
            downloaded_bytes: downloaded,
            total_bytes: total,
            total_bytes_estimate: estimate,
            percent_label: label.map(str::to_string),
        }
    }

    #[test]
    fn exact_total_wins_over_estimate() {
        let sample = ProgressSample::from_event(&event(Some(50), Some(200), Some(100), None));
        assert_eq!(sample.percent, Some(25.0));
        assert!(sample.raw_label.is_none());
    }

    #[test]
    fn estimate_is_used_when_exact_total_is_missing() {
        let sample = ProgressSample::from_event(&event(Some(30), None, Some(120), Some("25%")));
        assert_eq!(sample.percent, Some(25.0));
        assert!(
            sample.raw_label.is_none(),
            "label is only kept when no numeric progress exists"
        );
    }

    #[test]
    fn zero_total_falls_through_to_estimate() {
        let sample = ProgressSample::from_event(&event(Some(10), Some(0), Some(40), None));
        assert_eq!(sample.percent, Some(25.0));
    }

    #[test]
    fn estimate_overshoot_is_clamped() {
        let sample = ProgressSample::from_event(&event(Some(150), None, Some(100), None));
        assert_eq!(sample.percent, Some(100.0));
    }

    #[test]
    fn label_is_used_when_no_numbers_exist() {
        let sample = ProgressSample::from_event(&event(None, None, None, Some("  37.5% ")));
        assert_eq!(sample.percent, None);
        assert_eq!(sample.raw_label.as_deref(), Some("37.5%"));
    }

    #[test]
    fn downloaded_without_any_total_is_unknown() {
        let sample = ProgressSample::from_event(&event(Some(1024), None, None, None));
        assert!(sample.is_unknown());
    }

    #[test]
    fn tracker_drops_unknown_samples() {
        let mut tracker = ProgressTracker::new();
        tracker.observe(&event(Some(40), Some(100), None, None));

        assert!(tracker.observe(&ProgressEvent::default()).is_none());
        assert_eq!(tracker.last_percent(), Some(40.0));
    }

    #[test]
    fn tracker_ignores_restarted_counters() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.observe(&event(Some(90), Some(100), None, None)).is_some());

        // Second stream (e.g. audio) starts again from zero
        assert!(tracker.observe(&event(Some(5), Some(100), None, None)).is_none());
        assert_eq!(tracker.last_percent(), Some(90.0));

        assert!(tracker.observe(&event(Some(95), Some(100), None, None)).is_some());
        assert_eq!(tracker.last_percent(), Some(95.0));
    }

    #[test]
    fn tracker_passes_labels_through_without_touching_last_percent() {
        let mut tracker = ProgressTracker::new();
        tracker.observe(&event(Some(20), Some(100), None, None));

        let sample = tracker.observe(&event(None, None, None, Some("N/A"))).unwrap();
        assert_eq!(sample.raw_label.as_deref(), Some("N/A"));
        assert_eq!(tracker.last_percent(), Some(20.0));
    }
}
