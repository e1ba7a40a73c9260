//! Dashboard view impression tracking
//!
//! Records "dashboard was opened" events so search can rank recency.
//! Most-recent-first; re-opening a dashboard moves it to the front; the
//! retained history is capped.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Most impressions retained; older entries fall off the end.
const MAX_IMPRESSIONS: usize = 50;

/// In-memory impression log, shared across the search UI.
#[derive(Debug, Default)]
pub struct ImpressionTracker {
    opened: Mutex<VecDeque<i64>>,
}

impl ImpressionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a dashboard was opened.
    pub fn add_dashboard_impression(&self, dashboard_id: i64) {
        let mut opened = self.opened.lock().expect("impression log poisoned");
        opened.retain(|id| *id != dashboard_id);
        opened.push_front(dashboard_id);
        opened.truncate(MAX_IMPRESSIONS);
    }

    /// Opened dashboard ids, most recent first.
    pub fn dashboard_opened(&self) -> Vec<i64> {
        self.opened.lock().expect("impression log poisoned").iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_recent_first() {
        let tracker = ImpressionTracker::new();
        tracker.add_dashboard_impression(1);
        tracker.add_dashboard_impression(2);
        tracker.add_dashboard_impression(3);
        assert_eq!(tracker.dashboard_opened(), vec![3, 2, 1]);
    }

    #[test]
    fn test_reopen_moves_to_front() {
        let tracker = ImpressionTracker::new();
        tracker.add_dashboard_impression(1);
        tracker.add_dashboard_impression(2);
        tracker.add_dashboard_impression(1);
        assert_eq!(tracker.dashboard_opened(), vec![1, 2]);
    }

    #[test]
    fn test_history_is_capped() {
        let tracker = ImpressionTracker::new();
        for id in 0..60 {
            tracker.add_dashboard_impression(id);
        }
        let opened = tracker.dashboard_opened();
        assert_eq!(opened.len(), MAX_IMPRESSIONS);
        assert_eq!(opened[0], 59);
        assert_eq!(*opened.last().unwrap(), 10);
    }
}
