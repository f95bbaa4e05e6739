use tracing::debug;

use crate::model::FeedItem;

/// Share of a card that must be on screen before it takes over playback.
pub const ACTIVATION_RATIO: f64 = 0.65;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub previous: Option<String>,
    pub current: String,
}

/// Picks the single card eligible for playback from visibility reports.
#[derive(Debug, Clone)]
pub struct ActiveCardTracker {
    active: Option<String>,
    threshold: f64,
}

impl Default for ActiveCardTracker {
    fn default() -> Self {
        Self::new(ACTIVATION_RATIO)
    }
}

impl ActiveCardTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            active: None,
            threshold,
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Reports below the threshold never move the selection, so two cards
    /// hovering around the midpoint during a scroll do not flap.
    pub fn on_visibility_changed(&mut self, id: &str, ratio: f64) -> Option<Switch> {
        if ratio < self.threshold || self.active.as_deref() == Some(id) {
            return None;
        }
        let previous = self.active.replace(id.to_string());
        debug!(id, ratio, ?previous, "active card switched");
        Some(Switch {
            previous,
            current: id.to_string(),
        })
    }

    /// Defaults the selection to the first item once the feed has content.
    pub fn sync_with_feed(&mut self, items: &[FeedItem]) -> Option<Switch> {
        if self.active.is_some() {
            return None;
        }
        let first = items.first()?;
        self.active = Some(first.id.clone());
        Some(Switch {
            previous: None,
            current: first.id.clone(),
        })
    }

    pub fn active_index(&self, items: &[FeedItem]) -> Option<usize> {
        let active = self.active.as_deref()?;
        items.iter().position(|item| item.id == active)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.as_deref() == Some(id)
    }

    /// Moves playback off `removed` when it was the active card. The
    /// successor is the card that now occupies its slot, if any.
    pub fn hand_off(&mut self, removed: &str, successor: Option<&str>) -> Option<Switch> {
        if !self.is_active(removed) {
            return None;
        }
        self.active = successor.map(str::to_string);
        let current = self.active.clone()?;
        debug!(removed, current = %current, "active card removed");
        Some(Switch {
            previous: Some(removed.to_string()),
            current,
        })
    }

    pub fn reset(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_items;

    #[test]
    fn switches_only_at_threshold() {
        let mut tracker = ActiveCardTracker::default();
        tracker.on_visibility_changed("a", 0.9);
        assert_eq!(tracker.on_visibility_changed("b", 0.5), None);
        assert_eq!(tracker.active(), Some("a"));

        let switch = tracker.on_visibility_changed("b", 0.7).unwrap();
        assert_eq!(switch.previous.as_deref(), Some("a"));
        assert_eq!(tracker.active(), Some("b"));
    }

    #[test]
    fn exact_threshold_activates() {
        let mut tracker = ActiveCardTracker::default();
        assert!(tracker.on_visibility_changed("a", ACTIVATION_RATIO).is_some());
    }

    #[test]
    fn repeated_report_for_active_card_is_quiet() {
        let mut tracker = ActiveCardTracker::default();
        tracker.on_visibility_changed("a", 0.8);
        assert_eq!(tracker.on_visibility_changed("a", 1.0), None);
    }

    #[test]
    fn first_item_becomes_active_once_feed_loads() {
        let mut tracker = ActiveCardTracker::default();
        assert_eq!(tracker.sync_with_feed(&[]), None);
        let items = sample_items(3);
        let switch = tracker.sync_with_feed(&items).unwrap();
        assert_eq!(switch.current, "v0");
        assert_eq!(tracker.active_index(&items), Some(0));

        tracker.on_visibility_changed("v2", 0.9);
        assert_eq!(tracker.sync_with_feed(&items), None);
        assert_eq!(tracker.active_index(&items), Some(2));
    }

    #[test]
    fn removing_the_active_card_hands_off_to_its_successor() {
        let mut tracker = ActiveCardTracker::default();
        tracker.on_visibility_changed("a", 0.9);
        assert_eq!(tracker.hand_off("b", Some("c")), None);
        assert_eq!(tracker.active(), Some("a"));

        let switch = tracker.hand_off("a", Some("b")).unwrap();
        assert_eq!(switch.previous.as_deref(), Some("a"));
        assert_eq!(switch.current, "b");
        assert_eq!(tracker.active(), Some("b"));

        assert_eq!(tracker.hand_off("b", None), None);
        assert_eq!(tracker.active(), None);
    }

    #[test]
    fn reset_clears_selection() {
        let mut tracker = ActiveCardTracker::default();
        tracker.on_visibility_changed("a", 0.9);
        tracker.reset();
        assert_eq!(tracker.active(), None);
        assert!(!tracker.is_active("a"));
    }
}
