use std::collections::HashMap;

use parking_lot::Mutex;

/// Playback state for one card. Kept apart from fetched content so a
/// refetch never rewinds the player.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CardView {
    pub position: f64,
    pub duration: Option<f64>,
    pub muted: bool,
    pub playing: bool,
}

#[derive(Debug, Default)]
pub struct ViewStore {
    views: Mutex<HashMap<String, CardView>>,
}

impl ViewStore {
    pub fn get(&self, id: &str) -> CardView {
        self.views.lock().get(id).copied().unwrap_or_default()
    }

    pub fn set_position(&self, id: &str, position: f64, duration: Option<f64>) {
        let mut views = self.views.lock();
        let view = views.entry(id.to_string()).or_default();
        view.position = position.max(0.0);
        if duration.is_some() {
            view.duration = duration;
        }
    }

    pub fn set_muted(&self, id: &str, muted: bool) {
        self.views.lock().entry(id.to_string()).or_default().muted = muted;
    }

    pub fn play(&self, id: &str) {
        self.views.lock().entry(id.to_string()).or_default().playing = true;
    }

    pub fn pause(&self, id: &str) {
        if let Some(view) = self.views.lock().get_mut(id) {
            view.playing = false;
        }
    }

    pub fn playing(&self) -> Vec<String> {
        self.views
            .lock()
            .iter()
            .filter(|(_, view)| view.playing)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn remove(&self, id: &str) {
        self.views.lock().remove(id);
    }

    pub fn clear(&self) {
        self.views.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_card_has_default_view() {
        let store = ViewStore::default();
        assert_eq!(store.get("v1"), CardView::default());
    }

    #[test]
    fn position_keeps_known_duration() {
        let store = ViewStore::default();
        store.set_position("v1", 3.0, Some(30.0));
        store.set_position("v1", -1.0, None);
        let view = store.get("v1");
        assert_eq!(view.position, 0.0);
        assert_eq!(view.duration, Some(30.0));
    }

    #[test]
    fn pause_only_touches_the_named_card() {
        let store = ViewStore::default();
        store.play("a");
        store.play("b");
        store.pause("a");
        assert_eq!(store.playing(), vec!["b".to_string()]);
        store.set_muted("b", true);
        assert!(store.get("b").muted);
    }
}
