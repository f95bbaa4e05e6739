use std::collections::HashMap;

use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: String,
    seq: u64,
}

impl Ticket {
    /// Position in issue order across all keys.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Orders writes per key so only the most recent request's response is applied.
#[derive(Debug, Default)]
pub struct WriteSequencer {
    inner: Mutex<(u64, HashMap<String, u64>)>,
}

impl WriteSequencer {
    pub fn begin(&self, key: &str) -> Ticket {
        let mut inner = self.inner.lock();
        inner.0 += 1;
        let seq = inner.0;
        inner.1.insert(key.to_string(), seq);
        Ticket {
            key: key.to_string(),
            seq,
        }
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.inner.lock().1.get(&ticket.key) == Some(&ticket.seq)
    }

    /// Whether a write for `key` has begun and not yet finished as latest.
    pub fn in_flight(&self, key: &str) -> bool {
        self.inner.lock().1.contains_key(key)
    }

    /// Releases the key if `ticket` is still the latest write for it.
    pub fn finish(&self, ticket: &Ticket) -> bool {
        let mut inner = self.inner.lock();
        if inner.1.get(&ticket.key) == Some(&ticket.seq) {
            inner.1.remove(&ticket.key);
            true
        } else {
            false
        }
    }

    pub fn clear(&self) {
        self.inner.lock().1.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_ticket_supersedes_earlier() {
        let seq = WriteSequencer::default();
        let first = seq.begin("v1");
        let second = seq.begin("v1");
        assert!(!seq.is_latest(&first));
        assert!(seq.finish(&second));
        assert!(!seq.finish(&first));
    }

    #[test]
    fn key_stays_in_flight_until_latest_finishes() {
        let seq = WriteSequencer::default();
        let first = seq.begin("v1");
        let second = seq.begin("v1");
        assert!(second.seq() > first.seq());
        assert!(!seq.finish(&first));
        assert!(seq.in_flight("v1"));
        assert!(seq.finish(&second));
        assert!(!seq.in_flight("v1"));
    }

    #[test]
    fn keys_are_independent() {
        let seq = WriteSequencer::default();
        let a = seq.begin("a");
        let _b = seq.begin("b");
        assert!(seq.is_latest(&a));
    }
}
