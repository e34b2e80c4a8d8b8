//! Creation-token identifiers.
//!
//! Ids are millisecond timestamps rendered as decimal strings. They double as
//! creation order for the `Newest` / `Oldest` sorts, so a generator never hands
//! out the same or a smaller value twice, even when called within one millisecond.

/// Monotonic id source owned by a session.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id, at least the current wall-clock millisecond.
    pub fn next_id(&mut self) -> String {
        self.next_at(chrono::Utc::now().timestamp_millis())
    }

    /// Returns the next id given an explicit clock reading.
    pub fn next_at(&mut self, now_millis: i64) -> String {
        self.last = now_millis.max(self.last.saturating_add(1));
        self.last.to_string()
    }

    /// Raises the floor so later ids sort after `id`. Non-numeric ids are ignored.
    pub fn observe(&mut self, id: &str) {
        if let Ok(value) = id.parse::<i64>() {
            self.last = self.last.max(value);
        }
    }
}
