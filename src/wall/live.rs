use rand::Rng;

use crate::{
    foundation::core::{Photo, PhotoKey},
    foundation::error::{WallError, WallResult},
    wall::placement::{InsertOutcome, Wall},
};

/// Notification delivered by the real-time channel.
///
/// Wire form is one JSON object per event, tagged by `event`:
/// `{"event":"photo-added","key":"k1","imageRef":"a.png","caption":"hi"}` or
/// `{"event":"photo-removed","key":"k1"}`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum LiveEvent {
    PhotoAdded(Photo),
    PhotoRemoved { key: PhotoKey },
}

impl LiveEvent {
    pub fn parse(line: &str) -> WallResult<Self> {
        let event: Self = serde_json::from_str(line)
            .map_err(|e| WallError::event(format!("malformed live event: {e}")))?;
        let key = match &event {
            Self::PhotoAdded(p) => &p.key,
            Self::PhotoRemoved { key } => key,
        };
        if key.as_str().trim().is_empty() {
            return Err(WallError::event("live event has an empty key"));
        }
        Ok(event)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiveOutcome {
    Added(InsertOutcome),
    /// `false` when the key was not on the wall.
    Removed(bool),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct LiveStats {
    pub added: u64,
    pub duplicates: u64,
    pub dropped: u64,
    pub evicted: u64,
    pub removed: u64,
    pub ignored_removals: u64,
    pub malformed: u64,
}

/// Applies live notifications to a wall exactly once each, as received.
///
/// Delivery is at-least-once, so repeated adds and removals of absent keys are
/// expected and absorbed by the wall's idempotent operations. Nothing is buffered or
/// retried here.
#[derive(Debug, Default)]
pub struct LiveUpdateAdapter {
    stats: LiveStats,
}

impl LiveUpdateAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> LiveStats {
        self.stats
    }

    pub fn apply<R: Rng>(&mut self, wall: &mut Wall<R>, event: LiveEvent) -> LiveOutcome {
        match event {
            LiveEvent::PhotoAdded(photo) => {
                let outcome = wall.insert(photo, true);
                match &outcome {
                    InsertOutcome::Placed { evicted, .. } => {
                        self.stats.added += 1;
                        self.stats.evicted += evicted.len() as u64;
                    }
                    InsertOutcome::Duplicate => self.stats.duplicates += 1,
                    InsertOutcome::Dropped => self.stats.dropped += 1,
                }
                LiveOutcome::Added(outcome)
            }
            LiveEvent::PhotoRemoved { key } => {
                let removed = wall.remove(&key);
                if removed {
                    self.stats.removed += 1;
                } else {
                    tracing::debug!(key = %key, "removal of absent photo ignored");
                    self.stats.ignored_removals += 1;
                }
                LiveOutcome::Removed(removed)
            }
        }
    }

    /// Parse and apply one wire event. Malformed input is logged, counted and skipped.
    pub fn apply_json<R: Rng>(&mut self, wall: &mut Wall<R>, line: &str) -> Option<LiveOutcome> {
        if line.trim().is_empty() {
            return None;
        }
        match LiveEvent::parse(line) {
            Ok(event) => Some(self.apply(wall, event)),
            Err(err) => {
                self.skip_malformed(&err);
                None
            }
        }
    }

    /// Record an event that never reached the parser, e.g. a line that is not UTF-8.
    pub fn skip_malformed(&mut self, reason: &dyn std::fmt::Display) {
        tracing::warn!(error = %reason, "skipping live event");
        self.stats.malformed += 1;
    }

    /// Like [`Self::apply_json`] for a raw line of bytes.
    pub fn apply_bytes<R: Rng>(&mut self, wall: &mut Wall<R>, line: &[u8]) -> Option<LiveOutcome> {
        match std::str::from_utf8(line) {
            Ok(text) => self.apply_json(wall, text),
            Err(err) => {
                self.skip_malformed(&format_args!("live event is not UTF-8: {err}"));
                None
            }
        }
    }

    pub fn apply_stream<R, I, S>(&mut self, wall: &mut Wall<R>, lines: I) -> LiveStats
    where
        R: Rng,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.apply_json(wall, line.as_ref());
        }
        self.stats
    }
}
