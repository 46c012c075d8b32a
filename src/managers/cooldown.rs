use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Result of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Allowed,
    Blocked { remaining_seconds: u64 },
}

/// Per-user fixed-window cooldown.
///
/// Entries are never swept; an old timestamp simply stops blocking.
pub struct CooldownTracker {
    window: Duration,
    last_used: DashMap<u64, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new(window_secs: u64) -> Self {
        Self {
            window: Duration::seconds(window_secs.min(i32::MAX as u64) as i64),
            last_used: DashMap::new(),
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window.num_seconds() as u64
    }

    /// Decide and record in one step. The entry stays locked between the
    /// read and the write, so two calls for the same user cannot both pass.
    pub fn check_and_record(&self, user_id: u64, now: DateTime<Utc>) -> CooldownDecision {
        match self.last_used.entry(user_id) {
            Entry::Vacant(entry) => {
                entry.insert(now);
                CooldownDecision::Allowed
            }
            Entry::Occupied(mut entry) => {
                let elapsed = now - *entry.get();
                if elapsed >= self.window {
                    entry.insert(now);
                    CooldownDecision::Allowed
                } else {
                    // A clock that went backwards never reports more than the window
                    let remaining = (self.window - elapsed).min(self.window);
                    CooldownDecision::Blocked {
                        remaining_seconds: remaining.num_seconds().max(1) as u64,
                    }
                }
            }
        }
    }

    /// Number of users with a recorded invocation
    pub fn tracked_users(&self) -> usize {
        self.last_used.len()
    }
}
