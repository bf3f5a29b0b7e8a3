use std::time::{Duration, Instant};

/// One-shot deadline armed when listening stops.
///
/// Time is passed in explicitly so callers (and tests) own the clock.
#[derive(Debug, Clone)]
pub struct SettleTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl SettleTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arm relative to `now`
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when `now` reaches the deadline; disarms on firing
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Single-slot cell; a new value replaces the old one
#[derive(Debug, Clone)]
pub struct PendingSlot<T> {
    value: Option<T>,
}

impl<T> Default for PendingSlot<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> PendingSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning whatever it displaced
    pub fn put(&mut self, value: T) -> Option<T> {
        self.value.replace(value)
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }

    pub fn peek(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn is_occupied(&self) -> bool {
        self.value.is_some()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}
