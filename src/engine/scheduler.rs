//! One-shot timers on a virtual millisecond clock.
//!
//! Timers fire in due order, ties broken by the order they were scheduled.
//! The clock only moves when the owner pumps it, so the same inputs always
//! produce the same firing sequence.

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64, u64);

#[derive(Debug)]
pub struct Scheduler<T>
{
    now: u64,
    sequence: u64,
    queue: BTreeMap<(u64, u64), T>,
}

impl<T> Default for Scheduler<T>
{
    fn default() -> Self
    {
        Self {
            now: 0,
            sequence: 0,
            queue: BTreeMap::new(),
        }
    }
}

impl<T> Scheduler<T>
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64
    {
        self.now
    }

    pub fn schedule_once(&mut self, delay_ms: u64, token: T) -> TimerId
    {
        let seq = self.sequence;
        self.sequence += 1;
        let due = self.now.saturating_add(delay_ms);
        self.queue.insert((due, seq), token);
        TimerId(due, seq)
    }

    /// Removes a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool
    {
        self.queue.remove(&(id.0, id.1)).is_some()
    }

    /// Pops the earliest timer due at or before `until` and moves the clock
    /// to its due time.
    pub fn pop_due(&mut self, until: u64) -> Option<T>
    {
        let (&(due, seq), _) = self.queue.first_key_value()?;
        if due > until {
            return None;
        }
        let token = self.queue.remove(&(due, seq))?;
        self.now = self.now.max(due);
        Some(token)
    }

    /// Moves the clock forward. Never moves it back.
    pub fn settle(&mut self, until: u64)
    {
        self.now = self.now.max(until);
    }
}
