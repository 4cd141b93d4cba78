//! Reaction rate limiter.
//!
//! Counts, per (date, school), the likes this client has sent and refuses
//! more once the cap is reached. Counts persist in the local store. This is
//! a soft, client-side limit; the server does its own bookkeeping.

use crate::error::Result;
use crate::storage::{like_counter_key, LocalStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Default likes per school per date.
pub const DEFAULT_LIKE_CAP: u32 = 5;

/// Per (date, school) like cap backed by the local store.
///
/// Likes still in flight hold a [`Reservation`] and count against the cap,
/// so concurrent clicks cannot overshoot it.
#[derive(Clone)]
pub struct ReactionLimiter {
    store: Arc<LocalStore>,
    cap: u32,
    pending: Arc<Mutex<HashMap<String, u32>>>,
}

impl ReactionLimiter {
    /// Create a limiter with the given cap.
    pub fn new(store: Arc<LocalStore>, cap: u32) -> Self {
        Self {
            store,
            cap,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Cap in effect.
    pub fn cap(&self) -> u32 {
        self.cap
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, u32>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Likes already recorded for the pair.
    pub fn count(&self, date: &str, school_code: &str) -> Result<u32> {
        self.store.get_counter(&like_counter_key(date, school_code))
    }

    /// True iff the stored count plus likes in flight is below the cap.
    pub fn can_react(&self, date: &str, school_code: &str) -> Result<bool> {
        let key = like_counter_key(date, school_code);
        let pending = self.lock_pending();
        let in_flight = pending.get(&key).copied().unwrap_or(0);
        Ok(self.store.get_counter(&key)?.saturating_add(in_flight) < self.cap)
    }

    /// Claim one like for the pair, or `None` when the cap is reached.
    ///
    /// The claim counts against the cap until it is committed or dropped.
    pub fn try_reserve(&self, date: &str, school_code: &str) -> Result<Option<Reservation>> {
        let key = like_counter_key(date, school_code);
        let mut pending = self.lock_pending();
        let in_flight = pending.get(&key).copied().unwrap_or(0);
        if self.store.get_counter(&key)?.saturating_add(in_flight) >= self.cap {
            return Ok(None);
        }
        *pending.entry(key.clone()).or_insert(0) += 1;
        drop(pending);

        Ok(Some(Reservation {
            limiter: self.clone(),
            key,
            released: false,
        }))
    }

    /// Increment the stored count for the pair. Returns the new count.
    pub fn record_reaction(&self, date: &str, school_code: &str) -> Result<u32> {
        let key = like_counter_key(date, school_code);
        let _pending = self.lock_pending();
        let next = self.increment(&key)?;
        debug!(date, school_code, count = next, cap = self.cap, "Reaction recorded");
        Ok(next)
    }

    /// Caller holds the pending lock.
    fn increment(&self, key: &str) -> Result<u32> {
        let next = self.store.get_counter(key)?.saturating_add(1);
        self.store.put_counter(key, next)?;
        Ok(next)
    }
}

/// One like claimed against the cap and not yet recorded.
pub struct Reservation {
    limiter: ReactionLimiter,
    key: String,
    released: bool,
}

impl Reservation {
    /// Record the like. Returns the new stored count.
    pub fn commit(mut self) -> Result<u32> {
        let mut pending = self.limiter.lock_pending();
        release(&mut pending, &self.key);
        self.released = true;
        let next = self.limiter.increment(&self.key)?;
        debug!(key = %self.key, count = next, "Reaction recorded");
        Ok(next)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.released {
            release(&mut self.limiter.lock_pending(), &self.key);
        }
    }
}

fn release(pending: &mut HashMap<String, u32>, key: &str) {
    if let Some(in_flight) = pending.get_mut(key) {
        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            pending.remove(key);
        }
    }
}
