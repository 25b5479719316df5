//! Global counters for ledger activity.
//!
//! Counters are bumped by the ledger on each successful transition. Call
//! [`Metrics::flush`] to emit the current values as one `info!` event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use arbiter_state::Amount;

pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    tasks_submitted: AtomicU64,
    challenges_opened: AtomicU64,
    resolutions: AtomicU64,
    expiries: AtomicU64,
    claims: AtomicU64,
    // u128 has no stable atomic.
    protocol_fees: Mutex<Amount>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            challenges_opened: AtomicU64::new(0),
            resolutions: AtomicU64::new(0),
            expiries: AtomicU64::new(0),
            claims: AtomicU64::new(0),
            protocol_fees: Mutex::new(0),
        }
    }

    pub fn inc_tasks_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "tasks_submitted", "counter incremented");
    }

    pub fn inc_challenges(&self) {
        self.challenges_opened.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "challenges_opened", "counter incremented");
    }

    pub fn inc_resolutions(&self) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "resolutions", "counter incremented");
    }

    pub fn inc_expiries(&self) {
        self.expiries.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "expiries", "counter incremented");
    }

    pub fn inc_claims(&self) {
        self.claims.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "claims", "counter incremented");
    }

    /// Add to the protocol-fee total (saturating).
    pub fn add_protocol_fee(&self, amount: Amount) {
        let mut total = self
            .protocol_fees
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *total = total.saturating_add(amount);
    }

    /// Emit all current values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            tasks_submitted = self.tasks_submitted(),
            challenges_opened = self.challenges_opened(),
            resolutions = self.resolutions(),
            expiries = self.expiries(),
            claims = self.claims(),
            protocol_fees = %self.protocol_fees(),
        );
    }

    pub fn tasks_submitted(&self) -> u64 {
        self.tasks_submitted.load(Ordering::Relaxed)
    }

    pub fn challenges_opened(&self) -> u64 {
        self.challenges_opened.load(Ordering::Relaxed)
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }

    pub fn expiries(&self) -> u64 {
        self.expiries.load(Ordering::Relaxed)
    }

    pub fn claims(&self) -> u64 {
        self.claims.load(Ordering::Relaxed)
    }

    pub fn protocol_fees(&self) -> Amount {
        *self
            .protocol_fees
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.tasks_submitted.store(0, Ordering::Relaxed);
        self.challenges_opened.store(0, Ordering::Relaxed);
        self.resolutions.store(0, Ordering::Relaxed);
        self.expiries.store(0, Ordering::Relaxed);
        self.claims.store(0, Ordering::Relaxed);
        *self
            .protocol_fees
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_tasks_submitted();
        m.inc_tasks_submitted();
        m.inc_challenges();
        m.inc_claims();
        assert_eq!(m.tasks_submitted(), 2);
        assert_eq!(m.challenges_opened(), 1);
        assert_eq!(m.claims(), 1);
        assert_eq!(m.resolutions(), 0);
    }

    #[test]
    fn protocol_fees_accumulate_and_saturate() {
        let m = Metrics::new();
        m.add_protocol_fee(75);
        m.add_protocol_fee(50);
        assert_eq!(m.protocol_fees(), 125);
        m.add_protocol_fee(u128::MAX);
        assert_eq!(m.protocol_fees(), u128::MAX);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_expiries();
        m.inc_resolutions();
        m.add_protocol_fee(9);
        m.reset();
        assert_eq!(m.expiries(), 0);
        assert_eq!(m.resolutions(), 0);
        assert_eq!(m.protocol_fees(), 0);
    }
}
