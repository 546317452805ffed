//! Cooldown bookkeeping for misbehaving endpoints.
//!
//! Every rate-limit or server-error observation is a strike. The exclusion
//! window grows exponentially with the strike count — steeper for rate
//! limits than for generic server errors — and is capped. Entries are
//! never explicitly deleted; they simply stop applying once their deadline
//! passes, and the strike count keeps growing across calls until the url
//! naturally ages out of rotation.

use std::{collections::HashMap, time::Duration};
use tokio::time::Instant;

/// Upper bound on a single cooldown window.
const COOLDOWN_CAP: Duration = Duration::from_secs(5 * 60);

/// Backoff growth per strike after a rate-limit signature.
const RATE_LIMIT_FACTOR: f64 = 2.0;

/// Backoff growth per strike after a server-error signature.
const SERVER_ERROR_FACTOR: f64 = 1.5;

/// Exclusion state for one endpoint url.
#[derive(Debug, Clone, Copy)]
pub struct CooldownEntry {
    pub until: Instant,
    pub strikes: u32,
}

/// Strike table keyed by endpoint url.
///
/// One table is shared by all consensus calls made through a handler; it
/// is the mechanism by which a hammered endpoint gets progressively
/// excluded. Callers guard the table with a lock — see
/// [`ConsensusEngine`](super::ConsensusEngine).
#[derive(Debug, Default)]
pub struct CooldownTable {
    entries: HashMap<String, CooldownEntry>,
}

impl CooldownTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while `url` is inside its exclusion window.
    #[must_use]
    pub fn is_cooling(&self, url: &str, now: Instant) -> bool {
        self.entries.get(url).is_some_and(|entry| entry.until > now)
    }

    /// Records a strike against `url` and pushes its exclusion deadline
    /// out.
    ///
    /// `delay = base × factor^(strikes − 1)`, where the factor depends on
    /// whether the failure was a rate limit, capped at five minutes.
    /// Returns the updated strike count and the applied delay for logging.
    pub fn strike(
        &mut self,
        url: &str,
        base: Duration,
        rate_limited: bool,
        now: Instant,
    ) -> (u32, Duration) {
        let strikes = self.entries.get(url).map_or(0, |entry| entry.strikes) + 1;
        let factor = if rate_limited { RATE_LIMIT_FACTOR } else { SERVER_ERROR_FACTOR };
        let delay = base.mul_f64(factor.powi(strikes as i32 - 1)).min(COOLDOWN_CAP);
        self.entries.insert(url.to_string(), CooldownEntry { until: now + delay, strikes });
        (strikes, delay)
    }

    /// Current strike count for `url` (0 when never struck).
    #[must_use]
    pub fn strikes(&self, url: &str) -> u32 {
        self.entries.get(url).map_or(0, |entry| entry.strikes)
    }
}
