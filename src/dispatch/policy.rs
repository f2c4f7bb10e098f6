//! Retry and fallback policy for the dispatcher.

use rand::Rng;
use std::time::Duration;

use crate::extract::DEFAULT_MAX_DEPTH;

pub const DEFAULT_ATTEMPTS_PER_CANDIDATE: u32 = 2;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(1000);

/// Dispatch policy configuration
#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Attempts spent on one candidate before advancing to the next
    pub attempts_per_candidate: u32,
    /// Fixed delay before every attempt after the first
    pub backoff: Duration,
    /// Maximum jitter as a fraction of `backoff` (0.0 to 1.0)
    pub jitter_factor: f64,
    /// Append the JSON-only instruction and request native JSON output
    /// when a target schema is present
    pub json_enforcement: bool,
    pub max_extraction_depth: usize,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            attempts_per_candidate: DEFAULT_ATTEMPTS_PER_CANDIDATE,
            backoff: DEFAULT_BACKOFF,
            jitter_factor: 0.0,
            json_enforcement: true,
            max_extraction_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DispatchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set attempts per candidate (at least one)
    pub const fn with_attempts_per_candidate(mut self, attempts: u32) -> Self {
        self.attempts_per_candidate = if attempts == 0 { 1 } else { attempts };
        self
    }

    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set jitter factor
    pub const fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor.clamp(0.0, 1.0);
        self
    }

    pub const fn with_json_enforcement(mut self, enabled: bool) -> Self {
        self.json_enforcement = enabled;
        self
    }

    pub const fn with_max_extraction_depth(mut self, depth: usize) -> Self {
        self.max_extraction_depth = depth;
        self
    }

    /// Delay to wait before the next attempt.
    pub fn delay(&self) -> Duration {
        if self.jitter_factor <= 0.0 || self.backoff.is_zero() {
            return self.backoff;
        }
        let base = self.backoff.as_millis() as f64;
        let range = base * self.jitter_factor;
        let jitter = rand::thread_rng().gen_range(-range..=range);
        Duration::from_millis((base + jitter).max(0.0) as u64)
    }
}
