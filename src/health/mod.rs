//! Provider Health Monitor
//!
//! Keeps a success/failure tally per provider and turns it into a binary
//! routing hint. A provider whose failure ratio reaches the threshold (after a
//! minimum number of observations) is marked degraded for a fixed cooldown;
//! once the cooldown elapses it reports healthy again, and the next qualifying
//! failure degrades it again.
//!
//! The monitor is a hint, never a gate: the dispatcher only uses it to order
//! candidates.
//!
//! ```rust,ignore
//! use mindscape_ai::health::{HealthMonitor, ProviderStatus};
//! use mindscape_ai::types::ProviderId;
//!
//! let monitor = HealthMonitor::new();
//! monitor.record_success(&ProviderId::Hosted);
//! assert_eq!(monitor.status(&ProviderId::Hosted), ProviderStatus::Healthy);
//! ```

pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::types::ProviderId;

/// Minimum observed attempts before a provider can be degraded.
pub const DEFAULT_MIN_SAMPLES: u64 = 5;
/// Failure ratio (failures / total) that triggers degradation.
pub const DEFAULT_FAILURE_RATIO: f64 = 0.25;
/// How long a degraded provider stays deprioritized.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(10 * 60);

/// Degradation thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthPolicy {
    pub min_samples: u64,
    pub failure_ratio: f64,
    pub cooldown: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            min_samples: DEFAULT_MIN_SAMPLES,
            failure_ratio: DEFAULT_FAILURE_RATIO,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

impl HealthPolicy {
    pub const fn with_min_samples(mut self, min_samples: u64) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub const fn with_failure_ratio(mut self, ratio: f64) -> Self {
        self.failure_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub const fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Routing hint derived from stored stats and the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Healthy,
    Degraded,
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
        })
    }
}

/// Raw per-provider counters. Created on first observation, kept for the
/// process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStats {
    pub successes: u64,
    pub failures: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    /// `None` when never degraded
    pub degraded_until: Option<DateTime<Utc>>,
}

impl ProviderStats {
    pub const fn total(&self) -> u64 {
        self.successes.saturating_add(self.failures)
    }

    pub fn failure_ratio(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.failures as f64 / total as f64,
        }
    }

    fn status_at(&self, now: DateTime<Utc>) -> ProviderStatus {
        match self.degraded_until {
            Some(until) if now < until => ProviderStatus::Degraded,
            _ => ProviderStatus::Healthy,
        }
    }
}

/// One row of [`HealthMonitor::report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReport {
    pub name: ProviderId,
    pub status: ProviderStatus,
    pub successes: u64,
    pub failures: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub degraded_until: Option<DateTime<Utc>>,
}

/// Shared, process-local provider health tracker.
///
/// Constructed by the composition root and handed to the dispatcher as an
/// `Arc`; every method takes `&self` and none of them blocks on I/O.
#[derive(Debug)]
pub struct HealthMonitor {
    policy: HealthPolicy,
    clock: Arc<dyn Clock>,
    stats: RwLock<HashMap<ProviderId, ProviderStats>>,
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthMonitor {
    pub fn new() -> Self {
        Self::with_policy(HealthPolicy::default())
    }

    pub fn with_policy(policy: HealthPolicy) -> Self {
        Self::with_clock(policy, Arc::new(SystemClock))
    }

    pub fn with_clock(policy: HealthPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            stats: RwLock::new(HashMap::new()),
        }
    }

    pub const fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    // A poisoned lock still holds consistent counters: every mutation is a
    // handful of plain field writes that cannot panic halfway.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ProviderId, ProviderStats>> {
        self.stats.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ProviderId, ProviderStats>> {
        self.stats.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn record_success(&self, provider: &ProviderId) {
        let mut stats = self.write();
        let entry = stats.entry(provider.clone()).or_default();
        entry.successes = entry.successes.saturating_add(1);
        tracing::trace!(
            target: "mindscape_ai::health",
            provider = %provider,
            successes = entry.successes,
            "recorded success"
        );
    }

    pub fn record_failure(&self, provider: &ProviderId) {
        let now = self.clock.now();
        let degraded = {
            let mut stats = self.write();
            let entry = stats.entry(provider.clone()).or_default();
            entry.failures = entry.failures.saturating_add(1);
            entry.last_failure_at = Some(now);

            let ratio = entry.failure_ratio();
            if entry.total() >= self.policy.min_samples && ratio >= self.policy.failure_ratio {
                let until = chrono::Duration::from_std(self.policy.cooldown)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                entry.degraded_until = Some(until);
                Some((ratio, entry.total(), until))
            } else {
                None
            }
        };

        if let Some((ratio, total, until)) = degraded {
            tracing::warn!(
                target: "mindscape_ai::health",
                provider = %provider,
                failure_pct = (ratio * 100.0).round() as u64,
                observed = total,
                degraded_until = %until,
                "provider failure rate too high, degrading"
            );
        }
    }

    /// Current routing hint. Unknown providers are healthy.
    pub fn status(&self, provider: &ProviderId) -> ProviderStatus {
        let now = self.clock.now();
        self.read()
            .get(provider)
            .map_or(ProviderStatus::Healthy, |s| s.status_at(now))
    }

    pub fn is_degraded(&self, provider: &ProviderId) -> bool {
        self.status(provider) == ProviderStatus::Degraded
    }

    /// Copy of the raw counters for one provider.
    pub fn stats(&self, provider: &ProviderId) -> Option<ProviderStats> {
        self.read().get(provider).cloned()
    }

    /// Snapshot of every observed provider, ordered by name.
    pub fn report(&self) -> Vec<ProviderReport> {
        let now = self.clock.now();
        let mut rows: Vec<ProviderReport> = self
            .read()
            .iter()
            .map(|(id, s)| ProviderReport {
                name: id.clone(),
                status: s.status_at(now),
                successes: s.successes,
                failures: s.failures,
                last_failure_at: s.last_failure_at,
                degraded_until: s.degraded_until,
            })
            .collect();
        rows.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        rows
    }
}
