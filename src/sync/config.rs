// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration types for the sync engine.

use std::time::Duration;

/// Timing configuration for a [`SyncEngine`](super::SyncEngine).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use relay_panel::sync::{ReconnectionPolicy, SyncConfig};
///
/// let config = SyncConfig::new()
///     .with_toggle_timeout(Duration::from_secs(3))
///     .with_poll_interval(Duration::from_secs(15))
///     .without_status_polling()
///     .with_reconnection(ReconnectionPolicy::new().with_max_retries(5));
/// assert_eq!(config.status_interval, None);
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Upper bound on how long a toggle may stay pending.
    pub toggle_timeout: Duration,
    /// Interval between full-state polls.
    pub poll_interval: Duration,
    /// Interval between system status polls (`None` disables them).
    pub status_interval: Option<Duration>,
    /// Push stream reconnection policy.
    pub reconnection: ReconnectionPolicy,
    /// Capacity of the notice broadcast channel.
    pub notice_capacity: usize,
}

impl SyncConfig {
    /// Default toggle timeout.
    pub const DEFAULT_TOGGLE_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default poll interval, matching the panel page's refresh cadence.
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
    /// Default status poll interval.
    pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(30);
    /// Default notice channel capacity.
    pub const DEFAULT_NOTICE_CAPACITY: usize = 64;

    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the toggle timeout.
    #[must_use]
    pub fn with_toggle_timeout(mut self, timeout: Duration) -> Self {
        self.toggle_timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the status poll interval.
    #[must_use]
    pub fn with_status_interval(mut self, interval: Duration) -> Self {
        self.status_interval = Some(interval);
        self
    }

    /// Disables status polling.
    #[must_use]
    pub fn without_status_polling(mut self) -> Self {
        self.status_interval = None;
        self
    }

    /// Sets the push stream reconnection policy.
    #[must_use]
    pub fn with_reconnection(mut self, policy: ReconnectionPolicy) -> Self {
        self.reconnection = policy;
        self
    }

    /// Sets the notice channel capacity (minimum 1).
    #[must_use]
    pub fn with_notice_capacity(mut self, capacity: usize) -> Self {
        self.notice_capacity = capacity.max(1);
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            toggle_timeout: Self::DEFAULT_TOGGLE_TIMEOUT,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            status_interval: Some(Self::DEFAULT_STATUS_INTERVAL),
            reconnection: ReconnectionPolicy::default(),
            notice_capacity: Self::DEFAULT_NOTICE_CAPACITY,
        }
    }
}

/// Configuration for re-establishing the push stream.
///
/// While the stream is down the engine keeps polling, so giving up only
/// means state arrives at poll cadence.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use relay_panel::sync::ReconnectionPolicy;
///
/// // Default policy (enabled, unlimited retries, exponential backoff)
/// let policy = ReconnectionPolicy::default();
/// assert!(policy.should_retry(1_000));
///
/// // Custom policy
/// let policy = ReconnectionPolicy::new()
///     .with_max_retries(5)
///     .with_initial_delay(Duration::from_millis(500))
///     .with_max_delay(Duration::from_secs(30));
/// assert!(!policy.should_retry(5));
/// ```
#[derive(Debug, Clone)]
pub struct ReconnectionPolicy {
    /// Whether automatic reconnection is enabled.
    pub enabled: bool,
    /// Maximum number of retries before giving up (None = infinite).
    pub max_retries: Option<u32>,
    /// Initial delay between retry attempts.
    pub initial_delay: Duration,
    /// Maximum delay between retry attempts (for exponential backoff).
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f32,
}

impl ReconnectionPolicy {
    /// Creates a new reconnection policy with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disabled reconnection policy.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets infinite retries.
    #[must_use]
    pub fn with_infinite_retries(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Sets the initial delay between retry attempts.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retry attempts.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f32) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Calculates the delay for a given retry attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_delay;
        }

        let multiplier = self
            .backoff_multiplier
            .powi(i32::try_from(attempt).unwrap_or(i32::MAX));

        #[allow(clippy::cast_precision_loss)]
        let delay_ms = self.initial_delay.as_millis() as f32 * multiplier;

        // Saturating float-to-int cast; infinity clamps to u64::MAX
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay = Duration::from_millis(delay_ms as u64);

        delay.min(self.max_delay)
    }

    /// Returns true if another retry should be attempted.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && self.max_retries.is_none_or(|max| attempt < max)
    }
}

impl Default for ReconnectionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: None,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}
