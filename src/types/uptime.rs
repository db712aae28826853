// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Panel uptime.
//!
//! The firmware reports uptime as whole seconds since boot. The status bar
//! renders it as `"{d}d {h}h {m}m {s}s"`, dropping leading units that are
//! still zero.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use relay_panel::types::Uptime;
//!
//! assert_eq!(Uptime::from_secs(5).to_string(), "5s");
//! assert_eq!(Uptime::from_secs(3605).to_string(), "1h 0m 5s");
//! assert_eq!(Uptime::from_secs(90_061).to_string(), "1d 1h 1m 1s");
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;

/// Time since the panel booted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[derive(Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct Uptime(Duration);

impl Uptime {
    /// Creates an uptime from whole seconds.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    /// Returns the uptime as a [`Duration`].
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Returns the uptime in whole seconds.
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }
}

impl From<u64> for Uptime {
    fn from(secs: u64) -> Self {
        Self::from_secs(secs)
    }
}

impl From<Uptime> for u64 {
    fn from(uptime: Uptime) -> Self {
        uptime.as_secs()
    }
}

impl From<Duration> for Uptime {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl fmt::Display for Uptime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut secs = self.as_secs();
        let days = secs / SECS_PER_DAY;
        secs %= SECS_PER_DAY;
        let hours = secs / SECS_PER_HOUR;
        secs %= SECS_PER_HOUR;
        let minutes = secs / SECS_PER_MINUTE;
        secs %= SECS_PER_MINUTE;

        if days > 0 {
            write!(f, "{days}d ")?;
        }
        if hours > 0 || days > 0 {
            write!(f, "{hours}h ")?;
        }
        if minutes > 0 || hours > 0 || days > 0 {
            write!(f, "{minutes}m ")?;
        }
        write!(f, "{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_uptime() {
        assert_eq!(Uptime::default().to_string(), "0s");
    }

    #[test]
    fn minutes_only() {
        assert_eq!(Uptime::from_secs(60).to_string(), "1m 0s");
        assert_eq!(Uptime::from_secs(125).to_string(), "2m 5s");
    }

    #[test]
    fn whole_day_keeps_inner_zero_units() {
        assert_eq!(Uptime::from_secs(86_400).to_string(), "1d 0h 0m 0s");
    }

    #[test]
    fn deserializes_from_seconds() {
        let uptime: Uptime = serde_json::from_str("172018").unwrap();
        assert_eq!(uptime.as_duration(), Duration::from_secs(172_018));
        assert_eq!(uptime.to_string(), "1d 23h 46m 58s");
    }
}
