// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Panel system status as reported by `/api/status`.

use serde::{Deserialize, Serialize};

use super::Uptime;

/// Health information about the panel itself.
///
/// # Examples
///
/// ```
/// use relay_panel::types::SystemStatus;
///
/// let json = r#"{
///     "wifi": {"connected": true, "ssid": "home", "rssi": -61, "ip": "192.168.1.40"},
///     "uptime": 3605,
///     "freeHeap": 182344
/// }"#;
/// let status: SystemStatus = serde_json::from_str(json).unwrap();
/// assert!(status.wifi.connected);
/// assert_eq!(status.uptime.to_string(), "1h 0m 5s");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// Wi-Fi link information.
    pub wifi: WifiStatus,
    /// Time since boot.
    pub uptime: Uptime,
    /// Free heap in bytes, if reported.
    #[serde(default)]
    pub free_heap: Option<u64>,
}

/// Wi-Fi link information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiStatus {
    /// Whether the station is associated.
    pub connected: bool,
    /// Network name.
    #[serde(default)]
    pub ssid: Option<String>,
    /// Signal strength in dBm.
    #[serde(default)]
    pub rssi: Option<i32>,
    /// Station IP address.
    #[serde(default)]
    pub ip: Option<String>,
}

impl WifiStatus {
    /// Returns the status bar text for the link.
    #[must_use]
    pub fn label(&self) -> &'static str {
        if self.connected {
            "Connected"
        } else {
            "Disconnected"
        }
    }
}
