// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared across the library.
//!
//! # Types
//!
//! - [`ChannelId`] - Identifier of a relay channel
//! - [`PowerState`] - ON/OFF switch state
//! - [`Uptime`] - Panel uptime with status-bar formatting
//! - [`SystemStatus`] - Panel health as reported by the firmware

mod channel_id;
mod power;
mod status;
mod uptime;

pub use channel_id::ChannelId;
pub use power::PowerState;
pub use status::{SystemStatus, WifiStatus};
pub use uptime::Uptime;
