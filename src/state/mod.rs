// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel state types.
//!
//! [`DeviceChannel`] is the per-channel record held by the
//! [`DeviceRegistry`](crate::registry::DeviceRegistry). [`ChannelChange`] is
//! the notification emitted whenever a record changes.
//!
//! # Examples
//!
//! ```
//! use relay_panel::state::{ChannelMetadata, DeviceChannel};
//! use relay_panel::types::{ChannelId, PowerState};
//!
//! let channel = DeviceChannel::new(
//!     ChannelId::new(0),
//!     PowerState::On,
//!     ChannelMetadata::new("Porch", true, false),
//! );
//! assert!(!channel.is_pending());
//! assert_eq!(channel.displayed(), PowerState::On);
//! ```

mod channel_change;
mod device_channel;

pub use channel_change::{ChangeCause, ChannelChange, PendingOutcome};
pub use device_channel::{ChannelMetadata, DeviceChannel};
