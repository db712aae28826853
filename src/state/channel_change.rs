// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Change notifications emitted by the device registry.
//!
//! Every registry mutation that alters a channel produces exactly one
//! [`ChannelChange`]. Notifications carry the new displayed value so a view
//! can re-render without reading the registry back, and a full snapshot of
//! the channel for label and permission updates.

use crate::types::{ChannelId, PowerState};

use super::DeviceChannel;

/// Why a channel changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeCause {
    /// The channel was observed for the first time.
    Created,
    /// The panel reported a new confirmed value.
    Confirmed,
    /// Only name, permission or auxiliary flags changed.
    MetadataUpdated,
    /// An optimistic write was recorded.
    PendingSet,
    /// The optimistic write was committed.
    PendingConfirmed,
    /// The optimistic write was discarded.
    PendingRolledBack,
}

impl ChangeCause {
    /// Returns `true` if the change settled an optimistic write.
    #[must_use]
    pub fn is_settlement(&self) -> bool {
        matches!(self, Self::PendingConfirmed | Self::PendingRolledBack)
    }
}

/// How an outstanding optimistic write ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOutcome {
    /// Commit the given value as the new confirmed state.
    ///
    /// This is normally the requested value, but the panel's reported value
    /// is used when it differs.
    Confirmed(PowerState),
    /// Discard the pending value and keep the prior confirmed state.
    RolledBack,
}

/// A single registry change notification.
///
/// # Examples
///
/// ```
/// use relay_panel::state::{ChangeCause, ChannelChange, ChannelMetadata, DeviceChannel};
/// use relay_panel::types::{ChannelId, PowerState};
///
/// let snapshot = DeviceChannel::new(ChannelId::new(1), PowerState::On, ChannelMetadata::default());
/// let change = ChannelChange::new(ChangeCause::Confirmed, snapshot);
/// assert_eq!(change.channel, ChannelId::new(1));
/// assert_eq!(change.displayed, PowerState::On);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelChange {
    /// The channel that changed.
    pub channel: ChannelId,
    /// The value the UI should now show.
    pub displayed: PowerState,
    /// What kind of mutation produced this change.
    pub cause: ChangeCause,
    /// The channel after the mutation.
    pub snapshot: DeviceChannel,
}

impl ChannelChange {
    /// Builds a notification from the post-mutation channel.
    #[must_use]
    pub fn new(cause: ChangeCause, snapshot: DeviceChannel) -> Self {
        Self {
            channel: snapshot.id(),
            displayed: snapshot.displayed(),
            cause,
            snapshot,
        }
    }
}
