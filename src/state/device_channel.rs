// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Last-known state of a single relay channel.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, PowerState};

/// Descriptive fields of a channel that travel alongside its state.
///
/// These are replaced wholesale whenever the panel reports the channel;
/// reconciliation never looks at them except for `controllable`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Display label as configured on the hardware.
    pub name: String,
    /// Whether the current session may switch this channel.
    pub controllable: bool,
    /// Whether the channel is exposed to voice assistants.
    pub alexa_enabled: bool,
}

impl ChannelMetadata {
    /// Creates metadata for a channel.
    #[must_use]
    pub fn new(name: impl Into<String>, controllable: bool, alexa_enabled: bool) -> Self {
        Self {
            name: name.into(),
            controllable,
            alexa_enabled,
        }
    }
}

/// Tracked state of one relay channel.
///
/// `confirmed` is the last value acknowledged by the panel. `pending` holds
/// the operator's intent while a toggle request is in flight, and wins over
/// `confirmed` for display until the request settles.
///
/// # Examples
///
/// ```
/// use relay_panel::state::{ChannelMetadata, DeviceChannel};
/// use relay_panel::types::{ChannelId, PowerState};
///
/// let channel = DeviceChannel::new(
///     ChannelId::new(1),
///     PowerState::Off,
///     ChannelMetadata::new("Garden_Pump", true, false),
/// );
/// assert_eq!(channel.displayed(), PowerState::Off);
/// assert_eq!(channel.display_name(), "Garden Pump");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceChannel {
    id: ChannelId,
    confirmed: PowerState,
    pending: Option<PowerState>,
    metadata: ChannelMetadata,
}

impl DeviceChannel {
    /// Creates a settled channel.
    #[must_use]
    pub fn new(id: ChannelId, confirmed: PowerState, metadata: ChannelMetadata) -> Self {
        Self {
            id,
            confirmed,
            pending: None,
            metadata,
        }
    }

    /// Returns the channel identifier.
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Returns the last value acknowledged by the panel.
    #[must_use]
    pub fn confirmed(&self) -> PowerState {
        self.confirmed
    }

    /// Returns the in-flight optimistic value, if any.
    #[must_use]
    pub fn pending(&self) -> Option<PowerState> {
        self.pending
    }

    /// Returns `true` while an optimistic write is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns the value the UI should show.
    #[must_use]
    pub fn displayed(&self) -> PowerState {
        self.pending.unwrap_or(self.confirmed)
    }

    /// Returns the descriptive fields.
    #[must_use]
    pub fn metadata(&self) -> &ChannelMetadata {
        &self.metadata
    }

    /// Returns the hardware-defined name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Returns the name as shown on the panel card (underscores as spaces).
    #[must_use]
    pub fn display_name(&self) -> String {
        self.metadata.name.replace('_', " ")
    }

    /// Returns whether this session may switch the channel.
    #[must_use]
    pub fn controllable(&self) -> bool {
        self.metadata.controllable
    }

    /// Returns the voice-assistant flag.
    #[must_use]
    pub fn alexa_enabled(&self) -> bool {
        self.metadata.alexa_enabled
    }

    pub(crate) fn set_confirmed(&mut self, state: PowerState) {
        self.confirmed = state;
    }

    pub(crate) fn set_pending(&mut self, state: Option<PowerState>) {
        self.pending = state;
    }

    pub(crate) fn set_metadata(&mut self, metadata: ChannelMetadata) {
        self.metadata = metadata;
    }
}
