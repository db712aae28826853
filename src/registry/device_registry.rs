// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Registry of every channel's last-known state.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::state::{ChangeCause, ChannelChange, ChannelMetadata, DeviceChannel, PendingOutcome};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::{ChannelId, PowerState};

/// Single source of truth for rendering channel state.
///
/// The registry owns every [`DeviceChannel`]. Channels are created the first
/// time they are observed and never removed. Each mutation that changes a
/// channel dispatches one [`ChannelChange`] to subscribers before the
/// mutating call returns.
///
/// # Examples
///
/// ```
/// use relay_panel::registry::DeviceRegistry;
/// use relay_panel::state::{ChannelMetadata, PendingOutcome};
/// use relay_panel::types::{ChannelId, PowerState};
///
/// let mut registry = DeviceRegistry::new();
/// let id = ChannelId::new(1);
///
/// registry.upsert(id, PowerState::Off, ChannelMetadata::new("Fan", true, false));
/// registry.set_pending(id, PowerState::On)?;
/// assert_eq!(registry.get(id).unwrap().displayed(), PowerState::On);
///
/// registry.clear_pending(id, PendingOutcome::RolledBack)?;
/// assert_eq!(registry.get(id).unwrap().displayed(), PowerState::Off);
/// # Ok::<(), relay_panel::Error>(())
/// ```
#[derive(Debug)]
pub struct DeviceRegistry {
    channels: BTreeMap<ChannelId, DeviceChannel>,
    callbacks: Arc<CallbackRegistry>,
}

impl DeviceRegistry {
    /// Creates an empty registry with its own callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_callbacks(Arc::new(CallbackRegistry::new()))
    }

    /// Creates an empty registry that dispatches to a shared callback registry.
    #[must_use]
    pub fn with_callbacks(callbacks: Arc<CallbackRegistry>) -> Self {
        Self {
            channels: BTreeMap::new(),
            callbacks,
        }
    }

    /// Returns the callback registry notifications are dispatched to.
    #[must_use]
    pub fn callbacks(&self) -> &Arc<CallbackRegistry> {
        &self.callbacks
    }

    /// Returns a channel by identifier.
    #[must_use]
    pub fn get(&self, id: ChannelId) -> Option<&DeviceChannel> {
        self.channels.get(&id)
    }

    /// Returns `true` if the channel is known.
    #[must_use]
    pub fn contains(&self, id: ChannelId) -> bool {
        self.channels.contains_key(&id)
    }

    /// Returns all channels ordered by identifier.
    pub fn channels(&self) -> impl Iterator<Item = &DeviceChannel> {
        self.channels.values()
    }

    /// Returns the number of known channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if no channel has been observed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Creates or updates a channel's confirmed state and metadata.
    ///
    /// Never touches the pending value. Applying the same values twice is a
    /// no-op and emits nothing the second time.
    ///
    /// Returns `true` if anything changed.
    pub fn upsert(&mut self, id: ChannelId, confirmed: PowerState, metadata: ChannelMetadata) -> bool {
        let cause = match self.channels.get_mut(&id) {
            None => {
                self.channels
                    .insert(id, DeviceChannel::new(id, confirmed, metadata));
                ChangeCause::Created
            }
            Some(channel) => {
                let state_changed = channel.confirmed() != confirmed;
                let metadata_changed = *channel.metadata() != metadata;
                if !state_changed && !metadata_changed {
                    return false;
                }
                channel.set_confirmed(confirmed);
                channel.set_metadata(metadata);
                if state_changed {
                    ChangeCause::Confirmed
                } else {
                    ChangeCause::MetadataUpdated
                }
            }
        };
        self.notify(id, cause);
        true
    }

    /// Replaces a known channel's metadata without touching its state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotFound`] if the channel is unknown.
    pub fn update_metadata(&mut self, id: ChannelId, metadata: ChannelMetadata) -> Result<bool> {
        let channel = self
            .channels
            .get_mut(&id)
            .ok_or(Error::ChannelNotFound(id))?;
        if *channel.metadata() == metadata {
            return Ok(false);
        }
        channel.set_metadata(metadata);
        self.notify(id, ChangeCause::MetadataUpdated);
        Ok(true)
    }

    /// Records an optimistic write for a channel.
    ///
    /// A new value replaces any existing pending value. When the channel is
    /// settled and `desired` equals the confirmed value there is nothing to
    /// reconcile, so nothing is recorded.
    ///
    /// Returns `true` if a pending value was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotFound`] if the channel is unknown.
    pub fn set_pending(&mut self, id: ChannelId, desired: PowerState) -> Result<bool> {
        let channel = self
            .channels
            .get_mut(&id)
            .ok_or(Error::ChannelNotFound(id))?;
        match channel.pending() {
            Some(current) if current == desired => return Ok(false),
            None if channel.confirmed() == desired => return Ok(false),
            _ => {}
        }
        channel.set_pending(Some(desired));
        self.notify(id, ChangeCause::PendingSet);
        Ok(true)
    }

    /// Settles a channel's optimistic write.
    ///
    /// Returns `true` if a pending value existed and was cleared.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotFound`] if the channel is unknown.
    pub fn clear_pending(&mut self, id: ChannelId, outcome: PendingOutcome) -> Result<bool> {
        let channel = self
            .channels
            .get_mut(&id)
            .ok_or(Error::ChannelNotFound(id))?;
        if !channel.is_pending() {
            return Ok(false);
        }
        channel.set_pending(None);
        let cause = match outcome {
            PendingOutcome::Confirmed(state) => {
                channel.set_confirmed(state);
                ChangeCause::PendingConfirmed
            }
            PendingOutcome::RolledBack => ChangeCause::PendingRolledBack,
        };
        self.notify(id, cause);
        Ok(true)
    }

    fn notify(&self, id: ChannelId, cause: ChangeCause) {
        if let Some(channel) = self.channels.get(&id) {
            let change = ChannelChange::new(cause, channel.clone());
            tracing::trace!(channel = %id, ?cause, displayed = %change.displayed, "Channel changed");
            self.callbacks.dispatch(&change);
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscribable for DeviceRegistry {
    fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChannelChange) + Send + Sync + 'static,
    {
        self.callbacks.on_change(callback)
    }

    fn on_channel_changed<F>(&self, channel: ChannelId, callback: F) -> SubscriptionId
    where
        F: Fn(&ChannelChange) + Send + Sync + 'static,
    {
        self.callbacks.on_channel_changed(channel, callback)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.callbacks.unsubscribe(id)
    }
}
