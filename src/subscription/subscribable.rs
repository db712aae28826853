// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscribable trait for sources of channel change notifications.

use crate::state::ChannelChange;
use crate::subscription::SubscriptionId;
use crate::types::ChannelId;

/// Trait for types that publish channel change notifications.
///
/// Implemented by the [`DeviceRegistry`](crate::registry::DeviceRegistry)
/// and by the [`SyncEngine`](crate::sync::SyncEngine), which forwards its
/// registry's notifications. Views attach through this trait so they work
/// against either.
///
/// # Examples
///
/// ```
/// use relay_panel::registry::DeviceRegistry;
/// use relay_panel::subscription::Subscribable;
///
/// let registry = DeviceRegistry::new();
/// let sub_id = registry.on_change(|change| {
///     println!("channel {} now shows {}", change.channel, change.displayed);
/// });
/// registry.unsubscribe(sub_id);
/// ```
pub trait Subscribable {
    /// Subscribes to changes on every channel.
    fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChannelChange) + Send + Sync + 'static;

    /// Subscribes to changes on a single channel.
    fn on_channel_changed<F>(&self, channel: ChannelId, callback: F) -> SubscriptionId
    where
        F: Fn(&ChannelChange) + Send + Sync + 'static;

    /// Unsubscribes a callback by its subscription ID.
    ///
    /// Returns `true` if the subscription was found and removed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
