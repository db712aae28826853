// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Callback management for channel change subscriptions.
//!
//! This module provides the core types for managing subscription callbacks:
//!
//! - [`SubscriptionId`] - Unique identifier for unsubscribing
//! - [`CallbackRegistry`] - Registry for storing and dispatching callbacks

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::state::ChannelChange;
use crate::types::ChannelId;

/// Unique identifier for a subscription.
///
/// Returned when registering a callback and used to unsubscribe later.
/// IDs are unique within one registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a new subscription ID with the given value.
    #[must_use]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sub({})", self.0)
    }
}

/// Callback receiving every change.
type ChangeCallback = Arc<dyn Fn(&ChannelChange) + Send + Sync>;

/// Registry for channel change callbacks.
///
/// Callbacks are kept in registration order and invoked synchronously on the
/// dispatching thread, so a subscriber observes changes in exactly the order
/// the registry applied them.
///
/// # Thread Safety
///
/// The maps are guarded by `parking_lot::RwLock`. Callbacks run while the
/// read lock is held; registering or removing a subscription from inside a
/// callback deadlocks.
pub struct CallbackRegistry {
    /// Counter for generating unique subscription IDs.
    next_id: AtomicU64,
    /// Callbacks for all channels.
    change_callbacks: RwLock<BTreeMap<SubscriptionId, ChangeCallback>>,
    /// Callbacks scoped to a single channel.
    channel_callbacks: RwLock<BTreeMap<SubscriptionId, (ChannelId, ChangeCallback)>>,
}

impl CallbackRegistry {
    /// Creates a new empty callback registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            change_callbacks: RwLock::new(BTreeMap::new()),
            channel_callbacks: RwLock::new(BTreeMap::new()),
        }
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a callback for changes on any channel.
    pub fn on_change<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChannelChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.change_callbacks.write().insert(id, Arc::new(callback));
        id
    }

    /// Registers a callback for changes on one channel.
    pub fn on_channel_changed<F>(&self, channel: ChannelId, callback: F) -> SubscriptionId
    where
        F: Fn(&ChannelChange) + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.channel_callbacks
            .write()
            .insert(id, (channel, Arc::new(callback)));
        id
    }

    /// Unregisters a callback by its subscription ID.
    ///
    /// Returns `true` if a callback was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        if self.change_callbacks.write().remove(&id).is_some() {
            return true;
        }
        self.channel_callbacks.write().remove(&id).is_some()
    }

    /// Clears all callbacks.
    pub fn clear(&self) {
        self.change_callbacks.write().clear();
        self.channel_callbacks.write().clear();
    }

    /// Dispatches a change to every matching callback.
    ///
    /// Channel-wide callbacks run first, then channel-scoped ones, each group
    /// in registration order.
    pub fn dispatch(&self, change: &ChannelChange) {
        {
            let callbacks = self.change_callbacks.read();
            for callback in callbacks.values() {
                callback(change);
            }
        }

        let callbacks = self.channel_callbacks.read();
        for (channel, callback) in callbacks.values() {
            if *channel == change.channel {
                callback(change);
            }
        }
    }

    /// Returns the total number of registered callbacks.
    #[must_use]
    pub fn total_callbacks(&self) -> usize {
        self.change_callbacks.read().len() + self.channel_callbacks.read().len()
    }

    /// Returns `true` if no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_callbacks() == 0
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("change_callbacks", &self.change_callbacks.read().len())
            .field("channel_callbacks", &self.channel_callbacks.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChangeCause, ChannelMetadata, DeviceChannel};
    use crate::types::PowerState;
    use parking_lot::Mutex;

    fn change(channel: u16, state: PowerState) -> ChannelChange {
        ChannelChange::new(
            ChangeCause::Confirmed,
            DeviceChannel::new(ChannelId::new(channel), state, ChannelMetadata::default()),
        )
    }

    #[test]
    fn subscription_ids_are_unique() {
        let registry = CallbackRegistry::new();
        let a = registry.on_change(|_| {});
        let b = registry.on_change(|_| {});
        assert_ne!(a, b);
        assert_eq!(registry.total_callbacks(), 2);
    }

    #[test]
    fn dispatch_reaches_change_callbacks() {
        let registry = CallbackRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.on_change(move |c| sink.lock().push((c.channel, c.displayed)));

        registry.dispatch(&change(1, PowerState::On));
        registry.dispatch(&change(2, PowerState::Off));

        assert_eq!(
            *seen.lock(),
            vec![
                (ChannelId::new(1), PowerState::On),
                (ChannelId::new(2), PowerState::Off)
            ]
        );
    }

    #[test]
    fn channel_callbacks_filter_by_channel() {
        let registry = CallbackRegistry::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&hits);
        registry.on_channel_changed(ChannelId::new(3), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.dispatch(&change(1, PowerState::On));
        registry.dispatch(&change(3, PowerState::On));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let registry = CallbackRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            let sink = Arc::clone(&order);
            registry.on_change(move |_| sink.lock().push(tag));
        }

        registry.dispatch(&change(0, PowerState::On));
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribe_removes_callback() {
        let registry = CallbackRegistry::new();
        let id = registry.on_channel_changed(ChannelId::new(1), |_| {});
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_removes_everything() {
        let registry = CallbackRegistry::new();
        registry.on_change(|_| {});
        registry.on_channel_changed(ChannelId::new(1), |_| {});
        registry.clear();
        assert!(registry.is_empty());
    }
}
