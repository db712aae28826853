// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast bus for operator notices.

use tokio::sync::broadcast;

use super::Notice;

/// Default channel capacity for the notice bus.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Bus broadcasting [`Notice`]s to any number of subscribers.
///
/// Backed by a tokio broadcast channel. A subscriber that falls behind by
/// more than the capacity loses the oldest notices and receives
/// `RecvError::Lagged`; notices are transient, so that is acceptable.
///
/// # Examples
///
/// ```
/// use relay_panel::event::{Notice, NoticeBus};
/// use relay_panel::types::ChannelId;
///
/// let bus = NoticeBus::new();
/// let mut rx = bus.subscribe();
/// bus.publish(Notice::channel_not_found(ChannelId::new(2)));
/// assert_eq!(rx.try_recv().unwrap().channel(), ChannelId::new(2));
/// ```
#[derive(Debug, Clone)]
pub struct NoticeBus {
    sender: broadcast::Sender<Notice>,
}

impl NoticeBus {
    /// Creates a new bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a new bus with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to notices published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes a notice to all subscribers.
    ///
    /// If there are no subscribers the notice is dropped.
    pub fn publish(&self, notice: Notice) {
        // No subscribers is not an error
        let _ = self.sender.send(notice);
    }
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelId;

    #[test]
    fn new_bus_has_no_subscribers() {
        assert_eq!(NoticeBus::new().subscriber_count(), 0);
    }

    #[test]
    fn drop_subscriber_decrements_count() {
        let bus = NoticeBus::new();
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn publish_delivers_to_every_subscriber() {
        let bus = NoticeBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Notice::channel_not_found(ChannelId::new(6)));

        assert_eq!(rx1.recv().await.unwrap().channel(), ChannelId::new(6));
        assert_eq!(rx2.recv().await.unwrap().channel(), ChannelId::new(6));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = NoticeBus::new();
        bus.publish(Notice::channel_not_found(ChannelId::new(1)));
    }

    #[test]
    fn clone_shares_same_channel() {
        let bus1 = NoticeBus::with_capacity(8);
        let bus2 = bus1.clone();
        let _rx = bus1.subscribe();
        assert_eq!(bus2.subscriber_count(), 1);
    }
}
