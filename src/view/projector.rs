// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Projection of registry state onto a render target.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::state::DeviceChannel;
use crate::subscription::{Subscribable, SubscriptionId};
use crate::types::ChannelId;

/// Everything a channel card needs to draw itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    /// Channel identifier.
    pub channel: ChannelId,
    /// Card title.
    pub label: String,
    /// `"ON"` or `"OFF"`.
    pub status_text: &'static str,
    /// Switch position.
    pub switch_on: bool,
    /// Whether the switch accepts input.
    pub switch_enabled: bool,
    /// Whether the position is an unconfirmed operator write.
    pub pending: bool,
}

impl From<&DeviceChannel> for ChannelView {
    fn from(channel: &DeviceChannel) -> Self {
        let displayed = channel.displayed();
        Self {
            channel: channel.id(),
            label: channel.display_name(),
            status_text: displayed.as_str(),
            switch_on: displayed.is_on(),
            switch_enabled: channel.controllable(),
            pending: channel.is_pending(),
        }
    }
}

/// Something that can draw a channel card.
///
/// Implemented for any `Fn(&ChannelView)` closure.
pub trait RenderTarget: Send + Sync + 'static {
    /// Redraws one channel.
    fn render_channel(&self, view: &ChannelView);
}

impl<F> RenderTarget for F
where
    F: Fn(&ChannelView) + Send + Sync + 'static,
{
    fn render_channel(&self, view: &ChannelView) {
        self(view);
    }
}

/// Keeps a [`RenderTarget`] in step with change notifications.
///
/// The projector only reads the snapshot carried by each notification and
/// re-renders the affected channel. It never polls or mutates state.
///
/// # Examples
///
/// ```
/// use relay_panel::registry::DeviceRegistry;
/// use relay_panel::state::ChannelMetadata;
/// use relay_panel::types::{ChannelId, PowerState};
/// use relay_panel::view::{ChannelView, ViewProjector};
///
/// let mut registry = DeviceRegistry::new();
/// let projector = ViewProjector::attach(&registry, |view: &ChannelView| {
///     println!("{}: {}", view.label, view.status_text);
/// });
///
/// registry.upsert(ChannelId::new(1), PowerState::On, ChannelMetadata::new("Porch_Light", true, false));
/// projector.detach(&registry);
/// ```
pub struct ViewProjector {
    target: Arc<dyn RenderTarget>,
    subscription: SubscriptionId,
}

impl ViewProjector {
    /// Subscribes `target` to every channel of `source`.
    pub fn attach<S, R>(source: &S, target: R) -> Self
    where
        S: Subscribable + ?Sized,
        R: RenderTarget,
    {
        let target: Arc<dyn RenderTarget> = Arc::new(target);
        let sink = Arc::clone(&target);
        let subscription = source.on_change(move |change| {
            sink.render_channel(&ChannelView::from(&change.snapshot));
        });
        Self {
            target,
            subscription,
        }
    }

    /// Subscribes `target` to a single channel of `source`.
    pub fn attach_channel<S, R>(source: &S, channel: ChannelId, target: R) -> Self
    where
        S: Subscribable + ?Sized,
        R: RenderTarget,
    {
        let target: Arc<dyn RenderTarget> = Arc::new(target);
        let sink = Arc::clone(&target);
        let subscription = source.on_channel_changed(channel, move |change| {
            sink.render_channel(&ChannelView::from(&change.snapshot));
        });
        Self {
            target,
            subscription,
        }
    }

    /// Draws the given channels once, for the initial page.
    ///
    /// Attach first, then render the current snapshot, so no change falls
    /// between the two.
    pub fn render_snapshot<'a>(&self, channels: impl IntoIterator<Item = &'a DeviceChannel>) {
        for channel in channels {
            self.target.render_channel(&ChannelView::from(channel));
        }
    }

    /// Returns the subscription backing this projector.
    #[must_use]
    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Unsubscribes from `source`.
    ///
    /// Returns `true` if the subscription was still active.
    pub fn detach<S>(self, source: &S) -> bool
    where
        S: Subscribable + ?Sized,
    {
        source.unsubscribe(self.subscription)
    }
}

impl fmt::Debug for ViewProjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewProjector")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeviceRegistry;
    use crate::state::ChannelMetadata;
    use crate::types::PowerState;
    use parking_lot::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<ChannelView>>>, impl RenderTarget) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        (log, move |view: &ChannelView| sink.lock().push(view.clone()))
    }

    #[test]
    fn view_shows_pending_intent() {
        let mut registry = DeviceRegistry::new();
        let ch = ChannelId::new(2);
        registry.upsert(ch, PowerState::Off, ChannelMetadata::new("Garden_Pump", true, false));
        registry.set_pending(ch, PowerState::On).unwrap();

        let view = ChannelView::from(registry.get(ch).unwrap());
        assert_eq!(view.label, "Garden Pump");
        assert_eq!(view.status_text, "ON");
        assert!(view.switch_on);
        assert!(view.pending);
        assert!(view.switch_enabled);
    }

    #[test]
    fn locked_channel_disables_switch() {
        let mut registry = DeviceRegistry::new();
        let ch = ChannelId::new(1);
        registry.upsert(ch, PowerState::On, ChannelMetadata::new("Gate", false, false));

        assert!(!ChannelView::from(registry.get(ch).unwrap()).switch_enabled);
    }

    #[test]
    fn renders_only_affected_channel() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(ChannelId::new(1), PowerState::Off, ChannelMetadata::new("A", true, false));
        registry.upsert(ChannelId::new(2), PowerState::Off, ChannelMetadata::new("B", true, false));

        let (log, target) = recorder();
        let _projector = ViewProjector::attach(&registry, target);

        registry.upsert(ChannelId::new(2), PowerState::On, ChannelMetadata::new("B", true, false));

        let rendered = log.lock();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].channel, ChannelId::new(2));
        assert_eq!(rendered[0].status_text, "ON");
    }

    #[test]
    fn channel_projector_ignores_others() {
        let mut registry = DeviceRegistry::new();
        let (log, target) = recorder();
        let _projector = ViewProjector::attach_channel(&registry, ChannelId::new(3), target);

        registry.upsert(ChannelId::new(1), PowerState::On, ChannelMetadata::default());
        registry.upsert(ChannelId::new(3), PowerState::On, ChannelMetadata::default());

        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn render_snapshot_draws_every_channel() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(ChannelId::new(1), PowerState::Off, ChannelMetadata::default());
        registry.upsert(ChannelId::new(2), PowerState::On, ChannelMetadata::default());

        let (log, target) = recorder();
        let projector = ViewProjector::attach(&registry, target);
        projector.render_snapshot(registry.channels());

        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn detach_stops_rendering() {
        let mut registry = DeviceRegistry::new();
        let (log, target) = recorder();
        let projector = ViewProjector::attach(&registry, target);

        assert!(projector.detach(&registry));
        registry.upsert(ChannelId::new(1), PowerState::On, ChannelMetadata::default());

        assert!(log.lock().is_empty());
    }
}
