// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operator-facing notices.

use chrono::{DateTime, Utc};

use crate::types::ChannelId;

use super::NoticeId;

/// What a notice is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeKind {
    /// A toggle request failed or timed out and the switch was rolled back.
    ToggleFailed {
        /// The affected channel.
        channel: ChannelId,
        /// Display name of the channel.
        name: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A toggle targeted a channel the registry does not know.
    ChannelNotFound {
        /// The requested channel.
        channel: ChannelId,
    },

    /// A toggle targeted a channel this session may not switch.
    NotControllable {
        /// The affected channel.
        channel: ChannelId,
        /// Display name of the channel.
        name: String,
    },
}

/// A transient, dismissible message for the operator.
///
/// Notices are produced by the sync engine for recoverable toggle errors.
/// Stream and poll failures are logged instead.
///
/// # Examples
///
/// ```
/// use relay_panel::event::Notice;
/// use relay_panel::types::ChannelId;
///
/// let notice = Notice::toggle_failed(ChannelId::new(5), "Boiler", "request timed out after 5000 ms");
/// assert_eq!(notice.channel(), ChannelId::new(5));
/// assert_eq!(notice.message(), "Could not switch Boiler: request timed out after 5000 ms");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Identifier used for dismissal.
    pub id: NoticeId,
    /// When the notice was raised.
    pub raised_at: DateTime<Utc>,
    /// The notice payload.
    pub kind: NoticeKind,
}

impl Notice {
    /// Creates a notice raised now.
    #[must_use]
    pub fn new(kind: NoticeKind) -> Self {
        Self {
            id: NoticeId::new(),
            raised_at: Utc::now(),
            kind,
        }
    }

    /// Creates a toggle failure notice.
    #[must_use]
    pub fn toggle_failed(channel: ChannelId, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(NoticeKind::ToggleFailed {
            channel,
            name: name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an unknown channel notice.
    #[must_use]
    pub fn channel_not_found(channel: ChannelId) -> Self {
        Self::new(NoticeKind::ChannelNotFound { channel })
    }

    /// Creates a permission notice.
    #[must_use]
    pub fn not_controllable(channel: ChannelId, name: impl Into<String>) -> Self {
        Self::new(NoticeKind::NotControllable {
            channel,
            name: name.into(),
        })
    }

    /// Returns the channel the notice refers to.
    #[must_use]
    pub fn channel(&self) -> ChannelId {
        match &self.kind {
            NoticeKind::ToggleFailed { channel, .. }
            | NoticeKind::ChannelNotFound { channel }
            | NoticeKind::NotControllable { channel, .. } => *channel,
        }
    }

    /// Returns `true` for toggle failures.
    #[must_use]
    pub fn is_toggle_failure(&self) -> bool {
        matches!(self.kind, NoticeKind::ToggleFailed { .. })
    }

    /// Returns the text shown to the operator, naming the affected device.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.kind {
            NoticeKind::ToggleFailed { name, reason, .. } => {
                format!("Could not switch {name}: {reason}")
            }
            NoticeKind::ChannelNotFound { channel } => {
                format!("Device on channel {channel} is no longer available")
            }
            NoticeKind::NotControllable { name, .. } => {
                format!("You are not allowed to switch {name}")
            }
        }
    }
}
