// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inputs consumed and effects produced by the [`Reconciler`](super::Reconciler).

use crate::error::{Error, TransportError};
use crate::event::Notice;
use crate::protocol::{ChannelDescriptor, PushEvent, ToggleAck};
use crate::types::{ChannelId, PowerState};

/// Sequence number of a toggle request, monotonically increasing per channel.
pub type ToggleSeq = u64;

/// One event for the reconciler.
///
/// Every source that can change a channel (the operator, toggle responses,
/// the push stream, and the poller) is funnelled through this type so the
/// ordering rules live in a single reducer.
#[derive(Debug)]
pub enum SyncInput {
    /// The operator switched a channel to `desired`.
    ToggleRequested {
        /// Target channel.
        channel: ChannelId,
        /// Requested state.
        desired: PowerState,
    },

    /// A toggle request completed.
    ToggleResolved {
        /// Target channel.
        channel: ChannelId,
        /// Sequence number the request was issued with.
        seq: ToggleSeq,
        /// What the transport answered.
        result: Result<ToggleAck, TransportError>,
    },

    /// A toggle request exceeded its time bound.
    ToggleTimedOut {
        /// Target channel.
        channel: ChannelId,
        /// Sequence number the request was issued with.
        seq: ToggleSeq,
        /// Bound that expired, in milliseconds.
        after_ms: u64,
    },

    /// The push stream reported a state change.
    Push(PushEvent),

    /// A full poll snapshot arrived.
    Poll(Vec<ChannelDescriptor>),
}

/// Side effect requested by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEffect {
    /// Issue a toggle request and report back with `seq`.
    SendToggle {
        /// Target channel.
        channel: ChannelId,
        /// Sequence number to echo in the result.
        seq: ToggleSeq,
        /// Requested state.
        desired: PowerState,
    },

    /// Surface a notice to the operator.
    Notify(Notice),
}

/// Result of applying one [`SyncInput`].
#[derive(Debug, Default)]
pub struct Reaction {
    /// Effects to perform, in order.
    pub effects: Vec<SyncEffect>,
    /// Set when a toggle request was refused without touching state.
    pub refused: Option<Error>,
}

impl Reaction {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    pub(crate) fn effect(effect: SyncEffect) -> Self {
        Self {
            effects: vec![effect],
            refused: None,
        }
    }

    pub(crate) fn refuse(error: Error, notice: Notice) -> Self {
        Self {
            effects: vec![SyncEffect::Notify(notice)],
            refused: Some(error),
        }
    }

    /// Returns the notices among the effects.
    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.effects.iter().filter_map(|effect| match effect {
            SyncEffect::Notify(notice) => Some(notice),
            SyncEffect::SendToggle { .. } => None,
        })
    }

    /// Returns the toggle request to issue, if any.
    #[must_use]
    pub fn toggle_request(&self) -> Option<(ChannelId, ToggleSeq, PowerState)> {
        self.effects.iter().find_map(|effect| match effect {
            SyncEffect::SendToggle {
                channel,
                seq,
                desired,
            } => Some((*channel, *seq, *desired)),
            SyncEffect::Notify(_) => None,
        })
    }
}
