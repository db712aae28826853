// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-channel reconciliation state machine.

use std::collections::HashMap;

use crate::error::{Error, TransportError};
use crate::event::Notice;
use crate::protocol::{ChannelDescriptor, PushEvent, ToggleAck};
use crate::registry::DeviceRegistry;
use crate::state::PendingOutcome;
use crate::types::{ChannelId, PowerState};

use super::input::{Reaction, SyncEffect, SyncInput, ToggleSeq};

/// The toggle request a channel is currently waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    seq: ToggleSeq,
    desired: PowerState,
}

/// Reconciliation bookkeeping kept next to each registry entry.
#[derive(Debug, Default)]
struct ChannelSync {
    /// Last sequence number handed out.
    next_seq: ToggleSeq,
    /// Outstanding request; `Some` exactly while the channel is pending.
    in_flight: Option<InFlight>,
    /// Latest push value received while pending.
    deferred_push: Option<PowerState>,
}

/// Pure reducer merging operator toggles, toggle results, push events and
/// poll snapshots into the [`DeviceRegistry`].
///
/// The reconciler performs no I/O. Each call to [`apply`](Self::apply)
/// mutates the registry (which notifies subscribers synchronously) and
/// returns the effects the caller must carry out, such as issuing a toggle
/// request tagged with a sequence number. Results are fed back as
/// [`SyncInput::ToggleResolved`] or [`SyncInput::ToggleTimedOut`]; only the
/// one matching the channel's outstanding sequence number is applied.
///
/// # Examples
///
/// ```
/// use relay_panel::protocol::{ChannelDescriptor, ToggleAck};
/// use relay_panel::sync::{Reconciler, SyncInput};
/// use relay_panel::types::{ChannelId, PowerState};
///
/// let mut reconciler = Reconciler::default();
/// let ch = ChannelId::new(3);
/// reconciler.apply(SyncInput::Poll(vec![ChannelDescriptor::new(ch, "Pump", PowerState::Off)]));
///
/// let reaction = reconciler.apply(SyncInput::ToggleRequested { channel: ch, desired: PowerState::On });
/// let (_, seq, _) = reaction.toggle_request().unwrap();
/// assert!(reconciler.is_pending(ch));
///
/// reconciler.apply(SyncInput::ToggleResolved { channel: ch, seq, result: Ok(ToggleAck::accepted()) });
/// assert_eq!(reconciler.registry().get(ch).unwrap().displayed(), PowerState::On);
/// assert!(!reconciler.is_pending(ch));
/// ```
#[derive(Debug, Default)]
pub struct Reconciler {
    registry: DeviceRegistry,
    sync: HashMap<ChannelId, ChannelSync>,
}

impl Reconciler {
    /// Creates a reconciler over an existing registry.
    #[must_use]
    pub fn new(registry: DeviceRegistry) -> Self {
        Self {
            registry,
            sync: HashMap::new(),
        }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Returns `true` while a toggle for `channel` is outstanding.
    #[must_use]
    pub fn is_pending(&self, channel: ChannelId) -> bool {
        self.outstanding_seq(channel).is_some()
    }

    /// Returns the sequence number of the outstanding toggle for `channel`.
    #[must_use]
    pub fn outstanding_seq(&self, channel: ChannelId) -> Option<ToggleSeq> {
        self.sync
            .get(&channel)
            .and_then(|sync| sync.in_flight)
            .map(|flight| flight.seq)
    }

    /// Applies one input.
    pub fn apply(&mut self, input: SyncInput) -> Reaction {
        match input {
            SyncInput::ToggleRequested { channel, desired } => self.request_toggle(channel, desired),
            SyncInput::ToggleResolved {
                channel,
                seq,
                result,
            } => self.resolve_toggle(channel, seq, result),
            SyncInput::ToggleTimedOut {
                channel,
                seq,
                after_ms,
            } => self.resolve_toggle(channel, seq, Err(TransportError::Timeout(after_ms))),
            SyncInput::Push(event) => self.apply_push(event),
            SyncInput::Poll(descriptors) => self.apply_poll(descriptors),
        }
    }

    fn request_toggle(&mut self, channel: ChannelId, desired: PowerState) -> Reaction {
        let Some(entry) = self.registry.get(channel) else {
            tracing::warn!(%channel, "Toggle requested for unknown channel");
            return Reaction::refuse(Error::ChannelNotFound(channel), Notice::channel_not_found(channel));
        };
        if !entry.controllable() {
            tracing::warn!(%channel, "Toggle requested for channel without control permission");
            let notice = Notice::not_controllable(channel, entry.display_name());
            return Reaction::refuse(Error::NotControllable(channel), notice);
        }
        if entry.displayed() == desired {
            tracing::trace!(%channel, %desired, "Channel already shows requested state");
            return Reaction::none();
        }

        if let Err(error) = self.registry.set_pending(channel, desired) {
            return Reaction::refuse(error, Notice::channel_not_found(channel));
        }

        let sync = self.sync.entry(channel).or_default();
        sync.next_seq += 1;
        let seq = sync.next_seq;
        if let Some(previous) = sync.in_flight.replace(InFlight { seq, desired }) {
            tracing::debug!(%channel, seq, superseded = previous.seq, "Superseding in-flight toggle");
        }

        tracing::debug!(%channel, seq, %desired, "Issuing toggle");
        Reaction::effect(SyncEffect::SendToggle {
            channel,
            seq,
            desired,
        })
    }

    fn resolve_toggle(
        &mut self,
        channel: ChannelId,
        seq: ToggleSeq,
        result: Result<ToggleAck, TransportError>,
    ) -> Reaction {
        let Some(sync) = self.sync.get_mut(&channel) else {
            tracing::debug!(%channel, seq, "Discarding toggle result for untracked channel");
            return Reaction::none();
        };
        let flight = match sync.in_flight {
            Some(flight) if flight.seq == seq => flight,
            outstanding => {
                tracing::debug!(
                    %channel,
                    seq,
                    outstanding = ?outstanding.map(|f| f.seq),
                    "Discarding stale toggle result"
                );
                return Reaction::none();
            }
        };
        sync.in_flight = None;
        let deferred = sync.deferred_push.take();

        match result {
            Ok(ack) => {
                let committed = ack.state.unwrap_or(flight.desired);
                if committed != flight.desired {
                    tracing::info!(
                        %channel,
                        seq,
                        requested = %flight.desired,
                        reported = %committed,
                        "Device reported a different state than requested"
                    );
                }
                if deferred.is_some() {
                    tracing::debug!(%channel, seq, "Toggle response supersedes deferred push");
                }
                self.settle(channel, PendingOutcome::Confirmed(committed));
                Reaction::none()
            }
            Err(error) => {
                tracing::warn!(%channel, seq, %error, "Toggle failed, rolling back");
                self.settle(channel, PendingOutcome::RolledBack);
                if let Some(state) = deferred {
                    tracing::debug!(%channel, %state, "Applying deferred push after rollback");
                    self.confirm(channel, state);
                }
                let name = self
                    .registry
                    .get(channel)
                    .map_or_else(|| channel.to_string(), |entry| entry.display_name());
                Reaction::effect(SyncEffect::Notify(Notice::toggle_failed(
                    channel,
                    name,
                    error.to_string(),
                )))
            }
        }
    }

    fn apply_push(&mut self, event: PushEvent) -> Reaction {
        let channel = event.channel;
        if !self.registry.contains(channel) {
            tracing::debug!(%channel, "Ignoring push for unknown channel");
            return Reaction::none();
        }
        if let Some(sync) = self.sync.get_mut(&channel)
            && sync.in_flight.is_some()
        {
            tracing::debug!(%channel, state = %event.state, "Deferring push while toggle is pending");
            sync.deferred_push = Some(event.state);
            return Reaction::none();
        }
        self.confirm(channel, event.state);
        Reaction::none()
    }

    fn apply_poll(&mut self, descriptors: Vec<ChannelDescriptor>) -> Reaction {
        for descriptor in descriptors {
            let channel = descriptor.channel;
            let metadata = descriptor.metadata();
            if self.is_pending(channel) {
                tracing::debug!(%channel, polled = %descriptor.state, "Ignoring polled state while toggle is pending");
                if let Err(error) = self.registry.update_metadata(channel, metadata) {
                    tracing::debug!(%channel, %error, "Could not refresh metadata");
                }
                continue;
            }
            self.registry.upsert(channel, descriptor.state, metadata);
        }
        Reaction::none()
    }

    fn confirm(&mut self, channel: ChannelId, state: PowerState) {
        if let Some(metadata) = self.registry.get(channel).map(|entry| entry.metadata().clone()) {
            self.registry.upsert(channel, state, metadata);
        }
    }

    fn settle(&mut self, channel: ChannelId, outcome: PendingOutcome) {
        if let Err(error) = self.registry.clear_pending(channel, outcome) {
            tracing::warn!(%channel, %error, "Could not settle pending toggle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::state::ChangeCause;
    use crate::subscription::Subscribable;
    use parking_lot::Mutex;
    use std::sync::Arc;

    const OFF: PowerState = PowerState::Off;
    const ON: PowerState = PowerState::On;

    fn reconciler_with(channels: &[(u16, PowerState)]) -> Reconciler {
        let mut reconciler = Reconciler::default();
        let descriptors = channels
            .iter()
            .map(|&(id, state)| ChannelDescriptor::new(id, format!("Relay_{id}"), state))
            .collect();
        reconciler.apply(SyncInput::Poll(descriptors));
        reconciler
    }

    fn toggle(reconciler: &mut Reconciler, channel: ChannelId, desired: PowerState) -> ToggleSeq {
        let reaction = reconciler.apply(SyncInput::ToggleRequested { channel, desired });
        let (ch, seq, value) = reaction.toggle_request().unwrap();
        assert_eq!((ch, value), (channel, desired));
        seq
    }

    fn resolve(reconciler: &mut Reconciler, channel: ChannelId, seq: ToggleSeq, ack: ToggleAck) -> Reaction {
        reconciler.apply(SyncInput::ToggleResolved {
            channel,
            seq,
            result: Ok(ack),
        })
    }

    fn fail(reconciler: &mut Reconciler, channel: ChannelId, seq: ToggleSeq) -> Reaction {
        reconciler.apply(SyncInput::ToggleResolved {
            channel,
            seq,
            result: Err(TransportError::Status {
                code: 500,
                reason: "Internal Server Error".to_string(),
            }),
        })
    }

    fn displayed(reconciler: &Reconciler, channel: ChannelId) -> PowerState {
        reconciler.registry().get(channel).unwrap().displayed()
    }

    fn confirmed(reconciler: &Reconciler, channel: ChannelId) -> PowerState {
        reconciler.registry().get(channel).unwrap().confirmed()
    }

    #[test]
    fn toggle_then_success_settles_on_requested_value() {
        for initial in [OFF, ON] {
            let ch = ChannelId::new(1);
            let mut reconciler = reconciler_with(&[(1, initial)]);
            let desired = initial.toggled();

            let seq = toggle(&mut reconciler, ch, desired);
            assert_eq!(displayed(&reconciler, ch), desired);

            resolve(&mut reconciler, ch, seq, ToggleAck::reported(desired));
            assert!(!reconciler.is_pending(ch));
            assert_eq!(displayed(&reconciler, ch), desired);
            assert_eq!(confirmed(&reconciler, ch), desired);
        }
    }

    #[test]
    fn acknowledgement_without_state_confirms_request() {
        let ch = ChannelId::new(2);
        let mut reconciler = reconciler_with(&[(2, OFF)]);
        let seq = toggle(&mut reconciler, ch, ON);

        resolve(&mut reconciler, ch, seq, ToggleAck::accepted());
        assert_eq!(confirmed(&reconciler, ch), ON);
    }

    #[test]
    fn device_reported_value_wins() {
        let ch = ChannelId::new(2);
        let mut reconciler = reconciler_with(&[(2, OFF)]);
        let seq = toggle(&mut reconciler, ch, ON);

        resolve(&mut reconciler, ch, seq, ToggleAck::reported(OFF));
        assert!(!reconciler.is_pending(ch));
        assert_eq!(displayed(&reconciler, ch), OFF);
    }

    #[test]
    fn failure_rolls_back_exactly_and_notifies() {
        let ch = ChannelId::new(4);
        let mut reconciler = reconciler_with(&[(4, OFF)]);
        let seq = toggle(&mut reconciler, ch, ON);

        let reaction = fail(&mut reconciler, ch, seq);

        assert!(!reconciler.is_pending(ch));
        assert_eq!(displayed(&reconciler, ch), OFF);
        let notices: Vec<_> = reaction.notices().collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message(), "Could not switch Relay 4: HTTP 500 - Internal Server Error");
    }

    #[test]
    fn timeout_rolls_back_with_notice() {
        let ch = ChannelId::new(5);
        let mut reconciler = reconciler_with(&[(5, OFF)]);
        let seq = toggle(&mut reconciler, ch, ON);

        let reaction = reconciler.apply(SyncInput::ToggleTimedOut {
            channel: ch,
            seq,
            after_ms: 5000,
        });

        assert!(!reconciler.is_pending(ch));
        assert_eq!(displayed(&reconciler, ch), OFF);
        let notice = reaction.notices().next().unwrap();
        assert!(notice.is_toggle_failure());
        assert!(notice.message().contains("5000 ms"));
    }

    #[test]
    fn push_while_pending_never_changes_display() {
        let ch = ChannelId::new(3);
        let mut reconciler = reconciler_with(&[(3, OFF)]);
        let seq = toggle(&mut reconciler, ch, ON);

        reconciler.apply(SyncInput::Push(PushEvent::new(ch, OFF)));
        assert_eq!(displayed(&reconciler, ch), ON);
        assert!(reconciler.is_pending(ch));

        resolve(&mut reconciler, ch, seq, ToggleAck::reported(ON));
        assert_eq!(displayed(&reconciler, ch), ON);
        assert!(!reconciler.is_pending(ch));
    }

    #[test]
    fn deferred_push_applies_after_rollback() {
        let ch = ChannelId::new(3);
        let mut reconciler = reconciler_with(&[(3, OFF)]);
        let seq = toggle(&mut reconciler, ch, ON);

        // Someone else switched it on at the wall while our request failed
        reconciler.apply(SyncInput::Push(PushEvent::new(ch, ON)));
        fail(&mut reconciler, ch, seq);

        assert!(!reconciler.is_pending(ch));
        assert_eq!(confirmed(&reconciler, ch), ON);
    }

    #[test]
    fn stale_response_is_discarded() {
        let ch = ChannelId::new(1);
        let mut reconciler = reconciler_with(&[(1, OFF)]);
        let first = toggle(&mut reconciler, ch, ON);
        let second = toggle(&mut reconciler, ch, OFF);
        assert!(second > first);

        // Whatever the stale response says, nothing moves
        let reaction = fail(&mut reconciler, ch, first);
        assert!(reaction.effects.is_empty());
        assert_eq!(reconciler.outstanding_seq(ch), Some(second));
        assert_eq!(displayed(&reconciler, ch), OFF);

        resolve(&mut reconciler, ch, first, ToggleAck::reported(ON));
        assert_eq!(reconciler.outstanding_seq(ch), Some(second));
        assert_eq!(displayed(&reconciler, ch), OFF);
    }

    #[test]
    fn second_toggle_determines_final_state() {
        let ch = ChannelId::new(1);
        let mut reconciler = reconciler_with(&[(1, OFF)]);
        let first = toggle(&mut reconciler, ch, ON);
        let second = toggle(&mut reconciler, ch, OFF);

        resolve(&mut reconciler, ch, second, ToggleAck::reported(OFF));
        resolve(&mut reconciler, ch, first, ToggleAck::reported(ON));

        assert!(!reconciler.is_pending(ch));
        assert_eq!(confirmed(&reconciler, ch), OFF);
    }

    #[test]
    fn stale_timeout_is_discarded() {
        let ch = ChannelId::new(1);
        let mut reconciler = reconciler_with(&[(1, OFF)]);
        let first = toggle(&mut reconciler, ch, ON);
        let _second = toggle(&mut reconciler, ch, OFF);

        let reaction = reconciler.apply(SyncInput::ToggleTimedOut {
            channel: ch,
            seq: first,
            after_ms: 5000,
        });
        assert!(reaction.effects.is_empty());
        assert!(reconciler.is_pending(ch));
    }

    #[test]
    fn poll_ignores_pending_channel_state() {
        let ch = ChannelId::new(7);
        let mut reconciler = reconciler_with(&[(7, ON)]);
        let seq = toggle(&mut reconciler, ch, OFF);

        reconciler.apply(SyncInput::Poll(vec![
            ChannelDescriptor::new(7u16, "Renamed", ON).with_alexa_enabled(true),
        ]));
        assert_eq!(displayed(&reconciler, ch), OFF);
        let entry = reconciler.registry().get(ch).unwrap();
        assert_eq!(entry.name(), "Renamed");
        assert!(entry.alexa_enabled());

        resolve(&mut reconciler, ch, seq, ToggleAck::accepted());
        assert_eq!(displayed(&reconciler, ch), OFF);
    }

    #[test]
    fn poll_updates_settled_channels_and_leaves_absent_ones() {
        let mut reconciler = reconciler_with(&[(1, OFF), (2, OFF)]);

        reconciler.apply(SyncInput::Poll(vec![
            ChannelDescriptor::new(1u16, "Relay_1", ON),
            ChannelDescriptor::new(9u16, "New", ON),
        ]));

        assert_eq!(confirmed(&reconciler, ChannelId::new(1)), ON);
        assert_eq!(confirmed(&reconciler, ChannelId::new(2)), OFF);
        assert_eq!(confirmed(&reconciler, ChannelId::new(9)), ON);
    }

    #[test]
    fn push_while_settled_applies_immediately() {
        let ch = ChannelId::new(1);
        let mut reconciler = reconciler_with(&[(1, OFF)]);
        reconciler.apply(SyncInput::Push(PushEvent::new(ch, ON)));
        assert_eq!(displayed(&reconciler, ch), ON);
    }

    #[test]
    fn push_for_unknown_channel_is_ignored() {
        let mut reconciler = reconciler_with(&[(1, OFF)]);
        reconciler.apply(SyncInput::Push(PushEvent::new(42u16, ON)));
        assert!(!reconciler.registry().contains(ChannelId::new(42)));
    }

    #[test]
    fn toggle_unknown_channel_is_refused() {
        let mut reconciler = reconciler_with(&[(1, OFF)]);
        let reaction = reconciler.apply(SyncInput::ToggleRequested {
            channel: ChannelId::new(8),
            desired: ON,
        });

        assert!(matches!(reaction.refused, Some(Error::ChannelNotFound(_))));
        assert!(reaction.toggle_request().is_none());
        assert_eq!(reaction.notices().count(), 1);
    }

    #[test]
    fn toggle_without_permission_is_refused() {
        let ch = ChannelId::new(1);
        let mut reconciler = Reconciler::default();
        reconciler.apply(SyncInput::Poll(vec![
            ChannelDescriptor::new(ch, "Gate", OFF).with_controllable(false),
        ]));

        let reaction = reconciler.apply(SyncInput::ToggleRequested { channel: ch, desired: ON });

        assert!(matches!(reaction.refused, Some(Error::NotControllable(_))));
        assert!(!reconciler.is_pending(ch));
        assert_eq!(displayed(&reconciler, ch), OFF);
    }

    #[test]
    fn toggle_to_displayed_value_is_noop() {
        let ch = ChannelId::new(1);
        let mut reconciler = reconciler_with(&[(1, ON)]);
        let reaction = reconciler.apply(SyncInput::ToggleRequested { channel: ch, desired: ON });
        assert!(reaction.effects.is_empty());
        assert!(reaction.refused.is_none());
        assert!(!reconciler.is_pending(ch));
    }

    #[test]
    fn notifications_follow_mutation_order() {
        let ch = ChannelId::new(3);
        let mut reconciler = reconciler_with(&[(3, OFF)]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        reconciler
            .registry()
            .on_change(move |change| sink.lock().push((change.cause, change.displayed)));

        let seq = toggle(&mut reconciler, ch, ON);
        reconciler.apply(SyncInput::Push(PushEvent::new(ch, OFF)));
        resolve(&mut reconciler, ch, seq, ToggleAck::reported(ON));

        assert_eq!(
            *log.lock(),
            vec![
                (ChangeCause::PendingSet, ON),
                (ChangeCause::PendingConfirmed, ON)
            ]
        );
    }
}
