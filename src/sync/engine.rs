// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Async driver for the [`Reconciler`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::RwLock;
use tokio::sync::{Notify, broadcast, mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result, TransportError};
use crate::event::{Notice, NoticeBus};
use crate::protocol::Transport;
use crate::registry::DeviceRegistry;
use crate::state::{ChannelChange, DeviceChannel};
use crate::subscription::{CallbackRegistry, Subscribable, SubscriptionId};
use crate::types::{ChannelId, PowerState, SystemStatus};

use super::config::{ReconnectionPolicy, SyncConfig};
use super::input::{SyncEffect, SyncInput, ToggleSeq};
use super::reconciler::Reconciler;

/// Lower bound for timer periods; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Messages processed by the reconciliation task.
#[derive(Debug)]
enum Command {
    Input(SyncInput),
    Toggle {
        channel: ChannelId,
        desired: PowerState,
        reply: oneshot::Sender<Result<()>>,
    },
}

type Inbox = mpsc::UnboundedSender<Command>;

/// Long-lived state-synchronization session with the panel.
///
/// The engine owns a [`Reconciler`] on a dedicated task and feeds it every
/// input one at a time: operator toggles, toggle results (bounded by
/// [`SyncConfig::toggle_timeout`]), push events, and periodic polls. The
/// push stream is reopened with exponential backoff when it drops; polling
/// continues regardless.
///
/// Reads ([`channel`](Self::channel), [`channels`](Self::channels)) are
/// served from a snapshot kept current by the registry's change
/// notifications, so they are safe to call from inside a change callback.
///
/// Dropping the engine, or calling [`shutdown`](Self::shutdown), stops every
/// background task.
///
/// # Examples
///
/// ```no_run
/// use relay_panel::protocol::HttpConfig;
/// use relay_panel::subscription::Subscribable;
/// use relay_panel::sync::{SyncConfig, SyncEngine};
/// use relay_panel::types::{ChannelId, PowerState};
///
/// #[tokio::main]
/// async fn main() -> relay_panel::Result<()> {
///     let transport = HttpConfig::new("192.168.4.1").into_transport()?;
///     let engine = SyncEngine::start(transport, SyncConfig::default()).await?;
///
///     engine.on_change(|change| {
///         println!("{} is now {}", change.snapshot.display_name(), change.displayed);
///     });
///
///     engine.toggle(ChannelId::new(3), PowerState::On).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct SyncEngine {
    inbox: Inbox,
    channels: Arc<RwLock<BTreeMap<ChannelId, DeviceChannel>>>,
    callbacks: Arc<CallbackRegistry>,
    notices: NoticeBus,
    status: watch::Receiver<Option<SystemStatus>>,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
}

impl SyncEngine {
    /// Bootstraps the registry from an initial poll and starts syncing.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the initial poll fails; without it
    /// there is nothing to render.
    pub async fn start<T: Transport>(transport: T, config: SyncConfig) -> Result<Self> {
        let transport = Arc::new(transport);
        let snapshot = transport.poll_snapshot().await?;

        let callbacks = Arc::new(CallbackRegistry::new());
        let channels = Arc::new(RwLock::new(BTreeMap::new()));
        {
            // Registered first so user callbacks observe an up-to-date mirror
            let mirror = Arc::clone(&channels);
            callbacks.on_change(move |change: &ChannelChange| {
                mirror.write().insert(change.channel, change.snapshot.clone());
            });
        }

        let mut reconciler = Reconciler::new(DeviceRegistry::with_callbacks(Arc::clone(&callbacks)));
        reconciler.apply(SyncInput::Poll(snapshot));
        tracing::info!(channels = reconciler.registry().len(), "Registry bootstrapped");

        let (inbox, commands) = mpsc::unbounded_channel();
        let notices = NoticeBus::with_capacity(config.notice_capacity.max(1));
        let (status_tx, status) = watch::channel(None);
        let refresh = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let driver = Driver {
            transport: Arc::clone(&transport),
            inbox: inbox.clone(),
            notices: notices.clone(),
            toggle_timeout: config.toggle_timeout,
            cancel: cancel.clone(),
        };
        tokio::spawn(driver.run(reconciler, commands));

        tokio::spawn(poll_loop(
            Arc::clone(&transport),
            inbox.clone(),
            config.poll_interval,
            Arc::clone(&refresh),
            cancel.clone(),
        ));

        tokio::spawn(push_loop(
            Arc::clone(&transport),
            inbox.clone(),
            config.reconnection,
            Arc::clone(&refresh),
            cancel.clone(),
        ));

        if let Some(interval) = config.status_interval {
            tokio::spawn(status_loop(transport, status_tx, interval, cancel.clone()));
        }

        Ok(Self {
            inbox,
            channels,
            callbacks,
            notices,
            status,
            refresh,
            cancel,
        })
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Switches a channel to `desired`.
    ///
    /// Returns once the optimistic value is recorded; the device's answer
    /// arrives later as a change notification (or a notice on failure).
    /// Requesting the value already displayed does nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelNotFound`] if the channel was never observed
    /// - [`Error::NotControllable`] if this session may not switch it
    /// - [`Error::EngineStopped`] after shutdown
    pub async fn toggle(&self, channel: ChannelId, desired: PowerState) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.inbox
            .send(Command::Toggle {
                channel,
                desired,
                reply,
            })
            .map_err(|_| Error::EngineStopped)?;
        response.await.map_err(|_| Error::EngineStopped)?
    }

    /// Requests an immediate poll instead of waiting for the next tick.
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stops every background task.
    ///
    /// Outstanding toggle requests are abandoned. Idempotent.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Shutting down sync engine");
            self.cancel.cancel();
        }
    }

    /// Returns `true` until [`shutdown`](Self::shutdown) is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Returns a snapshot of one channel.
    #[must_use]
    pub fn channel(&self, id: ChannelId) -> Option<DeviceChannel> {
        self.channels.read().get(&id).cloned()
    }

    /// Returns snapshots of every channel, ordered by identifier.
    #[must_use]
    pub fn channels(&self) -> Vec<DeviceChannel> {
        self.channels.read().values().cloned().collect()
    }

    /// Returns the most recent system status, if one was fetched.
    #[must_use]
    pub fn system_status(&self) -> Option<SystemStatus> {
        self.status.borrow().clone()
    }

    /// Returns a receiver tracking the system status.
    #[must_use]
    pub fn watch_status(&self) -> watch::Receiver<Option<SystemStatus>> {
        self.status.clone()
    }

    // =========================================================================
    // Subscription
    // =========================================================================

    /// Subscribes to every channel change. Alias of [`Subscribable::on_change`].
    pub fn subscribe_changes<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChannelChange) + Send + Sync + 'static,
    {
        self.callbacks.on_change(callback)
    }

    /// Subscribes to operator notices raised after this call.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }
}

impl Subscribable for SyncEngine {
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

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// =============================================================================
// Background tasks
// =============================================================================

/// Owns the reconciler and carries out its effects.
struct Driver<T> {
    transport: Arc<T>,
    inbox: Inbox,
    notices: NoticeBus,
    toggle_timeout: Duration,
    cancel: CancellationToken,
}

impl<T: Transport> Driver<T> {
    async fn run(self, mut reconciler: Reconciler, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let command = tokio::select! {
                () = self.cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            match command {
                Command::Input(input) => {
                    let reaction = reconciler.apply(input);
                    self.perform(reaction.effects);
                }
                Command::Toggle {
                    channel,
                    desired,
                    reply,
                } => {
                    let mut reaction = reconciler.apply(SyncInput::ToggleRequested { channel, desired });
                    let outcome = reaction.refused.take().map_or(Ok(()), Err);
                    self.perform(reaction.effects);
                    // The caller may have stopped waiting
                    let _ = reply.send(outcome);
                }
            }
        }
        tracing::debug!("Reconciliation task stopped");
    }

    fn perform(&self, effects: Vec<SyncEffect>) {
        for effect in effects {
            match effect {
                SyncEffect::SendToggle {
                    channel,
                    seq,
                    desired,
                } => self.send_toggle(channel, seq, desired),
                SyncEffect::Notify(notice) => {
                    tracing::debug!(channel = %notice.channel(), message = %notice.message(), "Raising notice");
                    self.notices.publish(notice);
                }
            }
        }
    }

    fn send_toggle(&self, channel: ChannelId, seq: ToggleSeq, desired: PowerState) {
        let transport = Arc::clone(&self.transport);
        let inbox = self.inbox.clone();
        let cancel = self.cancel.clone();
        let bound = self.toggle_timeout;

        tokio::spawn(async move {
            let request = tokio::time::timeout(bound, transport.request_toggle(channel, desired));
            let input = tokio::select! {
                () = cancel.cancelled() => return,
                outcome = request => match outcome {
                    Ok(result) => SyncInput::ToggleResolved { channel, seq, result },
                    Err(_) => SyncInput::ToggleTimedOut {
                        channel,
                        seq,
                        after_ms: u64::try_from(bound.as_millis()).unwrap_or(u64::MAX),
                    },
                },
            };
            // Fails only once the engine has stopped
            let _ = inbox.send(Command::Input(input));
        });
    }
}

async fn poll_loop<T: Transport>(
    transport: Arc<T>,
    inbox: Inbox,
    period: Duration,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and the bootstrap poll already ran
    ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            () = refresh.notified() => ticker.reset(),
        }

        let polled = tokio::select! {
            () = cancel.cancelled() => break,
            polled = transport.poll_snapshot() => polled,
        };
        match polled {
            Ok(descriptors) => {
                tracing::trace!(channels = descriptors.len(), "Poll snapshot received");
                if inbox.send(Command::Input(SyncInput::Poll(descriptors))).is_err() {
                    break;
                }
            }
            Err(error) => tracing::warn!(%error, "Poll failed, keeping last known state"),
        }
    }
    tracing::debug!("Poll task stopped");
}

async fn push_loop<T: Transport>(
    transport: Arc<T>,
    inbox: Inbox,
    policy: ReconnectionPolicy,
    refresh: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;
    let mut connected_before = false;

    loop {
        let opened = tokio::select! {
            () = cancel.cancelled() => break,
            opened = transport.open_push_stream() => opened,
        };

        match opened {
            Ok(mut stream) => {
                if connected_before {
                    tracing::info!(attempt, "Push stream re-established");
                    // Events may have been missed while disconnected
                    refresh.notify_one();
                } else {
                    tracing::info!("Push stream opened");
                }
                connected_before = true;
                attempt = 0;

                loop {
                    let item = tokio::select! {
                        () = cancel.cancelled() => return,
                        item = stream.next() => item,
                    };
                    match item {
                        Some(Ok(event)) => {
                            if inbox.send(Command::Input(SyncInput::Push(event))).is_err() {
                                return;
                            }
                        }
                        Some(Err(error)) => {
                            tracing::warn!(%error, "Push stream failed, falling back to polling");
                            break;
                        }
                        None => {
                            tracing::warn!("Push stream closed, falling back to polling");
                            break;
                        }
                    }
                }
            }
            Err(error) => tracing::warn!(%error, attempt, "Could not open push stream"),
        }

        if !policy.should_retry(attempt) {
            tracing::warn!(attempt, "Giving up on push stream, relying on polling");
            break;
        }
        let delay = policy.delay_for_attempt(attempt);
        attempt = attempt.saturating_add(1);
        tracing::debug!(attempt, ?delay, "Reconnecting push stream");

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }
    tracing::debug!("Push task stopped");
}

async fn status_loop<T: Transport>(
    transport: Arc<T>,
    status: watch::Sender<Option<SystemStatus>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let fetched = tokio::select! {
            () = cancel.cancelled() => break,
            fetched = transport.system_status() => fetched,
        };
        match fetched {
            Ok(current) => {
                tracing::trace!(uptime = %current.uptime, "System status received");
                status.send_replace(Some(current));
            }
            Err(TransportError::Unsupported) => {
                tracing::debug!("Transport has no status endpoint, status polling disabled");
                break;
            }
            Err(error) => tracing::warn!(%error, "Status poll failed"),
        }
    }
    tracing::debug!("Status task stopped");
}
