// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transport layer between the sync engine and the panel.
//!
//! The engine depends on three primitives, captured by the [`Transport`]
//! trait: a toggle request, a full-state poll, and a push stream of state
//! changes. [`HttpTransport`] implements them against the panel firmware's
//! REST API and Server-Sent Events endpoint.
//!
//! # Wire types
//!
//! - [`ToggleAck`] - Answer to a toggle request
//! - [`ChannelDescriptor`] - One entry of a poll snapshot
//! - [`PushEvent`] - One state change from the push stream

#[cfg(feature = "http")]
mod http;
mod sse;

#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpTransport};
pub use sse::{SseDecoder, SseMessage};

use std::future::Future;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::state::ChannelMetadata;
use crate::types::{ChannelId, PowerState, SystemStatus};

/// Answer to a successful toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleAck {
    /// The state the panel reports after the toggle.
    ///
    /// The stock firmware acknowledges without a state; `None` confirms the
    /// requested value.
    pub state: Option<PowerState>,
}

impl ToggleAck {
    /// An acknowledgement without a reported state.
    #[must_use]
    pub fn accepted() -> Self {
        Self { state: None }
    }

    /// An acknowledgement carrying the device's resulting state.
    #[must_use]
    pub fn reported(state: PowerState) -> Self {
        Self { state: Some(state) }
    }
}

/// One channel as listed by the poll endpoint.
///
/// # Examples
///
/// ```
/// use relay_panel::protocol::ChannelDescriptor;
/// use relay_panel::types::PowerState;
///
/// let json = r#"{"channel":3,"name":"Gate","state":true,"canControl":false,"alexaEnabled":true}"#;
/// let descriptor: ChannelDescriptor = serde_json::from_str(json).unwrap();
/// assert_eq!(descriptor.state, PowerState::On);
/// assert!(!descriptor.controllable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDescriptor {
    /// Channel identifier.
    pub channel: ChannelId,
    /// Display label.
    #[serde(default)]
    pub name: String,
    /// Current relay state.
    pub state: PowerState,
    /// Whether this session may switch the channel.
    #[serde(rename = "canControl", alias = "controllable", default)]
    pub controllable: bool,
    /// Voice-assistant flag.
    #[serde(default)]
    pub alexa_enabled: bool,
}

impl ChannelDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(channel: impl Into<ChannelId>, name: impl Into<String>, state: PowerState) -> Self {
        Self {
            channel: channel.into(),
            name: name.into(),
            state,
            controllable: true,
            alexa_enabled: false,
        }
    }

    /// Sets the controllable flag.
    #[must_use]
    pub fn with_controllable(mut self, controllable: bool) -> Self {
        self.controllable = controllable;
        self
    }

    /// Sets the voice-assistant flag.
    #[must_use]
    pub fn with_alexa_enabled(mut self, enabled: bool) -> Self {
        self.alexa_enabled = enabled;
        self
    }

    /// Returns the descriptive fields as registry metadata.
    #[must_use]
    pub fn metadata(&self) -> ChannelMetadata {
        ChannelMetadata::new(self.name.clone(), self.controllable, self.alexa_enabled)
    }
}

/// A state change delivered by the push stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// The channel that changed.
    pub channel: ChannelId,
    /// Its new state.
    pub state: PowerState,
}

impl PushEvent {
    /// Creates a push event.
    #[must_use]
    pub fn new(channel: impl Into<ChannelId>, state: PowerState) -> Self {
        Self {
            channel: channel.into(),
            state,
        }
    }
}

/// A live stream of push events.
///
/// The stream ending, or yielding an `Err`, means the subscription dropped.
pub type PushStream = BoxStream<'static, Result<PushEvent, TransportError>>;

/// The network primitives the sync engine consumes.
///
/// Implementations only move data; every ordering and race decision is made
/// by the engine. Futures must be `Send` because the engine drives each
/// request on its own task.
pub trait Transport: Send + Sync + 'static {
    /// Asks the panel to switch a channel.
    ///
    /// May take arbitrarily long; the engine bounds the wait.
    fn request_toggle(
        &self,
        channel: ChannelId,
        desired: PowerState,
    ) -> impl Future<Output = Result<ToggleAck, TransportError>> + Send;

    /// Fetches the full list of channels.
    fn poll_snapshot(
        &self,
    ) -> impl Future<Output = Result<Vec<ChannelDescriptor>, TransportError>> + Send;

    /// Opens the push stream.
    fn open_push_stream(&self) -> impl Future<Output = Result<PushStream, TransportError>> + Send;

    /// Fetches the panel's system status.
    ///
    /// Transports without a status endpoint keep the default, which reports
    /// [`TransportError::Unsupported`].
    fn system_status(&self) -> impl Future<Output = Result<SystemStatus, TransportError>> + Send {
        async { Err(TransportError::Unsupported) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_accepts_controllable_alias() {
        let json = r#"{"channel":1,"name":"Fan","state":false,"controllable":true}"#;
        let descriptor: ChannelDescriptor = serde_json::from_str(json).unwrap();
        assert!(descriptor.controllable);
        assert!(!descriptor.alexa_enabled);
    }

    #[test]
    fn descriptor_metadata() {
        let descriptor = ChannelDescriptor::new(2u16, "Heater", PowerState::On)
            .with_controllable(false)
            .with_alexa_enabled(true);
        let metadata = descriptor.metadata();
        assert_eq!(metadata.name, "Heater");
        assert!(!metadata.controllable);
        assert!(metadata.alexa_enabled);
    }

    #[test]
    fn push_event_parses_firmware_payload() {
        let event: PushEvent = serde_json::from_str(r#"{"channel":4,"state":true}"#).unwrap();
        assert_eq!(event, PushEvent::new(4u16, PowerState::On));
    }

    #[test]
    fn toggle_ack_constructors() {
        assert_eq!(ToggleAck::accepted().state, None);
        assert_eq!(ToggleAck::reported(PowerState::Off).state, Some(PowerState::Off));
    }
}
