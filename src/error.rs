// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `relay_panel` library.
//!
//! Errors are split by where they originate: value validation, transport
//! communication with the panel firmware, response parsing, and the sync
//! engine itself. None of them is fatal to a session; the engine recovers
//! from every transport failure by rolling back or retrying on the next poll.

use thiserror::Error;

use crate::types::ChannelId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred during value validation.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// Error occurred while talking to the panel.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error occurred while parsing a response.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The channel is not present in the registry.
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    /// The current session is not allowed to switch this channel.
    #[error("channel {0} is not controllable by this session")]
    NotControllable(ChannelId),

    /// The sync engine has been shut down.
    #[error("sync engine stopped")]
    EngineStopped,
}

/// Errors related to value validation and constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// An invalid power state string was provided.
    #[error("invalid power state: {0}")]
    InvalidPowerState(String),

    /// A channel identifier could not be parsed.
    #[error("invalid channel id: {0}")]
    InvalidChannelId(String),
}

/// Errors produced by a [`Transport`](crate::protocol::Transport).
///
/// Every variant is recoverable: a failed toggle rolls back, a failed poll
/// keeps the previous state, and a failed push stream falls back to polling.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not complete in time.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// The panel answered with a non-success status.
    #[error("HTTP {code} - {reason}")]
    Status {
        /// Numeric status code.
        code: u16,
        /// Canonical reason phrase.
        reason: String,
    },

    /// The session is not (or no longer) authenticated.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The session lacks permission for this channel.
    #[error("permission denied")]
    PermissionDenied,

    /// The panel does not know the requested channel.
    #[error("not found")]
    NotFound,

    /// The panel refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The push stream ended.
    #[error("push stream closed")]
    StreamClosed,

    /// The response body could not be understood.
    #[error("malformed response: {0}")]
    Parse(#[from] ParseError),

    /// Invalid URL or address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The transport does not provide this capability.
    #[error("operation not supported by this transport")]
    Unsupported,
}

/// Errors related to parsing panel responses.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Expected field is missing from the response.
    #[error("missing field in response: {0}")]
    MissingField(String),

    /// Unexpected response format.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
