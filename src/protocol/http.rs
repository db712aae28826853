// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP transport for the panel's REST API and event stream.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, TransportError};
use crate::protocol::{ChannelDescriptor, PushStream, SseDecoder, ToggleAck, Transport};
use crate::types::{ChannelId, PowerState, SystemStatus};

const TOGGLE_PATH: &str = "/api/devices/toggle";
const DEVICES_PATH: &str = "/api/devices";
const EVENTS_PATH: &str = "/events";
const STATUS_PATH: &str = "/api/status";

// ============================================================================
// HttpConfig
// ============================================================================

/// Configuration for talking to a panel over HTTP.
///
/// # Examples
///
/// ```
/// use relay_panel::protocol::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("192.168.1.40")
///     .with_port(8080)
///     .with_session("a1b2c3")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url(), "http://192.168.1.40:8080");
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    host: String,
    port: u16,
    use_https: bool,
    session: Option<String>,
    timeout: Duration,
}

impl HttpConfig {
    /// Default HTTP port.
    pub const DEFAULT_PORT: u16 = 80;
    /// Default HTTPS port.
    pub const DEFAULT_HTTPS_PORT: u16 = 443;
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a new HTTP configuration for the specified host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            use_https: false,
            session: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables HTTPS.
    ///
    /// If port hasn't been explicitly set, it will be changed to 443.
    #[must_use]
    pub fn with_https(mut self) -> Self {
        self.use_https = true;
        if self.port == Self::DEFAULT_PORT {
            self.port = Self::DEFAULT_HTTPS_PORT;
        }
        self
    }

    /// Sets the session id sent as the `session` cookie.
    ///
    /// Obtaining the session (logging in) is up to the caller.
    #[must_use]
    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    /// Sets the timeout for request/response calls.
    ///
    /// The push stream is long-lived and only bounded by the connect phase.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns whether HTTPS is enabled.
    #[must_use]
    pub fn use_https(&self) -> bool {
        self.use_https
    }

    /// Returns the session id if set.
    #[must_use]
    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the base URL from this configuration.
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        let port_suffix = if (self.use_https && self.port == Self::DEFAULT_HTTPS_PORT)
            || (!self.use_https && self.port == Self::DEFAULT_PORT)
        {
            String::new()
        } else {
            format!(":{}", self.port)
        };
        format!("{scheme}://{}{port_suffix}", self.host)
    }

    /// Creates an [`HttpTransport`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the host is empty or the HTTP client cannot be created.
    pub fn into_transport(self) -> Result<HttpTransport, TransportError> {
        if self.host.trim().is_empty() {
            return Err(TransportError::InvalidAddress("host is required".to_string()));
        }

        let base_url = self.base_url();

        // No client-wide timeout: it would also cut the event stream.
        let client = Client::builder()
            .connect_timeout(self.timeout)
            .build()
            .map_err(TransportError::Http)?;

        Ok(HttpTransport {
            base_url,
            client,
            session: self.session,
            timeout: self.timeout,
        })
    }
}

// ============================================================================
// HttpTransport
// ============================================================================

/// [`Transport`] backed by the panel's HTTP endpoints.
///
/// | Primitive | Endpoint |
/// |-----------|----------|
/// | toggle | `POST /api/devices/toggle` with `{"channel":N,"state":bool}` |
/// | poll | `GET /api/devices` |
/// | push | `GET /events` (Server-Sent Events, `state` events) |
/// | status | `GET /api/status` |
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: Client,
    session: Option<String>,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ToggleRequest {
    channel: ChannelId,
    state: PowerState,
}

#[derive(Debug, Deserialize)]
struct ToggleResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    state: Option<PowerState>,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    devices: Vec<ChannelDescriptor>,
}

impl HttpTransport {
    /// Returns the base URL of the panel.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn with_session(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => request.header(COOKIE, format!("session={session}")),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = self.with_session(request).send().await.map_err(|err| {
            if err.is_timeout() {
                self.timeout_error()
            } else {
                TransportError::Http(err)
            }
        })?;
        check_status(response)
    }

    async fn read_body(&self, response: Response) -> Result<String, TransportError> {
        response.text().await.map_err(|err| {
            if err.is_timeout() {
                self.timeout_error()
            } else {
                TransportError::Http(err)
            }
        })
    }

    fn timeout_error(&self) -> TransportError {
        TransportError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
    }
}

fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    match status {
        StatusCode::UNAUTHORIZED => Err(TransportError::AuthenticationFailed),
        StatusCode::FORBIDDEN => Err(TransportError::PermissionDenied),
        StatusCode::NOT_FOUND => Err(TransportError::NotFound),
        s if !s.is_success() => Err(TransportError::Status {
            code: s.as_u16(),
            reason: s.canonical_reason().unwrap_or("Unknown").to_string(),
        }),
        _ => Ok(response),
    }
}

fn parse_toggle_body(body: &str) -> Result<ToggleAck, TransportError> {
    let response: ToggleResponse = serde_json::from_str(body).map_err(ParseError::from)?;
    if response.success == Some(false) {
        return Err(TransportError::Rejected(
            response
                .message
                .unwrap_or_else(|| "toggle refused".to_string()),
        ));
    }
    Ok(ToggleAck {
        state: response.state,
    })
}

impl Transport for HttpTransport {
    async fn request_toggle(
        &self,
        channel: ChannelId,
        desired: PowerState,
    ) -> Result<ToggleAck, TransportError> {
        tracing::debug!(%channel, %desired, "Sending toggle request");

        let request = self
            .client
            .post(self.url(TOGGLE_PATH))
            .timeout(self.timeout)
            .json(&ToggleRequest {
                channel,
                state: desired,
            });
        let response = self.send(request).await?;
        let body = self.read_body(response).await?;

        tracing::debug!(%channel, body = %body, "Received toggle response");

        parse_toggle_body(&body)
    }

    async fn poll_snapshot(&self) -> Result<Vec<ChannelDescriptor>, TransportError> {
        let request = self.client.get(self.url(DEVICES_PATH)).timeout(self.timeout);
        let response = self.send(request).await?;
        let body = self.read_body(response).await?;

        let devices: DevicesResponse = serde_json::from_str(&body).map_err(ParseError::from)?;
        tracing::debug!(count = devices.devices.len(), "Received device snapshot");
        Ok(devices.devices)
    }

    async fn open_push_stream(&self) -> Result<PushStream, TransportError> {
        let request = self
            .client
            .get(self.url(EVENTS_PATH))
            .header(ACCEPT, "text/event-stream");
        let response = self.send(request).await?;

        tracing::debug!(url = %self.url(EVENTS_PATH), "Event stream opened");

        let state = (
            response.bytes_stream().boxed(),
            SseDecoder::new(),
            VecDeque::new(),
            false,
        );
        let stream = futures_util::stream::unfold(
            state,
            |(mut bytes, mut decoder, mut queue, mut finished)| async move {
                loop {
                    if let Some(item) = queue.pop_front() {
                        return Some((item, (bytes, decoder, queue, finished)));
                    }
                    if finished {
                        return None;
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => {
                            for message in decoder.feed(&chunk) {
                                match message.to_push_event() {
                                    Some(Ok(event)) => queue.push_back(Ok(event)),
                                    Some(Err(err)) => {
                                        tracing::warn!(error = %err, data = %message.data, "Dropping malformed state event");
                                    }
                                    None => {}
                                }
                            }
                        }
                        Some(Err(err)) => {
                            finished = true;
                            queue.push_back(Err(TransportError::Http(err)));
                        }
                        None => finished = true,
                    }
                }
            },
        );

        Ok(stream.boxed())
    }

    async fn system_status(&self) -> Result<SystemStatus, TransportError> {
        let request = self.client.get(self.url(STATUS_PATH)).timeout(self.timeout);
        let response = self.send(request).await?;
        let body = self.read_body(response).await?;
        serde_json::from_str(&body).map_err(|err| ParseError::from(err).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_config_default_values() {
        let config = HttpConfig::new("192.168.1.40");
        assert_eq!(config.host(), "192.168.1.40");
        assert_eq!(config.port(), 80);
        assert!(!config.use_https());
        assert!(config.session().is_none());
        assert_eq!(config.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn http_config_with_https() {
        let config = HttpConfig::new("panel.local").with_https();
        assert_eq!(config.port(), 443);
        assert_eq!(config.base_url(), "https://panel.local");
    }

    #[test]
    fn http_config_with_https_custom_port() {
        let config = HttpConfig::new("panel.local").with_port(8443).with_https();
        assert_eq!(config.base_url(), "https://panel.local:8443");
    }

    #[test]
    fn into_transport_rejects_empty_host() {
        let result = HttpConfig::new("  ").into_transport();
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }

    #[test]
    fn into_transport_keeps_base_url() {
        let transport = HttpConfig::new("10.0.0.2")
            .with_port(8080)
            .with_session("abc")
            .into_transport()
            .unwrap();
        assert_eq!(transport.base_url(), "http://10.0.0.2:8080");
        assert_eq!(transport.session.as_deref(), Some("abc"));
    }

    #[test]
    fn toggle_body_from_stock_firmware() {
        let ack = parse_toggle_body(r#"{"success":true,"message":"Device toggled"}"#).unwrap();
        assert_eq!(ack, ToggleAck::accepted());
    }

    #[test]
    fn toggle_body_with_reported_state() {
        let ack = parse_toggle_body(r#"{"success":true,"state":false}"#).unwrap();
        assert_eq!(ack, ToggleAck::reported(PowerState::Off));
    }

    #[test]
    fn toggle_body_rejected() {
        let err = parse_toggle_body(r#"{"success":false,"message":"Failed to toggle device"}"#)
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(msg) if msg == "Failed to toggle device"));
    }

    #[test]
    fn toggle_body_malformed() {
        let err = parse_toggle_body("not json").unwrap_err();
        assert!(matches!(err, TransportError::Parse(ParseError::Json(_))));
    }

    #[test]
    fn toggle_request_serializes_state_as_bool() {
        let body = serde_json::to_value(ToggleRequest {
            channel: ChannelId::new(3),
            state: PowerState::On,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"channel": 3, "state": true}));
    }
}
