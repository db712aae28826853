// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `relay_panel` - State synchronization for a relay board's control panel.
//!
//! The panel firmware drives a bank of relay channels. Each channel's ON/OFF
//! state can change through three unordered sources: the operator's own
//! switch (applied optimistically), the response to that switch request,
//! and the device itself (pushed over Server-Sent Events, with a periodic
//! full poll as fallback). This library merges them so the UI responds at
//! once yet never settles on a value the hardware does not have.
//!
//! # Building Blocks
//!
//! - [`registry::DeviceRegistry`]: last-known state of every channel, with
//!   synchronous, ordered change notifications
//! - [`protocol::Transport`]: toggle, poll and push primitives;
//!   [`protocol::HttpTransport`] speaks the panel's REST API
//! - [`sync::Reconciler`]: the per-channel reducer resolving races between
//!   sources
//! - [`sync::SyncEngine`]: runs the reducer against a transport with
//!   timeouts, polling and push reconnection
//! - [`view::ViewProjector`]: re-renders channel cards from notifications
//!
//! # Quick Start
//!
//! ```no_run
//! use relay_panel::protocol::HttpConfig;
//! use relay_panel::sync::{SyncConfig, SyncEngine};
//! use relay_panel::types::{ChannelId, PowerState};
//! use relay_panel::view::{ChannelView, ViewProjector};
//!
//! #[tokio::main]
//! async fn main() -> relay_panel::Result<()> {
//!     let transport = HttpConfig::new("192.168.4.1")
//!         .with_session("3f2a9c")
//!         .into_transport()?;
//!     let engine = SyncEngine::start(transport, SyncConfig::default()).await?;
//!
//!     // Attach first, then draw the current snapshot
//!     let projector = ViewProjector::attach(&engine, |view: &ChannelView| {
//!         println!("[{}] {} {}", view.channel, view.label, view.status_text);
//!     });
//!     projector.render_snapshot(&engine.channels());
//!
//!     let mut notices = engine.notices();
//!     engine.toggle(ChannelId::new(3), PowerState::On).await?;
//!
//!     if let Ok(notice) = notices.recv().await {
//!         eprintln!("{}", notice.message());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Custom Transports
//!
//! [`sync::SyncEngine::start`] accepts any [`protocol::Transport`], so tests
//! and alternative links (a serial bridge, a simulator) plug in by
//! implementing three async methods.

pub mod error;
pub mod event;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod subscription;
pub mod sync;
pub mod types;
pub mod view;

pub use error::{Error, ParseError, Result, TransportError, ValueError};
pub use event::{Notice, NoticeBus, NoticeId, NoticeKind};
#[cfg(feature = "http")]
pub use protocol::{HttpConfig, HttpTransport};
pub use protocol::{ChannelDescriptor, PushEvent, PushStream, ToggleAck, Transport};
pub use registry::DeviceRegistry;
pub use state::{ChangeCause, ChannelChange, ChannelMetadata, DeviceChannel, PendingOutcome};
pub use subscription::{CallbackRegistry, Subscribable, SubscriptionId};
pub use sync::{ReconnectionPolicy, Reconciler, SyncConfig, SyncEngine};
pub use types::{ChannelId, PowerState, SystemStatus, Uptime, WifiStatus};
pub use view::{ChannelView, NoticeBoard, RenderTarget, ViewProjector};
