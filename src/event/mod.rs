// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Operator notices.
//!
//! Recoverable errors that the operator should hear about (a rolled-back
//! toggle, an unknown or locked channel) are published as [`Notice`]s on a
//! [`NoticeBus`]. Each notice carries a [`NoticeId`] so a view can dismiss it.
//!
//! # Examples
//!
//! ```
//! use relay_panel::event::{Notice, NoticeBus};
//! use relay_panel::types::ChannelId;
//!
//! let bus = NoticeBus::new();
//! let mut rx = bus.subscribe();
//! bus.publish(Notice::toggle_failed(ChannelId::new(1), "Pump", "HTTP 500 - Internal Server Error"));
//! ```

mod event_bus;
mod notice;
mod notice_id;

pub use event_bus::NoticeBus;
pub use notice::{Notice, NoticeKind};
pub use notice_id::NoticeId;
