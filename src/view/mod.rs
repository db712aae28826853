// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reactive, toolkit-neutral rendering helpers.
//!
//! - [`ViewProjector`] re-renders a channel card whenever its displayed
//!   value or metadata changes
//! - [`NoticeBoard`] holds the dismissible notices raised by the engine

mod notice_board;
mod projector;

pub use notice_board::NoticeBoard;
pub use projector::{ChannelView, RenderTarget, ViewProjector};
