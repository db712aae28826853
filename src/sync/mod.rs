// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reconciliation of optimistic writes, confirmations, push events and polls.
//!
//! Each channel is either *settled* (no outstanding write) or *pending* (one
//! optimistic write in flight). The [`Reconciler`] is a synchronous reducer
//! over [`SyncInput`]s implementing the ordering rules:
//!
//! | Input | Settled | Pending |
//! |-------|---------|---------|
//! | Operator toggle | record pending, send request | supersede, send request |
//! | Toggle success | - | commit reported (or requested) value |
//! | Toggle failure / timeout | - | roll back, raise notice |
//! | Push event | apply | defer until settled |
//! | Poll snapshot | apply | ignore state, refresh metadata |
//!
//! Results are matched against a per-channel sequence number; anything that
//! does not match the outstanding request is discarded.
//!
//! [`SyncEngine`] runs a reconciler on its own task and wires it to a
//! [`Transport`](crate::protocol::Transport).

mod config;
mod engine;
mod input;
mod reconciler;

pub use config::{ReconnectionPolicy, SyncConfig};
pub use engine::SyncEngine;
pub use input::{Reaction, SyncEffect, SyncInput, ToggleSeq};
pub use reconciler::Reconciler;
