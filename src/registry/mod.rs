// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device registry.
//!
//! The [`DeviceRegistry`] holds the last-known state of every channel and
//! notifies subscribers after each mutation. Only the sync engine writes to
//! it; views read it through change notifications.

mod device_registry;

pub use device_registry::DeviceRegistry;
