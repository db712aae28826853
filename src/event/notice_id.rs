// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Notice identifier type.

use std::fmt;

use uuid::Uuid;

/// Unique identifier for an operator notice.
///
/// Used to dismiss a notice from a [`NoticeBoard`](crate::view::NoticeBoard).
///
/// # Examples
///
/// ```
/// use relay_panel::event::NoticeId;
///
/// let id = NoticeId::new();
/// assert_ne!(id, NoticeId::new());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeId(Uuid);

impl NoticeId {
    /// Creates a new unique notice identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for NoticeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = &self.0.to_string()[..8];
        write!(f, "NoticeId({short}...)")
    }
}

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for NoticeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
