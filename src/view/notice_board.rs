// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Transient notice list shown above the channel cards.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::event::{Notice, NoticeId};

/// Active, dismissible operator notices in the order they were raised.
///
/// # Examples
///
/// ```
/// use relay_panel::event::Notice;
/// use relay_panel::types::ChannelId;
/// use relay_panel::view::NoticeBoard;
///
/// let mut board = NoticeBoard::new();
/// let id = board.push(Notice::channel_not_found(ChannelId::new(4)));
/// assert_eq!(board.messages(), vec!["Device on channel 4 is no longer available"]);
///
/// assert!(board.dismiss(id));
/// assert!(board.is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    /// Creates an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a notice and returns its id.
    pub fn push(&mut self, notice: Notice) -> NoticeId {
        let id = notice.id;
        self.notices.push(notice);
        id
    }

    /// Moves every notice waiting on `receiver` onto the board.
    ///
    /// Returns how many were added.
    pub fn collect_from(&mut self, receiver: &mut broadcast::Receiver<Notice>) -> usize {
        let mut added = 0;
        loop {
            match receiver.try_recv() {
                Ok(notice) => {
                    self.push(notice);
                    added += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notice receiver lagged, oldest notices lost");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        added
    }

    /// Removes a notice.
    ///
    /// Returns `true` if it was still shown.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.notices.len();
        self.notices.retain(|notice| notice.id != id);
        self.notices.len() != before
    }

    /// Drops notices raised more than `ttl` before `now`.
    ///
    /// Returns how many were dropped.
    pub fn expire(&mut self, now: DateTime<Utc>, ttl: TimeDelta) -> usize {
        let before = self.notices.len();
        self.notices.retain(|notice| now - notice.raised_at <= ttl);
        before - self.notices.len()
    }

    /// Returns the active notices, oldest first.
    #[must_use]
    pub fn active(&self) -> &[Notice] {
        &self.notices
    }

    /// Returns the operator-facing text of each active notice.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notices.iter().map(Notice::message).collect()
    }

    /// Returns the number of active notices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notices.len()
    }

    /// Returns `true` if nothing is shown.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    /// Dismisses everything.
    pub fn clear(&mut self) {
        self.notices.clear();
    }
}
