#![forbid(unsafe_code)]

// Reconciliation - pure state reducer and scroll policy for a single update

use super::{Session, Status};
use crate::view::ViewState;

/// Produce the next state of `session` after a progress snapshot.
pub fn reduce(session: &Session, response: &str) -> Session {
    Session {
        id: session.id,
        status: Status::classify(response),
        response: response.to_string(),
    }
}

/// What to do with a pane's scroll position once its new content is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    /// Put the pane back exactly where the user left it
    Restore(u32),
    /// Stick to the newest output; applied on the next loop tick
    FollowBottom,
}

pub fn was_at_bottom(before: ViewState, tolerance: u32) -> bool {
    before.scroll_top.saturating_add(before.viewport_height)
        >= before.content_height.saturating_sub(tolerance)
}

/// Only a still-running session follows its output, and only if the user was
/// already at the bottom. Finished sessions never jump.
pub fn scroll_action(status: Status, before: ViewState, tolerance: u32) -> ScrollAction {
    if status == Status::Loading && was_at_bottom(before, tolerance) {
        ScrollAction::FollowBottom
    } else {
        ScrollAction::Restore(before.scroll_top)
    }
}
