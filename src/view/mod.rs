#![forbid(unsafe_code)]

// Rendering adapter - the surface the controller draws sessions onto

pub mod console;

pub use console::ConsoleRenderer;

use crate::session::{Session, SessionId};

/// Distance from the bottom, in view units, that still counts as "at the bottom".
pub const DEFAULT_BOTTOM_TOLERANCE: u32 = 10;

/// Scroll geometry of one session's response pane, sampled right before an
/// update. Derived from the view; never stored between updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewState {
    pub scroll_top: u32,
    pub content_height: u32,
    pub viewport_height: u32,
}

/// A view of the session list.
///
/// The controller calls `render_all` once per run and `render_session` for
/// each accepted update, so one session's update never touches the others.
pub trait Renderer {
    fn render_all(&mut self, sessions: &[Session]);

    fn render_session(&mut self, session: &Session);

    /// Current geometry of the session's pane, if it has been rendered.
    fn view_state(&self, id: SessionId) -> Option<ViewState>;

    fn scroll_to(&mut self, id: SessionId, offset: u32);

    fn scroll_to_bottom(&mut self, id: SessionId);

    /// Show or hide the global in-progress indicator.
    fn set_in_progress(&mut self, visible: bool);

    fn show_error(&mut self, message: &str);

    fn bottom_tolerance(&self) -> u32 {
        DEFAULT_BOTTOM_TOLERANCE
    }

    /// End of a loop tick; views that batch output flush here.
    fn present(&mut self) {}
}
