#![forbid(unsafe_code)]

// Terminal view - one fixed-height scrollable pane per session, printed on change

use super::{Renderer, ViewState};
use crate::session::{Session, SessionId, Status};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

pub const DEFAULT_WIDTH: usize = 100;
pub const DEFAULT_VIEWPORT_ROWS: u32 = 8;

fn badge(status: Status) -> &'static str {
    match status {
        Status::Pending => "WAITING",
        Status::Loading => "RUNNING",
        Status::Success => "DONE",
        Status::Error => "FAILED",
    }
}

/// Split text into display rows no wider than `width` characters.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        if chars.is_empty() {
            rows.push(String::new());
            continue;
        }
        for chunk in chars.chunks(width) {
            rows.push(chunk.iter().collect());
        }
    }
    rows
}

#[derive(Debug, Clone)]
struct Pane {
    status: Status,
    rows: Vec<String>,
    scroll_top: u32,
}

impl Pane {
    fn content_height(&self) -> u32 {
        self.rows.len() as u32
    }

    fn max_scroll(&self, viewport: u32) -> u32 {
        self.content_height().saturating_sub(viewport)
    }

    fn visible(&self, viewport: u32) -> &[String] {
        let start = (self.scroll_top as usize).min(self.rows.len());
        let end = (start + viewport as usize).min(self.rows.len());
        &self.rows[start..end]
    }
}

/// Console view. Geometry is measured in rows, so the bottom tolerance is zero.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    width: usize,
    viewport_rows: u32,
    panes: BTreeMap<SessionId, Pane>,
    dirty: BTreeSet<SessionId>,
    in_progress: bool,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, width: usize, viewport_rows: u32) -> Self {
        Self {
            out,
            width: width.max(1),
            viewport_rows: viewport_rows.max(1),
            panes: BTreeMap::new(),
            dirty: BTreeSet::new(),
            in_progress: false,
        }
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }


    fn print_pane(&mut self, id: SessionId) {
        let Some(pane) = self.panes.get(&id) else {
            return;
        };
        let viewport = self.viewport_rows;
        let total = pane.content_height();
        let first = pane.scroll_top.min(total);
        let last = (first + viewport).min(total);
        let _ = writeln!(
            self.out,
            "-- session {id} [{}] rows {}-{} of {total} --",
            badge(pane.status),
            first + 1,
            last,
        );
        for row in pane.visible(viewport) {
            let _ = writeln!(self.out, "  {row}");
        }
    }
}

impl<W: Write> Renderer for ConsoleRenderer<W> {
    fn render_all(&mut self, sessions: &[Session]) {
        self.panes.clear();
        self.dirty.clear();

        if sessions.is_empty() {
            let _ = writeln!(self.out, "Start a test to see results here.");
            let _ = self.out.flush();
            return;
        }

        for session in sessions {
            self.panes.insert(
                session.id,
                Pane {
                    status: session.status,
                    rows: wrap(&session.response, self.width),
                    scroll_top: 0,
                },
            );
        }
        let ids: Vec<SessionId> = self.panes.keys().copied().collect();
        for id in ids {
            self.print_pane(id);
        }
        let _ = self.out.flush();
    }

    fn render_session(&mut self, session: &Session) {
        let viewport = self.viewport_rows;
        let width = self.width;
        let Some(pane) = self.panes.get_mut(&session.id) else {
            return;
        };
        pane.status = session.status;
        pane.rows = wrap(&session.response, width);
        pane.scroll_top = pane.scroll_top.min(pane.max_scroll(viewport));
        self.dirty.insert(session.id);
    }

    fn view_state(&self, id: SessionId) -> Option<ViewState> {
        self.panes.get(&id).map(|pane| ViewState {
            scroll_top: pane.scroll_top,
            content_height: pane.content_height(),
            viewport_height: self.viewport_rows,
        })
    }

    fn scroll_to(&mut self, id: SessionId, offset: u32) {
        let viewport = self.viewport_rows;
        if let Some(pane) = self.panes.get_mut(&id) {
            pane.scroll_top = offset.min(pane.max_scroll(viewport));
            self.dirty.insert(id);
        }
    }

    fn scroll_to_bottom(&mut self, id: SessionId) {
        let viewport = self.viewport_rows;
        if let Some(pane) = self.panes.get_mut(&id) {
            pane.scroll_top = pane.max_scroll(viewport);
            self.dirty.insert(id);
        }
    }

    fn set_in_progress(&mut self, visible: bool) {
        if self.in_progress == visible {
            return;
        }
        self.in_progress = visible;
        let line = if visible { "... running" } else { "== idle ==" };
        let _ = writeln!(self.out, "{line}");
    }

    fn show_error(&mut self, message: &str) {
        let _ = writeln!(self.out, "error: {message}");
        let _ = self.out.flush();
    }

    fn bottom_tolerance(&self) -> u32 {
        0
    }

    fn present(&mut self) {
        let dirty = std::mem::take(&mut self.dirty);
        for id in dirty {
            self.print_pane(id);
        }
        let _ = self.out.flush();
    }
}
