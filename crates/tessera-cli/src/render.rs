// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Terminal rendering of execution snapshots.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use tessera_core::{Offset, Snapshot};
use tessera_model::Palette;

/// What the status line should say about the run.
pub struct Status<'a> {
    /// Program document name.
    pub model: &'a str,
    /// `true` while the run is paused.
    pub paused: bool,
    /// Current tick-rate bound (0 = unlimited).
    pub tickrate: u32,
}

/// Draws one snapshot: a status line above the layer-0 cell raster.
pub fn draw(frame: &mut Frame<'_>, snapshot: &Snapshot, palette: &Palette, status: &Status<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(frame.size());

    let state = if snapshot.halted {
        "halted"
    } else if status.paused {
        "paused"
    } else {
        "running"
    };
    let rate = if status.tickrate == 0 {
        "∞".to_owned()
    } else {
        status.tickrate.to_string()
    };
    let line = format!(
        " {} — {} — tick {} — {} t/s — [space] pause  [n] step  [r] reset  [+/-] rate  [q] quit",
        status.model, state, snapshot.tick, rate,
    );
    frame.render_widget(Paragraph::new(line), chunks[0]);

    let extents = snapshot.grid.extents;
    let mut rows = Vec::with_capacity(extents.h as usize);
    for y in 0..extents.h as i32 {
        let mut spans = Vec::with_capacity(extents.w as usize);
        for x in 0..extents.w as i32 {
            let symbol = snapshot.grid[Offset::new(0, y, x)];
            let style = match palette.get(&symbol) {
                Some(c) => Style::default().bg(Color::Rgb(c.r, c.g, c.b)),
                None => Style::default(),
            };
            // two columns per cell keep the raster roughly square
            spans.push(Span::styled("  ", style));
        }
        rows.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(rows), chunks[1]);
}
