// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The console application: one execution thread running the program tree
//! under [`Controls`], one control thread rendering snapshots and mapping
//! keys to commands.

use std::io::stdout;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use tessera_core::{Controls, Grid, Size, Snapshot, TracedGrid};
use tessera_model::{parse_palette, Model, Palette};

use crate::render::{self, Status};
use crate::settings::Settings;

/// Everything a run needs, resolved from settings and the command line.
pub struct App {
    /// Effective settings.
    pub settings: Settings,
    /// Root seed for the per-leaf generators.
    pub seed: u64,
}

impl App {
    /// Runs the console front-end to completion. Returns on `q`.
    pub fn run(self) -> Result<()> {
        let palette_src = std::fs::read_to_string(&self.settings.palette)
            .with_context(|| format!("reading palette {}", self.settings.palette.display()))?;
        let palette = parse_palette(&palette_src)
            .with_context(|| format!("parsing palette {}", self.settings.palette.display()))?;

        let model_src = std::fs::read_to_string(&self.settings.model)
            .with_context(|| format!("reading model {}", self.settings.model.display()))?;
        let model = Model::from_document(&model_src, self.seed)
            .with_context(|| format!("parsing model {}", self.settings.model.display()))?;

        let extents = Size::new(
            self.settings.extent[0],
            self.settings.extent[1],
            self.settings.extent[2],
        );

        let controls = Arc::new(Controls::new(self.settings.tickrate));
        let shared = Arc::new(Mutex::new(Snapshot::capture(
            &seed_grid(&model, extents),
            0,
            false,
        )));

        let executor = {
            let controls = Arc::clone(&controls);
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || execute_program(model, extents, &controls, &shared))
        };

        let model_name = self
            .settings
            .model
            .file_name()
            .map_or_else(|| self.settings.model.display().to_string(), |n| {
                n.to_string_lossy().into_owned()
            });
        let ui_result = run_ui(&model_name, &palette, &controls, &shared);

        controls.cancel();
        if executor.join().is_err() {
            tracing::error!("execution thread panicked");
        }
        ui_result
    }
}

/// A fresh grid per the model: first symbol everywhere, optional origin
/// seed at the center.
fn seed_grid(model: &Model, extents: Size) -> Grid<char> {
    let mut grid = Grid::filled(extents, model.symbols[0]);
    if model.origin {
        if let Some(&second) = model.symbols.get(1) {
            let center = grid.area().center();
            grid[center] = second;
        }
    }
    grid
}

fn publish(shared: &Mutex<Snapshot>, grid: &Grid<char>, tick: u64, halted: bool) {
    let mut slot = shared
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    *slot = Snapshot::capture(grid, tick, halted);
}

/// Execution-thread body: tick the program tree until cancellation,
/// honoring pause, single-step, reset, and the rate limit.
fn execute_program(
    mut model: Model,
    extents: Size,
    controls: &Controls,
    shared: &Mutex<Snapshot>,
) {
    let mut grid = TracedGrid::new(seed_grid(&model, extents));
    let mut tick: u64 = 0;
    let mut last = Instant::now();

    while !controls.is_cancelled() {
        controls.wait_unpause();
        if controls.is_cancelled() {
            break;
        }
        if controls.take_reset() {
            model.program.reset();
            grid = TracedGrid::new(seed_grid(&model, extents));
            tick = 0;
            publish(shared, &grid, tick, false);
            continue;
        }

        if model.program.step(&mut grid) {
            tick += 1;
            publish(shared, &grid, tick, false);
            controls.rate_limit(last);
            last = Instant::now();
        } else {
            tracing::info!(tick, "program exhausted");
            publish(shared, &grid, tick, true);
            // parked until a reset revives the run or the app quits
            while !controls.is_cancelled() && !controls.take_reset() {
                std::thread::sleep(Duration::from_millis(50));
            }
            if controls.is_cancelled() {
                break;
            }
            model.program.reset();
            grid = TracedGrid::new(seed_grid(&model, extents));
            tick = 0;
            publish(shared, &grid, tick, false);
        }
    }
}

/// Control-thread body: render snapshots and translate keys to commands.
fn run_ui(
    model_name: &str,
    palette: &Palette,
    controls: &Controls,
    shared: &Mutex<Snapshot>,
) -> Result<()> {
    enable_raw_mode().context("entering raw mode")?;
    execute!(stdout(), EnterAlternateScreen).context("entering alternate screen")?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = ui_loop(&mut terminal, model_name, palette, controls, shared);

    execute!(stdout(), LeaveAlternateScreen).context("leaving alternate screen")?;
    disable_raw_mode().context("leaving raw mode")?;
    result
}

fn ui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    model_name: &str,
    palette: &Palette,
    controls: &Controls,
    shared: &Mutex<Snapshot>,
) -> Result<()> {
    loop {
        let snapshot = shared
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let status = Status {
            model: model_name,
            paused: controls.is_paused(),
            tickrate: controls.tickrate(),
        };
        terminal.draw(|frame| render::draw(frame, &snapshot, palette, &status))?;

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char(' ') => controls.toggle_pause(),
            KeyCode::Char('n') => controls.go_next(),
            KeyCode::Char('r') => controls.request_reset(),
            KeyCode::Char('+') => controls.set_tickrate(controls.tickrate().saturating_add(10)),
            KeyCode::Char('-') => controls.set_tickrate(controls.tickrate().saturating_sub(10)),
            _ => {}
        }
    }
}
