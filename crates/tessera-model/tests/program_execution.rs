// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end: documents compile into programs that run to the states the
//! language promises.

#![allow(missing_docs)]

use tessera_core::{Grid, Size, TracedGrid};
use tessera_model::Model;

fn fresh_grid(model: &Model, extents: Size) -> TracedGrid<char> {
    let mut grid = Grid::filled(extents, model.symbols[0]);
    if model.origin {
        let center = grid.area().center();
        grid[center] = model.symbols[1];
    }
    TracedGrid::new(grid)
}

fn run(model: &mut Model, grid: &mut TracedGrid<char>) -> u32 {
    let mut ticks = 0;
    while model.program.step(grid) {
        ticks += 1;
        assert!(ticks < 100_000, "program failed to terminate");
    }
    ticks
}

#[test]
fn prl_document_floods_a_grid_in_one_tick() {
    let mut model =
        Model::from_document(r#"<prl values="BW" in="B" out="W"/>"#, 42).unwrap();
    let mut grid = fresh_grid(&model, Size::new(1, 3, 3));

    assert!(model.program.step(&mut grid));
    assert!(grid.values.iter().all(|&c| c == 'W'));
}

#[test]
fn markov_document_drives_a_cell_through_both_children() {
    let src = r#"
        <markov values="BWR">
            <one in="B" out="W" steps="1"/>
            <one in="W" out="R" steps="1"/>
        </markov>"#;
    let mut model = Model::from_document(src, 0).unwrap();
    let mut grid = fresh_grid(&model, Size::new(1, 1, 1));

    run(&mut model, &mut grid);
    assert_eq!(grid.values, vec!['R']);
}

#[test]
fn origin_seeds_the_center_cell() {
    let model =
        Model::from_document(r#"<one values="BW" origin="True" in="W" out="W"/>"#, 0).unwrap();
    let grid = fresh_grid(&model, Size::new(1, 3, 3));
    assert_eq!(grid[tessera_core::Offset::new(0, 1, 1)], 'W');
    assert_eq!(grid.values.iter().filter(|&&c| c == 'W').count(), 1);
}

#[test]
fn search_document_reaches_its_observed_goal() {
    let src = r#"
        <one values="BW" in="B" out="W" search="True" depthCoefficient="0.5">
            <observe value="B" to="W"/>
        </one>"#;
    let mut model = Model::from_document(src, 9).unwrap();
    let mut grid = fresh_grid(&model, Size::new(1, 1, 3));

    assert_eq!(run(&mut model, &mut grid), 3);
    assert_eq!(grid.values, vec!['W', 'W', 'W']);
}

#[test]
fn growth_document_fills_the_grid_from_the_origin() {
    let src = r#"<one values="BW" origin="True" symmetry="(xy)" in="WB" out="WW"/>"#;
    let mut model = Model::from_document(src, 7).unwrap();
    let mut grid = fresh_grid(&model, Size::new(1, 5, 5));

    run(&mut model, &mut grid);
    assert!(grid.values.iter().all(|&c| c == 'W'));
}

#[test]
fn fixed_seeds_reproduce_document_runs() {
    let src = r#"<one values="BW" in="B" out="W"/>"#;
    let run_once = |seed| {
        let mut model = Model::from_document(src, seed).unwrap();
        let mut grid = fresh_grid(&model, Size::new(1, 4, 4));
        run(&mut model, &mut grid);
        grid.history.clone()
    };
    assert_eq!(run_once(5), run_once(5));
    assert_ne!(run_once(5), run_once(6));
}
