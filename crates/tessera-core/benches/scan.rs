// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Match scanner benchmarks: the full-grid cold scan against the
//! incremental rescan that follows a small batch of changes.

use criterion::{criterion_group, criterion_main, Criterion};

use tessera_core::{Change, Grid, Match, Offset, RewriteRule, Size, Unions};

fn console_sized_grid() -> Grid<char> {
    let mut grid = Grid::filled(Size::new(1, 59, 59), 'B');
    grid[Offset::new(0, 29, 29)] = 'W';
    grid
}

fn rules() -> Vec<RewriteRule> {
    RewriteRule::parse(&Unions::new(), "WB", "WW", 1.0)
        .unwrap()
        .symmetries("(xy)")
        .unwrap()
}

fn bench_scan(c: &mut Criterion) {
    let grid = console_sized_grid();
    let rules = rules();

    c.bench_function("full_scan_59x59", |b| {
        b.iter(|| Match::scan(&grid, &rules, &[]));
    });

    let history = [
        Change::new(Offset::new(0, 29, 30), 'W'),
        Change::new(Offset::new(0, 30, 29), 'W'),
    ];
    c.bench_function("incremental_scan_2_changes", |b| {
        b.iter(|| Match::scan(&grid, &rules, &history));
    });
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
