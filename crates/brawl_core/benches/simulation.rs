//! Combat world benchmarks.
//!
//! Run with: `cargo bench -p brawl_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use brawl_core::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const DT: f32 = 1.0 / 60.0;

fn crowded_world(enemies: usize) -> CombatWorld {
    let mut world = CombatWorld::new(CombatConfig::default(), 7).expect("default config is valid");
    world.spawn_player(Vec2::ZERO).expect("player template exists");
    for i in 0..enemies {
        let angle = i as f32 * 0.7;
        let template = match i % 3 {
            0 => "grunt",
            1 => "gunner",
            _ => "drone",
        };
        let position = Vec2::new(angle.cos(), angle.sin()) * (6.0 + (i % 5) as f32);
        world.spawn_template(template, position).expect("template exists");
    }
    world
}

/// Ticks per second for worlds of growing size.
pub fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for enemies in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(enemies), &enemies, |b, &n| {
            let mut world = crowded_world(n);
            b.iter(|| {
                world.apply_player_intent(PlayerIntent {
                    attack: true,
                    ..PlayerIntent::default()
                });
                black_box(world.tick(DT))
            });
        });
    }
    group.finish();
}

/// Cost of hashing the full state.
pub fn state_hash_benchmark(c: &mut Criterion) {
    let world = crowded_world(64);
    c.bench_function("state_hash_64", |b| b.iter(|| black_box(world.state_hash())));
}

criterion_group!(benches, tick_benchmark, state_hash_benchmark);
criterion_main!(benches);
