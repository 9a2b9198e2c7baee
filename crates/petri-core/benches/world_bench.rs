use std::time::Duration;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use petri_core::{ArenaConfig, InputFrame, Vec2, World};

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn bench_config(bots: usize) -> ArenaConfig {
    ArenaConfig {
        rng_seed: Some(0xBEEF),
        initial_bots: bots,
        max_bots: bots,
        bot_spawn_interval: u32::MAX,
        ..ArenaConfig::default()
    }
}

fn world_step(c: &mut Criterion) {
    let steps = env_usize("PETRI_BENCH_STEPS", 32);
    let samples = env_usize("PETRI_BENCH_SAMPLES", 20);

    let mut group = c.benchmark_group("world_step");
    group.sample_size(samples.max(10));
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(8));

    for bots in [25usize, 100, 400] {
        group.bench_function(format!("{bots}_bots_{steps}_steps"), |b| {
            b.iter_batched(
                || {
                    let world =
                        World::new(bench_config(bots)).expect("bench config is valid");
                    let cursor = world.camera.screen_size() * 0.5 + Vec2::new(120.0, 40.0);
                    (world, InputFrame::at_cursor(cursor))
                },
                |(mut world, input)| {
                    for _ in 0..steps {
                        world.step(&input);
                    }
                    world
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, world_step);
criterion_main!(benches);
