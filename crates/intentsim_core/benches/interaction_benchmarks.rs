use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use intentsim_core::config::InteractionTuning;
use intentsim_core::lifecycle::{spawn_from_field, SpawnOptions};
use intentsim_core::spatial_hash::SpatialHash;
use intentsim_core::systems::interaction::{interact_all, InteractionContext};
use intentsim_core::{Domain, IntentField, SimulationConfig, Universe};
use intentsim_data::Particle;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn population(n: usize) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let field = IntentField::new_random(30, 20, 5, &mut rng);
    let domain = Domain::default();
    let options = SpawnOptions::default();
    (0..n)
        .map(|_| spawn_from_field(&field, &domain, 0, &options, &mut rng))
        .collect()
}

/// Brute-force pair scan versus the spatial hash on the same population.
fn bench_interaction_pass(c: &mut Criterion) {
    let particles = population(200);
    let brute_tuning = InteractionTuning {
        spatial_index_min_particles: usize::MAX,
        ..Default::default()
    };
    let indexed_tuning = InteractionTuning::default();

    c.bench_function("interaction_brute_200", |b| {
        let ctx = InteractionContext {
            tuning: &brute_tuning,
            learning_rate: 0.1,
            tick: 1,
        };
        b.iter_batched(
            || particles.clone(),
            |mut ps| black_box(interact_all(&mut ps, &ctx, None)),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("interaction_indexed_200", |b| {
        let ctx = InteractionContext {
            tuning: &indexed_tuning,
            learning_rate: 0.1,
            tick: 1,
        };
        let mut hash = SpatialHash::new(20.0, 600.0, 400.0, 10.0);
        b.iter_batched(
            || particles.clone(),
            |mut ps| black_box(interact_all(&mut ps, &ctx, Some(&mut hash))),
            BatchSize::SmallInput,
        )
    });
}

/// One full tick at the default population cap.
fn bench_universe_tick(c: &mut Criterion) {
    let config = SimulationConfig {
        seed: Some(42),
        initial_particles: 200,
        ..Default::default()
    };
    let mut universe = Universe::new(config).unwrap();

    c.bench_function("universe_tick_200", |b| {
        b.iter(|| black_box(universe.tick()))
    });
}

criterion_group!(benches, bench_interaction_pass, bench_universe_tick);
criterion_main!(benches);
