//! Criterion micro-benchmarks for entity spawn, lookup, and array compaction.

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use skein_arena::{ArenaConfig, EntityArena, EntityArray};
use skein_bench::Bullet;

fn bullet(i: usize) -> Bullet {
    Bullet {
        pos: (i as f32, 0.0),
        vel: (0.0, 1.0),
    }
}

fn bench_spawn_despawn(c: &mut Criterion) {
    let mut arena = EntityArena::new(&ArenaConfig::default());
    c.bench_function("arena_spawn_despawn", |b| {
        b.iter(|| {
            let r = arena.spawn(bullet(0));
            std::hint::black_box(arena.despawn(r).is_ok())
        });
    });
}

fn bench_lookup(c: &mut Criterion) {
    let mut arena = EntityArena::new(&ArenaConfig::default());
    let refs: Vec<_> = (0..10_000).map(|i| arena.spawn(bullet(i))).collect();
    c.bench_function("arena_lookup_10k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for r in &refs {
                if let Some(b) = arena.get(*r) {
                    sum += b.pos.0;
                }
            }
            std::hint::black_box(sum)
        });
    });
}

fn bench_compact(c: &mut Criterion) {
    c.bench_function("entity_array_compact_half_dead", |b| {
        b.iter_batched(
            || {
                let mut arena = EntityArena::new(&ArenaConfig::default());
                let mut array = EntityArray::new(4_096);
                for i in 0..4_096 {
                    let r = arena.spawn(bullet(i));
                    array.add(r).unwrap();
                    if i % 2 == 0 {
                        arena.despawn(r).unwrap();
                    }
                }
                (arena, array)
            },
            |(arena, mut array)| std::hint::black_box(array.compact(&arena)),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_spawn_despawn, bench_lookup, bench_compact);
criterion_main!(benches);
