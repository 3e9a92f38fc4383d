//! Frame codec and world-model benchmarks
//!
//! Entity updates dominate inbound traffic, so they are measured at several
//! crowd sizes.
//!
//! Run with: cargo bench --bench codec

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use tilegame_client::game::state::{EntityPosition, Facing};
use tilegame_client::game::tiles::TileKind;
use tilegame_client::game::world::WorldView;
use tilegame_client::net::protocol::{decode, encode, Frame};

/// Entity update with `count` randomly placed entities
fn entity_update(count: usize) -> Frame {
    let mut rng = rand::thread_rng();
    let entities = (0..count)
        .map(|i| {
            EntityPosition::new(
                format!("Player{}", i),
                rng.gen_range(0..256),
                rng.gen_range(0..256),
                Facing::from_u8(rng.gen_range(0..4)).unwrap_or(Facing::South),
            )
        })
        .collect();
    Frame::EntityUpdate { entities }
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for count in [10, 100, 1000] {
        let frame = entity_update(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("entity_update", count), &frame, |b, frame| {
            b.iter(|| encode(black_box(frame)))
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for count in [10, 100, 1000] {
        let bytes = encode(&entity_update(count));
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("entity_update", count), &bytes, |b, bytes| {
            b.iter(|| decode(black_box(bytes)))
        });
    }

    let chat = encode(&Frame::ChatText {
        from: "Ra1".to_string(),
        text: "hello there, how is the island today?".to_string(),
    });
    group.bench_function("chat_text", |b| b.iter(|| decode(black_box(&chat))));

    group.finish();
}

fn bench_water_depth(c: &mut Criterion) {
    // A lake in the middle of a grass field
    let (width, height) = (256usize, 256usize);
    let cells: Vec<u32> = (0..width * height)
        .map(|i| {
            let (x, y) = ((i % width) as i32 - 128, (i / width) as i32 - 128);
            if x * x + y * y < 60 * 60 {
                TileKind::Water.code()
            } else {
                TileKind::Grass.code()
            }
        })
        .collect();
    let mut world = WorldView::new();
    if world.load_map(width, height, &cells).is_err() {
        return;
    }

    c.bench_function("water_depth_screen", |b| {
        b.iter(|| {
            let mut total = 0;
            for y in 100..130 {
                for x in 100..140 {
                    total += world.water_depth(black_box(x), black_box(y));
                }
            }
            total
        })
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_water_depth);
criterion_main!(benches);
