use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flate2::Compression;
use plotschem::{
    BlockState, CooperativeScanner, CuboidRegion, MemoryWorld, SchematicReader, VoxelDocument,
};
use std::time::Duration;

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_world_sparse(size: i32, pct: u32) -> MemoryWorld {
    let mut world = MemoryWorld::new();
    let states = [
        BlockState::new("minecraft:stone"),
        BlockState::new("minecraft:oak_planks"),
        BlockState::new("minecraft:oak_stairs")
            .with_property("facing", "east")
            .with_property("half", "bottom"),
    ];
    let mut counter = 0i32;
    for y in 0..size {
        for z in 0..size {
            for x in 0..size {
                counter = counter.wrapping_mul(1103515245).wrapping_add(12345);
                let roll = counter.unsigned_abs() % 100;
                if roll < pct {
                    world.put_block(x, y, z, states[(roll % 3) as usize].clone());
                }
            }
        }
    }
    world
}

fn capture(world: &MemoryWorld, size: i32) -> VoxelDocument {
    let mut scanner =
        CooperativeScanner::new(&[CuboidRegion::new((0, 0, 0), (size - 1, size - 1, size - 1))])
            .unwrap();
    scanner.run_to_end(world).unwrap();
    VoxelDocument::assemble(scanner.into_output().unwrap(), 3465).unwrap()
}

// ── Benchmarks ───────────────────────────────────────────────────────────────

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    for size in [16, 32, 64] {
        let world = make_world_sparse(size, 40);
        let region = [CuboidRegion::new((0, 0, 0), (size - 1, size - 1, size - 1))];
        group.bench_with_input(BenchmarkId::new("one_slice", size), &size, |b, _| {
            b.iter(|| {
                let mut scanner = CooperativeScanner::new(&region).unwrap();
                scanner.run_to_end(black_box(&world)).unwrap();
                black_box(scanner.into_output().unwrap())
            })
        });
        group.bench_with_input(BenchmarkId::new("1ms_slices", size), &size, |b, _| {
            b.iter(|| {
                let mut scanner = CooperativeScanner::new(&region).unwrap();
                while !scanner.is_complete() {
                    scanner
                        .step(black_box(&world), Duration::from_millis(1))
                        .unwrap();
                }
                black_box(scanner.voxels_visited())
            })
        });
    }
    group.finish();
}

fn bench_write_read(c: &mut Criterion) {
    let size = 48;
    let world = make_world_sparse(size, 60);
    let document = capture(&world, size);
    let bytes = document.to_bytes(Compression::default()).unwrap();
    let reader = SchematicReader::default();

    c.bench_function("write_document_48", |b| {
        b.iter(|| black_box(document.to_bytes(Compression::default()).unwrap()))
    });
    c.bench_function("read_document_48", |b| {
        b.iter(|| black_box(reader.read(black_box(&bytes)).unwrap()))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(20);
    targets = bench_scan, bench_write_read
}
criterion_main!(benches);
