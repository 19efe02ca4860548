use plotschem::world::VoxelSample;
use plotschem::{
    BatchExporter, BatchSummary, BlockState, CuboidRegion, ExportJob, ExportState, ExportTarget,
    MemoryWorld, Result, SchematicError, SchematicReader, SchematicSettings, WorldReader,
};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

fn settings(dir: &Path) -> SchematicSettings {
    SchematicSettings {
        schematics_dir: dir.to_path_buf(),
        slice_budget_ms: 0,
        ..Default::default()
    }
}

fn target(x: i32, world: &str, owner: Option<&str>) -> ExportTarget {
    let base = x * 10;
    ExportTarget {
        id: (x, 0),
        world: world.to_string(),
        owner: owner.map(str::to_string),
        regions: vec![CuboidRegion::new((base, 0, 0), (base + 1, 1, 1))],
    }
}

fn drive(exporter: &BatchExporter, world: &MemoryWorld) {
    let mut ticks = 0;
    while exporter.tick(world) {
        ticks += 1;
        assert!(ticks < 100_000, "batch never finished");
        std::thread::sleep(Duration::from_micros(50));
    }
}

/// Fails on one voxel, like a world whose chunk could not be loaded.
struct BrokenWorld {
    inner: MemoryWorld,
    broken_at: (i32, i32, i32),
}

impl WorldReader for BrokenWorld {
    fn block_at(&self, x: i32, y: i32, z: i32) -> Result<VoxelSample> {
        if (x, y, z) == self.broken_at {
            return Err(SchematicError::WorldRead(format!("chunk at {} {} not loaded", x, z)));
        }
        self.inner.block_at(x, y, z)
    }

    fn biome_at(&self, x: i32, z: i32) -> Result<String> {
        self.inner.biome_at(x, z)
    }

    fn highest_block_y(&self, x: i32, z: i32) -> Result<i32> {
        self.inner.highest_block_y(x, z)
    }
}

#[test]
fn job_scans_across_ticks_and_resolves_once() {
    let mut world = MemoryWorld::new();
    world.put_block(1, 1, 1, BlockState::new("minecraft:diamond_block"));
    let dir = tempfile::tempdir().unwrap();
    let (mut job, handle) =
        ExportJob::new(&[CuboidRegion::new((0, 0, 0), (1, 1, 1))], &settings(dir.path())).unwrap();

    let mut scanning_ticks = 0;
    loop {
        match job.tick(&world) {
            ExportState::Scanning(_) => scanning_ticks += 1,
            ExportState::Assembling | ExportState::Complete => break,
            other => panic!("unexpected state {:?}", other),
        }
    }
    assert_eq!(scanning_ticks, 7);

    let document = futures::executor::block_on(handle).unwrap();
    assert_eq!(document.dimensions(), (2, 2, 2));
    assert_eq!(document.data_version, 3465);
    assert_eq!(
        document.block_palette,
        vec!["minecraft:air", "minecraft:diamond_block"]
    );
}

#[test]
fn read_failure_fails_the_job() {
    let world = BrokenWorld {
        inner: MemoryWorld::new(),
        broken_at: (1, 0, 0),
    };
    let dir = tempfile::tempdir().unwrap();
    let (mut job, mut handle) =
        ExportJob::new(&[CuboidRegion::new((0, 0, 0), (2, 0, 0))], &settings(dir.path())).unwrap();

    assert!(matches!(job.tick(&world), ExportState::Scanning(_)));
    assert_eq!(job.tick(&world), ExportState::Failed);
    assert_eq!(job.tick(&world), ExportState::Failed);
    assert!(matches!(
        handle.try_take(),
        Some(Err(SchematicError::WorldRead(_)))
    ));
}

#[test]
fn export_all_writes_every_target_and_reports_success() {
    let mut world = MemoryWorld::new();
    world.put_block(10, 0, 0, BlockState::new("minecraft:stone"));
    let dir = tempfile::tempdir().unwrap();
    let exporter = BatchExporter::new(settings(dir.path()));
    let (tx, rx) = mpsc::channel();

    let started = exporter.export_all(
        vec![target(0, "plots", Some("alice")), target(1, "plots", None)],
        None,
        None,
        Some(Box::new(move |summary| {
            let _ = tx.send(summary);
        })),
    );
    assert!(started);
    assert!(exporter.is_running());

    drive(&exporter, &world);

    assert!(!exporter.is_running());
    assert_eq!(
        rx.recv().unwrap(),
        BatchSummary {
            exported: 2,
            failed: 0
        }
    );
    assert!(dir.path().join("0;0,plots,alice.schem").is_file());
    let second = dir.path().join("1;0,plots,unknown.schem");
    let data = std::fs::read(&second).unwrap();
    let clipboard = SchematicReader::default().read(&data).unwrap();
    assert_eq!(
        clipboard.block(0, 0, 0),
        Some(&BlockState::new("minecraft:stone"))
    );
}

#[test]
fn second_batch_is_refused_while_one_runs() {
    let world = MemoryWorld::new();
    let dir = tempfile::tempdir().unwrap();
    let exporter = BatchExporter::new(settings(dir.path()));

    assert!(exporter.export_all(vec![target(0, "plots", None)], None, None, None));
    assert!(!exporter.export_all(vec![target(1, "plots", None)], None, None, None));
    assert!(matches!(
        exporter.try_export_all(vec![target(1, "plots", None)], None, None, None),
        Err(SchematicError::ConcurrentExportAlreadyRunning)
    ));

    drive(&exporter, &world);
    assert!(dir.path().join("0;0,plots,unknown.schem").is_file());
    assert!(!dir.path().join("1;0,plots,unknown.schem").exists());

    assert!(!exporter.export_all(Vec::new(), None, None, None));
    assert!(exporter.export_all(vec![target(1, "plots", None)], None, None, None));
    drive(&exporter, &world);
    assert!(dir.path().join("1;0,plots,unknown.schem").is_file());
}

#[test]
fn failed_save_does_not_stop_the_batch() {
    let world = MemoryWorld::new();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out");
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("blocked"), b"not a directory").unwrap();

    let exporter = BatchExporter::new(settings(dir.path()));
    let (tx, rx) = mpsc::channel();
    assert!(exporter.export_all(
        vec![target(0, "blocked", None), target(1, "open", None)],
        Some(output.clone()),
        Some("%world%/plot_%idx%_%idy%".to_string()),
        Some(Box::new(move |summary| {
            let _ = tx.send(summary);
        })),
    ));
    drive(&exporter, &world);

    assert_eq!(
        rx.recv().unwrap(),
        BatchSummary {
            exported: 1,
            failed: 1
        }
    );
    assert!(output.join("open").join("plot_1_0.schem").is_file());
    assert!(!exporter.is_running());
}

#[test]
fn oversized_export_is_refused_before_any_read() {
    let result = ExportJob::new(
        &[CuboidRegion::new((0, 0, 0), (69_999, 3, 3))],
        &SchematicSettings::default(),
    );
    assert!(matches!(
        result,
        Err(SchematicError::RegionTooLarge { width: 70_000, .. })
    ));
}

#[test]
fn legacy_suffix_in_a_naming_scheme_still_gets_the_current_extension() {
    let world = MemoryWorld::new();
    let dir = tempfile::tempdir().unwrap();
    let exporter = BatchExporter::new(settings(dir.path()));
    assert!(exporter.export_all(
        vec![target(2, "plots", None)],
        None,
        Some("plot_%idx%.schematic".to_string()),
        None,
    ));
    drive(&exporter, &world);

    let saved = dir.path().join("plot_2.schematic.schem");
    assert!(saved.is_file());
    assert!(!dir.path().join("plot_2.schematic").exists());
    let bytes = std::fs::read(saved).unwrap();
    assert_eq!(
        SchematicReader::default().read(&bytes).unwrap().dimensions(),
        (2, 2, 2)
    );
}
