use flate2::Compression;
use plotschem::store::save_document;
use plotschem::{
    BlockState, CooperativeScanner, CuboidRegion, MemoryWorld, SchematicSettings, SchematicStore,
    VoxelDocument,
};
use std::path::Path;

fn document() -> VoxelDocument {
    let mut world = MemoryWorld::new();
    world.put_block(0, 0, 0, BlockState::new("minecraft:bricks"));
    let mut scanner = CooperativeScanner::new(&[CuboidRegion::new((0, 0, 0), (2, 1, 2))]).unwrap();
    scanner.run_to_end(&world).unwrap();
    VoxelDocument::assemble(scanner.into_output().unwrap(), 3465).unwrap()
}

#[test]
fn saved_documents_load_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let store = SchematicStore::new(dir.path());

    let path = store.save_named(&document(), "house").unwrap();
    assert_eq!(path, dir.path().join("house.schem"));
    assert!(store.save(&document(), Path::new("barn.schematic")));

    assert_eq!(store.list_names().unwrap(), vec!["barn.schematic", "house.schem"]);

    let clipboard = store.load("house").unwrap().unwrap();
    assert_eq!(clipboard.dimensions(), (3, 2, 3));
    assert_eq!(
        clipboard.block(0, 0, 0),
        Some(&BlockState::new("minecraft:bricks"))
    );
    assert!(store.load("barn.schematic").unwrap().is_some());
    assert!(store.load("missing").unwrap().is_none());
}

#[test]
fn store_follows_settings() {
    let dir = tempfile::tempdir().unwrap();
    let settings = SchematicSettings {
        schematics_dir: dir.path().join("nested").join("schematics"),
        compression_level: 9,
        ..Default::default()
    };
    let store = SchematicStore::from_settings(&settings);
    assert_eq!(store.compression(), Compression::best());
    assert!(store.list_names().unwrap().is_empty());

    store.save_named(&document(), "tower").unwrap();
    assert_eq!(store.list_names().unwrap(), vec!["tower.schem"]);
}

#[test]
fn failed_save_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("taken.schem");
    std::fs::create_dir(&target).unwrap();

    assert!(save_document(&document(), &target, Compression::default()).is_err());
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers, vec!["taken.schem"]);
    assert!(target.is_dir());

    let store = SchematicStore::new(dir.path());
    assert!(!store.save(&document(), Path::new("taken.schem")));
    assert!(store.list_names().unwrap().is_empty());
}

#[test]
fn foreign_files_are_not_listed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
    std::fs::create_dir(dir.path().join("folder.schem")).unwrap();
    let store = SchematicStore::new(dir.path());
    store.save_named(&document(), "a").unwrap();
    assert_eq!(store.list_names().unwrap(), vec!["a.schem"]);
}
