//! Resumable, time-sliced walk over a union of cuboid regions.
//!
//! Regions are visited in the order supplied; inside a region Y is the outer
//! loop, then Z, then X, all ascending. A slice stops before visiting a voxel
//! once the budget is spent, leaving the cursor on that voxel, so the next
//! [`CooperativeScanner::step`] picks up exactly there. The output depends
//! only on the cursor and the world contents, never on how the walk was
//! sliced.

use crate::bounding_box::{bounding_box, CuboidRegion};
use crate::error::{Result, SchematicError};
use crate::palette::PaletteBuilder;
use crate::tile_entity::TileEntityRecord;
use crate::varint::write_varint;
use crate::world::WorldReader;
use log::{debug, warn};
use rustc_hash::FxHashSet;
use std::time::{Duration, Instant};

/// Position of the next voxel to visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanCursor {
    pub region_index: usize,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ScanCursor {
    fn at_start_of(region_index: usize, region: &CuboidRegion) -> Self {
        let (x, y, z) = region.min();
        ScanCursor {
            region_index,
            x,
            y,
            z,
        }
    }
}

/// Result of one slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// Budget exhausted; call `step` again on a later tick.
    Yielded(ScanCursor),
    Complete,
}

/// Everything a finished scan produced, ready for assembly.
#[derive(Debug, Clone)]
pub struct ScanOutput {
    pub regions: Vec<CuboidRegion>,
    pub bounds: CuboidRegion,
    pub block_palette: PaletteBuilder,
    pub block_data: Vec<u8>,
    pub biome_palette: PaletteBuilder,
    pub biome_data: Vec<u8>,
    pub tile_entities: Vec<TileEntityRecord>,
    pub voxels_visited: u64,
}

pub struct CooperativeScanner {
    regions: Vec<CuboidRegion>,
    bounds: CuboidRegion,
    cursor: ScanCursor,
    block_palette: PaletteBuilder,
    block_data: Vec<u8>,
    biome_palette: PaletteBuilder,
    biome_data: Vec<u8>,
    tile_entities: Vec<TileEntityRecord>,
    sampled_columns: FxHashSet<(i32, i32)>,
    voxels_visited: u64,
    slices: u64,
    failure: Option<String>,
}

impl CooperativeScanner {
    pub fn new(regions: &[CuboidRegion]) -> Result<Self> {
        let bounds = bounding_box(regions)?;
        let (width, height, length) = document_dimensions(&bounds)?;
        let volume = bounds.volume().min(1 << 24) as usize;
        let columns = (width as usize).saturating_mul(length as usize).min(1 << 20);
        debug!(
            "scanner over {} region(s), bounds {}x{}x{}",
            regions.len(),
            width,
            height,
            length
        );
        Ok(CooperativeScanner {
            regions: regions.to_vec(),
            bounds,
            cursor: ScanCursor::at_start_of(0, &regions[0]),
            block_palette: PaletteBuilder::new(),
            block_data: Vec::with_capacity(volume),
            biome_palette: PaletteBuilder::new(),
            biome_data: Vec::with_capacity(columns),
            tile_entities: Vec::new(),
            sampled_columns: FxHashSet::default(),
            voxels_visited: 0,
            slices: 0,
            failure: None,
        })
    }

    pub fn bounds(&self) -> CuboidRegion {
        self.bounds
    }

    pub fn cursor(&self) -> ScanCursor {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor.region_index >= self.regions.len()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn voxels_visited(&self) -> u64 {
        self.voxels_visited
    }

    /// Number of `step` calls that did work.
    pub fn slices(&self) -> u64 {
        self.slices
    }

    /// Runs one slice. At least one voxel is visited per call so that a zero
    /// budget still makes progress.
    pub fn step<W: WorldReader + ?Sized>(
        &mut self,
        world: &W,
        budget: Duration,
    ) -> Result<ScanStep> {
        if let Some(reason) = &self.failure {
            return Err(SchematicError::WorldRead(reason.clone()));
        }
        if self.is_complete() {
            return Ok(ScanStep::Complete);
        }

        let start = Instant::now();
        let mut visited_this_slice = 0u64;
        self.slices += 1;

        while let Some(region) = self.regions.get(self.cursor.region_index).copied() {
            let (min_x, min_y, min_z) = region.min();
            let (max_x, max_y, max_z) = region.max();

            while self.cursor.y <= max_y {
                while self.cursor.z <= max_z {
                    while self.cursor.x <= max_x {
                        if visited_this_slice > 0 && start.elapsed() >= budget {
                            debug!(
                                "scan slice {} yielded after {} voxel(s) at {:?}",
                                self.slices, visited_this_slice, self.cursor
                            );
                            return Ok(ScanStep::Yielded(self.cursor));
                        }
                        let (x, y, z) = (self.cursor.x, self.cursor.y, self.cursor.z);
                        if let Err(err) = self.visit(world, x, y, z, min_y) {
                            warn!("scan failed at ({}, {}, {}): {}", x, y, z, err);
                            self.failure = Some(err.to_string());
                            return Err(match err {
                                SchematicError::WorldRead(_) => err,
                                other => SchematicError::WorldRead(other.to_string()),
                            });
                        }
                        visited_this_slice += 1;
                        self.cursor.x += 1;
                    }
                    self.cursor.x = min_x;
                    self.cursor.z += 1;
                }
                self.cursor.z = min_z;
                self.cursor.y += 1;
            }

            let next = self.cursor.region_index + 1;
            self.cursor = match self.regions.get(next) {
                Some(region) => ScanCursor::at_start_of(next, region),
                None => ScanCursor {
                    region_index: next,
                    ..self.cursor
                },
            };
        }

        debug!(
            "scan complete: {} voxel(s) in {} slice(s)",
            self.voxels_visited, self.slices
        );
        Ok(ScanStep::Complete)
    }

    fn visit<W: WorldReader + ?Sized>(
        &mut self,
        world: &W,
        x: i32,
        y: i32,
        z: i32,
        region_min_y: i32,
    ) -> Result<()> {
        let sample = world.block_at(x, y, z)?;
        let origin = self.bounds.min();

        if let Some(metadata) = &sample.metadata {
            let relative = (x - origin.0, y - origin.1, z - origin.2);
            self.tile_entities.push(TileEntityRecord::from_metadata(
                metadata,
                sample.state.get_name(),
                relative,
            ));
        }

        let code = self.block_palette.intern_index(&sample.state.key());
        write_varint(&mut self.block_data, code);

        // bottom layer of the region stands in for "first visit of this column"
        if y == region_min_y && self.sampled_columns.insert((x, z)) {
            let biome = world.biome_at(x, z)?;
            let code = self.biome_palette.intern_index(&biome);
            write_varint(&mut self.biome_data, code);
        }

        self.voxels_visited += 1;
        Ok(())
    }

    /// Drives the scan to completion in a single slice.
    pub fn run_to_end<W: WorldReader + ?Sized>(&mut self, world: &W) -> Result<()> {
        while let ScanStep::Yielded(_) = self.step(world, Duration::MAX)? {}
        Ok(())
    }

    pub fn into_output(self) -> Result<ScanOutput> {
        if let Some(reason) = self.failure {
            return Err(SchematicError::WorldRead(reason));
        }
        if !self.is_complete() {
            return Err(SchematicError::CorruptDocument(format!(
                "scan stopped at {:?} before covering every region",
                self.cursor
            )));
        }
        Ok(ScanOutput {
            regions: self.regions,
            bounds: self.bounds,
            block_palette: self.block_palette,
            block_data: self.block_data,
            biome_palette: self.biome_palette,
            biome_data: self.biome_data,
            tile_entities: self.tile_entities,
            voxels_visited: self.voxels_visited,
        })
    }
}

/// Extent of `bounds` per axis, or `RegionTooLarge` when any axis exceeds
/// what a document header can hold.
fn document_dimensions(bounds: &CuboidRegion) -> Result<(i32, i32, i32)> {
    let (min, max) = (bounds.min(), bounds.max());
    let extent = |lo: i32, hi: i32| hi as i64 - lo as i64 + 1;
    let (width, height, length) = (
        extent(min.0, max.0),
        extent(min.1, max.1),
        extent(min.2, max.2),
    );
    let limit = u16::MAX as i64;
    if width > limit || height > limit || length > limit {
        let saturate = |d: i64| d.min(i32::MAX as i64) as i32;
        return Err(SchematicError::RegionTooLarge {
            width: saturate(width),
            height: saturate(height),
            length: saturate(length),
        });
    }
    Ok((width as i32, height as i32, length as i32))
}
