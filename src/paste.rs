//! Replays a decoded clipboard into a destination region through a
//! [`MutationQueue`].
//!
//! All validation happens before the first mutation is staged, so a rejected
//! paste leaves the queue untouched.

use crate::bounding_box::CuboidRegion;
use crate::clipboard::Clipboard;
use crate::error::{Result, SchematicError};
use crate::settings::SchematicSettings;
use crate::world::{CompletionTask, MutationQueue, ProgressSubscriber, WorldReader};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Handling of voxels whose destination Y is above the world's top layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeightOverflow {
    /// Leave them out and report how many were dropped.
    #[default]
    Skip,
    /// Refuse the whole paste.
    Reject,
}

/// Where auto-height puts the clipboard's bottom layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePolicy {
    /// The destination has a known surface height.
    Fixed(i32),
    /// Measure the column just inside the destination's minimum corner.
    Measured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasteOptions {
    pub offset: (i32, i32, i32),
    pub auto_height: bool,
    pub surface: SurfacePolicy,
}

impl Default for PasteOptions {
    fn default() -> Self {
        Self {
            offset: (0, 0, 0),
            auto_height: false,
            surface: SurfacePolicy::Measured,
        }
    }
}

/// What a paste handed to the queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteReport {
    /// World position of the clipboard's (0, 0, 0).
    pub origin: (i32, i32, i32),
    pub blocks_submitted: usize,
    pub biomes_submitted: usize,
    pub tiles_submitted: usize,
    /// Voxels dropped because they would land above the top layer.
    pub skipped_above_limit: usize,
    /// Tile entities dropped for the same reason.
    pub tiles_skipped_above_limit: usize,
}

pub struct PasteEngine {
    max_height: i32,
    height_overflow: HeightOverflow,
    notify_progress: bool,
}

impl Default for PasteEngine {
    fn default() -> Self {
        Self::new(&SchematicSettings::default())
    }
}

impl PasteEngine {
    pub fn new(settings: &SchematicSettings) -> Self {
        Self {
            max_height: settings.max_paste_height,
            height_overflow: settings.height_overflow,
            notify_progress: settings.notify_progress,
        }
    }

    pub fn with_height_overflow(mut self, policy: HeightOverflow) -> Self {
        self.height_overflow = policy;
        self
    }

    pub fn max_height(&self) -> i32 {
        self.max_height
    }

    /// Checks that the clipboard fits the destination footprint after the
    /// horizontal offset and is not taller than the world.
    pub fn validate(
        &self,
        clipboard: &Clipboard,
        destination: &CuboidRegion,
        options: &PasteOptions,
    ) -> Result<()> {
        let (width, height, length) = clipboard.dimensions();
        let available_width = destination.width() + options.offset.0;
        let available_length = destination.length() + options.offset.2;
        if available_width < width || available_length < length {
            return Err(SchematicError::DestinationTooSmall {
                width,
                length,
                available_width,
                available_length,
            });
        }
        if height > self.max_height {
            return Err(SchematicError::HeightExceedsLimit {
                height,
                limit: self.max_height,
            });
        }
        Ok(())
    }

    /// Y the clipboard's bottom layer lands on.
    pub fn resolve_base_y<W: WorldReader + ?Sized>(
        &self,
        clipboard: &Clipboard,
        destination: &CuboidRegion,
        options: &PasteOptions,
        world: &W,
    ) -> Result<i32> {
        let dy = options.offset.1;
        if !options.auto_height || clipboard.height() >= self.max_height {
            return Ok(dy);
        }
        match options.surface {
            SurfacePolicy::Fixed(surface) => Ok(dy + surface),
            SurfacePolicy::Measured => {
                let (min_x, _, min_z) = destination.min();
                Ok(dy + 1 + world.highest_block_y(min_x + 1, min_z + 1)?)
            }
        }
    }

    fn prepare<W: WorldReader + ?Sized>(
        &self,
        clipboard: &Clipboard,
        destination: &CuboidRegion,
        options: &PasteOptions,
        world: &W,
    ) -> Result<i32> {
        self.validate(clipboard, destination, options)?;
        let base_y = self.resolve_base_y(clipboard, destination, options, world)?;
        let top = base_y + clipboard.height() - 1;
        if self.height_overflow == HeightOverflow::Reject && top >= self.max_height {
            return Err(SchematicError::HeightExceedsLimit {
                height: top + 1,
                limit: self.max_height,
            });
        }
        Ok(base_y)
    }

    /// Stages every voxel of `clipboard` and submits the batch.
    ///
    /// The bottom layer also sets the column biome. `when_done` runs with
    /// `false` if validation fails, otherwise the queue runs it once the
    /// batch has been applied. The clipboard is consumed either way.
    #[allow(clippy::too_many_arguments)]
    pub fn paste<W, Q>(
        &self,
        clipboard: Clipboard,
        destination: &CuboidRegion,
        options: &PasteOptions,
        world: &W,
        queue: &mut Q,
        progress: Option<ProgressSubscriber>,
        when_done: Option<CompletionTask>,
    ) -> Result<PasteReport>
    where
        W: WorldReader + ?Sized,
        Q: MutationQueue + ?Sized,
    {
        let base_y = match self.prepare(&clipboard, destination, options, world) {
            Ok(base_y) => base_y,
            Err(err) => {
                warn!("paste into {:?} rejected: {}", destination, err);
                if let Some(done) = when_done {
                    done(false);
                }
                return Err(err);
            }
        };

        let (min_x, _, min_z) = destination.min();
        let origin = (min_x + options.offset.0, base_y, min_z + options.offset.2);
        let (width, height, length) = clipboard.dimensions();
        let top = self.max_height - 1;
        let mut report = PasteReport {
            origin,
            ..Default::default()
        };

        for ry in 0..height.min(self.max_height) {
            let y = origin.1 + ry;
            if y > top {
                report.skipped_above_limit += (width * length) as usize;
                continue;
            }
            for rz in 0..length {
                for rx in 0..width {
                    let (x, z) = (origin.0 + rx, origin.2 + rz);
                    if let Some(state) = clipboard.block(rx, ry, rz) {
                        queue.set_block(x, y, z, state);
                        report.blocks_submitted += 1;
                    }
                    if ry == 0 {
                        if let Some(biome) = clipboard.biome(rx, rz) {
                            queue.set_biome(x, y, z, biome);
                            report.biomes_submitted += 1;
                        }
                    }
                }
            }
        }

        for tile in clipboard.tile_entities() {
            let (x, y, z) = (
                origin.0 + tile.pos.0,
                origin.1 + tile.pos.1,
                origin.2 + tile.pos.2,
            );
            if y > top {
                report.tiles_skipped_above_limit += 1;
                continue;
            }
            queue.set_tile(x, y, z, tile);
            report.tiles_submitted += 1;
        }

        if report.skipped_above_limit > 0 {
            warn!(
                "{} voxel(s) and {} tile entities above y={} were left out of the paste at {:?}",
                report.skipped_above_limit, report.tiles_skipped_above_limit, top, origin
            );
        }

        if self.notify_progress {
            if let Some(subscriber) = progress {
                queue.add_progress_subscriber(subscriber);
            }
        }
        queue.set_complete_task(when_done.unwrap_or_else(|| Box::new(|_| {})));
        queue.enqueue();

        info!(
            "pasted {}x{}x{} clipboard at {:?} ({} blocks queued)",
            width, height, length, origin, report.blocks_submitted
        );
        Ok(report)
    }
}
