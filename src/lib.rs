//! Region snapshots for voxel worlds.
//!
//! A set of cuboid regions is captured into a palette-compressed document
//! by a scanner that runs in short time slices on the world's tick loop.
//! Documents are assembled and written off the tick loop, read back
//! (current format first, then the legacy one), and replayed into a
//! destination through a batched mutation queue.
//!
//! ```ignore
//! use plotschem::{CuboidRegion, ExportJob, SchematicSettings};
//!
//! let settings = SchematicSettings::default();
//! let (mut job, handle) = ExportJob::new(&[CuboidRegion::new((0, 0, 0), (15, 255, 15))], &settings)?;
//! while !job.tick(&world).is_finished() {
//!     // wait for the next tick
//! }
//! let document = futures::executor::block_on(handle)?;
//! ```

pub mod batch;
pub mod block_state;
pub mod bounding_box;
pub mod clipboard;
pub mod document;
pub mod error;
pub mod export;
pub mod formats;
pub mod nbt_value;
pub mod palette;
pub mod paste;
pub mod scanner;
pub mod settings;
pub mod store;
pub mod tile_entity;
pub mod varint;
pub mod world;

pub use batch::{file_name_for, BatchCallback, BatchExporter, BatchSummary, ExportTarget};
pub use block_state::BlockState;
pub use bounding_box::{bounding_box, CuboidRegion};
pub use clipboard::Clipboard;
pub use document::VoxelDocument;
pub use error::{Result, SchematicError};
pub use export::{ExportHandle, ExportJob, ExportState};
pub use formats::{FormatDecoder, SchematicReader};
pub use palette::PaletteBuilder;
pub use paste::{HeightOverflow, PasteEngine, PasteOptions, PasteReport, SurfacePolicy};
pub use scanner::{CooperativeScanner, ScanCursor, ScanStep};
pub use settings::SchematicSettings;
pub use store::SchematicStore;
pub use tile_entity::TileEntityRecord;
pub use world::{MemoryWorld, MutationQueue, VoxelSample, WorldReader};
