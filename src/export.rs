//! Export of a region set: scanning on the tick loop, assembly on the
//! worker pool, and a handle that resolves exactly once.

use crate::bounding_box::CuboidRegion;
use crate::document::VoxelDocument;
use crate::error::{Result, SchematicError};
use crate::scanner::{CooperativeScanner, ScanCursor, ScanStep};
use crate::settings::SchematicSettings;
use crate::world::WorldReader;
use futures::channel::oneshot;
use log::{debug, info, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

const PHASE_SCANNING: u8 = 0;
const PHASE_ASSEMBLING: u8 = 1;
const PHASE_COMPLETE: u8 = 2;
const PHASE_FAILED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    /// Created, not ticked yet.
    Idle,
    /// Waiting for the next tick; the cursor names the next voxel.
    Scanning(ScanCursor),
    /// Scan finished, document being built off the tick loop.
    Assembling,
    Complete,
    Failed,
}

impl ExportState {
    pub fn is_finished(&self) -> bool {
        matches!(self, ExportState::Complete | ExportState::Failed)
    }
}

/// Tick-loop side of an export.
pub struct ExportJob {
    scanner: Option<CooperativeScanner>,
    budget: Duration,
    data_version: i32,
    sender: Option<oneshot::Sender<Result<VoxelDocument>>>,
    phase: Arc<AtomicU8>,
    ticked: bool,
}

impl ExportJob {
    /// Fails before any world read with [`SchematicError::EmptyRegionSet`],
    /// or with [`SchematicError::RegionTooLarge`] when the bounding box is
    /// wider, taller or longer than 65535.
    pub fn new(
        regions: &[CuboidRegion],
        settings: &SchematicSettings,
    ) -> Result<(ExportJob, ExportHandle)> {
        let scanner = CooperativeScanner::new(regions)?;
        let (sender, receiver) = oneshot::channel();
        let job = ExportJob {
            scanner: Some(scanner),
            budget: settings.slice_budget(),
            data_version: settings.data_version,
            sender: Some(sender),
            phase: Arc::new(AtomicU8::new(PHASE_SCANNING)),
            ticked: false,
        };
        Ok((job, ExportHandle { receiver }))
    }

    pub fn state(&self) -> ExportState {
        if let Some(scanner) = &self.scanner {
            return if self.ticked {
                ExportState::Scanning(scanner.cursor())
            } else {
                ExportState::Idle
            };
        }
        match self.phase.load(Ordering::Acquire) {
            PHASE_ASSEMBLING => ExportState::Assembling,
            PHASE_COMPLETE => ExportState::Complete,
            _ => ExportState::Failed,
        }
    }

    /// Runs one scan slice. Must be called from the tick loop; does nothing
    /// once the scan has finished.
    pub fn tick<W: WorldReader + ?Sized>(&mut self, world: &W) -> ExportState {
        let Some(scanner) = self.scanner.as_mut() else {
            return self.state();
        };
        self.ticked = true;
        match scanner.step(world, self.budget) {
            Ok(ScanStep::Yielded(cursor)) => ExportState::Scanning(cursor),
            Ok(ScanStep::Complete) => {
                if let Some(scanner) = self.scanner.take() {
                    self.hand_off(scanner);
                }
                self.state()
            }
            Err(err) => {
                self.scanner = None;
                self.fail(err);
                ExportState::Failed
            }
        }
    }

    fn hand_off(&mut self, scanner: CooperativeScanner) {
        let output = match scanner.into_output() {
            Ok(output) => output,
            Err(err) => return self.fail(err),
        };
        let Some(sender) = self.sender.take() else {
            return;
        };
        debug!(
            "scan of {} voxel(s) done, assembling off the tick loop",
            output.voxels_visited
        );
        self.phase.store(PHASE_ASSEMBLING, Ordering::Release);
        let phase = Arc::clone(&self.phase);
        let data_version = self.data_version;
        rayon::spawn(move || {
            let document = VoxelDocument::assemble(output, data_version);
            let next = match &document {
                Ok(document) => {
                    let (width, height, length) = document.dimensions();
                    info!(
                        "export assembled: {}x{}x{}, {} palette entries",
                        width,
                        height,
                        length,
                        document.block_palette.len()
                    );
                    PHASE_COMPLETE
                }
                Err(err) => {
                    warn!("export assembly failed: {}", err);
                    PHASE_FAILED
                }
            };
            phase.store(next, Ordering::Release);
            if sender.send(document).is_err() {
                debug!("export handle was dropped before the document was ready");
            }
        });
    }

    fn fail(&mut self, err: SchematicError) {
        warn!("export failed: {}", err);
        self.phase.store(PHASE_FAILED, Ordering::Release);
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(Err(err));
        }
    }
}

/// Receives the outcome of an [`ExportJob`]. Await it, or poll with
/// [`ExportHandle::try_take`] from code that cannot block.
pub struct ExportHandle {
    receiver: oneshot::Receiver<Result<VoxelDocument>>,
}

impl ExportHandle {
    /// `None` while the export is still running.
    pub fn try_take(&mut self) -> Option<Result<VoxelDocument>> {
        match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::Canceled) => Some(Err(SchematicError::ExportAbandoned)),
        }
    }
}

impl Future for ExportHandle {
    type Output = Result<VoxelDocument>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|outcome| outcome.unwrap_or(Err(SchematicError::ExportAbandoned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_state::BlockState;
    use crate::world::MemoryWorld;

    fn settings(slice_budget_ms: u64) -> SchematicSettings {
        SchematicSettings {
            slice_budget_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_region_set_is_rejected() {
        assert!(matches!(
            ExportJob::new(&[], &settings(40)),
            Err(SchematicError::EmptyRegionSet)
        ));
    }

    #[test]
    fn test_oversized_export_fails_before_scanning() {
        assert!(matches!(
            ExportJob::new(&[CuboidRegion::new((0, 0, 0), (69_999, 0, 0))], &settings(40)),
            Err(SchematicError::RegionTooLarge {
                width: 70_000,
                height: 1,
                length: 1
            })
        ));
    }

    #[test]
    fn test_states_follow_the_scan() {
        let mut world = MemoryWorld::new();
        world.put_block(1, 0, 0, BlockState::new("minecraft:stone"));
        let (mut job, handle) =
            ExportJob::new(&[CuboidRegion::new((0, 0, 0), (1, 0, 0))], &settings(0)).unwrap();

        assert_eq!(job.state(), ExportState::Idle);
        assert!(matches!(job.tick(&world), ExportState::Scanning(_)));
        let state = job.tick(&world);
        assert!(matches!(
            state,
            ExportState::Assembling | ExportState::Complete
        ));

        let document = futures::executor::block_on(handle).unwrap();
        assert_eq!(document.dimensions(), (2, 1, 1));
        assert_eq!(job.state(), ExportState::Complete);
        assert_eq!(job.tick(&world), ExportState::Complete);
    }

    #[test]
    fn test_dropped_job_abandons_handle() {
        let (job, mut handle) =
            ExportJob::new(&[CuboidRegion::new((0, 0, 0), (0, 0, 0))], &settings(40)).unwrap();
        assert!(handle.try_take().is_none());
        drop(job);
        assert!(matches!(
            handle.try_take(),
            Some(Err(SchematicError::ExportAbandoned))
        ));
    }
}
