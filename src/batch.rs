//! "Export all": exports a list of targets one after another into a
//! directory. At most one batch runs per [`BatchExporter`].

use crate::bounding_box::CuboidRegion;
use crate::document::VoxelDocument;
use crate::error::{Result, SchematicError};
use crate::export::{ExportHandle, ExportJob};
use crate::settings::SchematicSettings;
use crate::store::{save_document, EXTENSION};
use crate::world::WorldReader;
use futures::channel::oneshot;
use log::{error, info, warn};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// One plot-like unit to export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub id: (i32, i32),
    pub world: String,
    pub owner: Option<String>,
    pub regions: Vec<CuboidRegion>,
}

/// Counts reported to the batch's success callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub exported: usize,
    pub failed: usize,
}

pub type BatchCallback = Box<dyn FnOnce(BatchSummary) + Send>;

/// File name (without extension) for `target`.
///
/// The scheme may use `%id%` (`x;y`), `%idx%`, `%idy%` and `%world%`. Without
/// a scheme the name is `x;y,world,owner`, with `unknown` for a missing owner.
pub fn file_name_for(target: &ExportTarget, naming_scheme: Option<&str>) -> String {
    let (x, y) = target.id;
    match naming_scheme {
        None => format!(
            "{};{},{},{}",
            x,
            y,
            target.world,
            target.owner.as_deref().unwrap_or("unknown")
        ),
        Some(scheme) => scheme
            .replace("%idx%", &x.to_string())
            .replace("%idy%", &y.to_string())
            .replace("%id%", &format!("{};{}", x, y))
            .replace("%world%", &target.world),
    }
}

/// Batch output is always a current-format document, so a scheme that ends
/// in the legacy `.schematic` still gets `.schem` appended.
fn document_file_name(name: &str) -> String {
    let suffix = format!(".{}", EXTENSION);
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

enum Stage {
    Ready,
    Scanning {
        name: String,
        job: ExportJob,
        handle: ExportHandle,
    },
    Saving {
        name: String,
        receiver: oneshot::Receiver<bool>,
    },
}

struct Batch {
    targets: VecDeque<ExportTarget>,
    output_dir: PathBuf,
    naming_scheme: Option<String>,
    settings: SchematicSettings,
    stage: Stage,
    summary: BatchSummary,
    on_success: Option<BatchCallback>,
}

impl Batch {
    /// Moves the batch forward by at most one scan slice. Returns `true` once
    /// every target has been exported or has failed.
    fn advance<W: WorldReader + ?Sized>(&mut self, world: &W) -> bool {
        loop {
            match std::mem::replace(&mut self.stage, Stage::Ready) {
                Stage::Ready => {
                    let Some(target) = self.targets.pop_front() else {
                        return true;
                    };
                    self.start(target);
                }
                Stage::Scanning {
                    name,
                    mut job,
                    mut handle,
                } => {
                    if !job.tick(world).is_finished() {
                        self.stage = Stage::Scanning { name, job, handle };
                        return false;
                    }
                    match handle.try_take() {
                        None => {
                            self.stage = Stage::Scanning { name, job, handle };
                            return false;
                        }
                        Some(Ok(document)) => {
                            self.stage = self.save(name, document);
                            return false;
                        }
                        Some(Err(err)) => {
                            error!("failed to export {}: {}", name, err);
                            self.summary.failed += 1;
                        }
                    }
                }
                Stage::Saving { name, mut receiver } => match receiver.try_recv() {
                    Ok(None) => {
                        self.stage = Stage::Saving { name, receiver };
                        return false;
                    }
                    Ok(Some(true)) => self.summary.exported += 1,
                    Ok(Some(false)) | Err(oneshot::Canceled) => {
                        error!("failed to save {}", name);
                        self.summary.failed += 1;
                    }
                },
            }
        }
    }

    fn start(&mut self, target: ExportTarget) {
        let name = file_name_for(&target, self.naming_scheme.as_deref());
        match ExportJob::new(&target.regions, &self.settings) {
            Ok((job, handle)) => self.stage = Stage::Scanning { name, job, handle },
            Err(err) => {
                warn!("skipping {}: {}", name, err);
                self.summary.failed += 1;
            }
        }
    }

    fn save(&self, name: String, document: VoxelDocument) -> Stage {
        let path = self.output_dir.join(document_file_name(&name));
        let compression = self.settings.compression();
        let (sender, receiver) = oneshot::channel();
        rayon::spawn(move || {
            let saved = match save_document(&document, &path, compression) {
                Ok(()) => true,
                Err(err) => {
                    error!("could not write {}: {}", path.display(), err);
                    false
                }
            };
            let _ = sender.send(saved);
        });
        Stage::Saving { name, receiver }
    }
}

pub struct BatchExporter {
    settings: SchematicSettings,
    running: AtomicBool,
    batch: Mutex<Option<Batch>>,
}

impl BatchExporter {
    pub fn new(settings: SchematicSettings) -> Self {
        Self {
            settings,
            running: AtomicBool::new(false),
            batch: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts a batch over `targets`. Files go to `output_dir`, or the
    /// configured schematics directory, named by `naming_scheme` or the
    /// configured default. The batch makes progress on [`BatchExporter::tick`].
    pub fn try_export_all(
        &self,
        targets: Vec<ExportTarget>,
        output_dir: Option<PathBuf>,
        naming_scheme: Option<String>,
        on_success: Option<BatchCallback>,
    ) -> Result<()> {
        if self.is_running() {
            return Err(SchematicError::ConcurrentExportAlreadyRunning);
        }
        if targets.is_empty() {
            return Err(SchematicError::NothingToExport);
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SchematicError::ConcurrentExportAlreadyRunning);
        }

        info!("exporting {} target(s)", targets.len());
        let batch = Batch {
            targets: targets.into(),
            output_dir: output_dir.unwrap_or_else(|| self.settings.schematics_dir.clone()),
            naming_scheme: naming_scheme.or_else(|| self.settings.default_naming_scheme.clone()),
            settings: self.settings.clone(),
            stage: Stage::Ready,
            summary: BatchSummary::default(),
            on_success,
        };
        *self.batch.lock().unwrap_or_else(PoisonError::into_inner) = Some(batch);
        Ok(())
    }

    /// `false` if a batch is already running or `targets` is empty; the
    /// running batch is left untouched.
    pub fn export_all(
        &self,
        targets: Vec<ExportTarget>,
        output_dir: Option<PathBuf>,
        naming_scheme: Option<String>,
        on_success: Option<BatchCallback>,
    ) -> bool {
        match self.try_export_all(targets, output_dir, naming_scheme, on_success) {
            Ok(()) => true,
            Err(err) => {
                info!("export-all request refused: {}", err);
                false
            }
        }
    }

    /// Drives the running batch from the tick loop. Returns `true` while a
    /// batch is still in progress.
    pub fn tick<W: WorldReader + ?Sized>(&self, world: &W) -> bool {
        let mut guard = self.batch.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(batch) = guard.as_mut() else {
            return false;
        };
        if !batch.advance(world) {
            return true;
        }

        let finished = guard.take();
        drop(guard);
        self.running.store(false, Ordering::Release);
        if let Some(batch) = finished {
            info!(
                "export-all finished: {} saved, {} failed",
                batch.summary.exported, batch.summary.failed
            );
            if let Some(on_success) = batch.on_success {
                on_success(batch.summary);
            }
        }
        false
    }
}
