//! Documents on disk: name normalisation, crash-safe saves, loading and
//! listing.

use crate::clipboard::Clipboard;
use crate::document::VoxelDocument;
use crate::error::{Result, SchematicError};
use crate::formats::SchematicReader;
use crate::settings::SchematicSettings;
use flate2::Compression;
use log::{debug, error};
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const EXTENSION: &str = "schem";
pub const LEGACY_EXTENSION: &str = "schematic";

/// Keeps names ending in `.schem` or `.schematic`; appends `.schem` otherwise.
pub fn normalize_name(name: &str) -> String {
    if has_schematic_extension(name) {
        name.to_string()
    } else {
        format!("{}.{}", name, EXTENSION)
    }
}

fn has_schematic_extension(name: &str) -> bool {
    name.ends_with(".schem") || name.ends_with(".schematic")
}

/// Writes `document` to `path` through a sibling temporary file that is
/// renamed into place, so a failed write never leaves a partial document.
pub fn save_document(document: &VoxelDocument, path: &Path, compression: Compression) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schematic".to_string());
    let temp = path.with_file_name(format!(".{}.tmp", file_name));

    let written = (|| -> Result<()> {
        let file = fs::File::create(&temp)?;
        let mut writer = BufWriter::new(file);
        document.write_to(&mut writer, compression)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    })();

    match written.and_then(|_| fs::rename(&temp, path).map_err(SchematicError::from)) {
        Ok(()) => {
            debug!("saved schematic to {}", path.display());
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&temp);
            Err(err)
        }
    }
}

pub struct SchematicStore {
    root: PathBuf,
    compression: Compression,
    reader: SchematicReader,
}

impl SchematicStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compression: Compression::default(),
            reader: SchematicReader::default(),
        }
    }

    pub fn from_settings(settings: &SchematicSettings) -> Self {
        Self {
            root: settings.schematics_dir.clone(),
            compression: settings.compression(),
            reader: SchematicReader::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(normalize_name(name))
    }

    /// Saves under `path`, resolved against the store root when relative.
    pub fn try_save(&self, document: &VoxelDocument, path: &Path) -> Result<()> {
        save_document(document, &self.root.join(path), self.compression)
    }

    /// Like [`SchematicStore::try_save`], reporting failure as `false` after
    /// logging the cause.
    pub fn save(&self, document: &VoxelDocument, path: &Path) -> bool {
        match self.try_save(document, path) {
            Ok(()) => true,
            Err(err) => {
                error!("failed to save schematic {}: {}", path.display(), err);
                false
            }
        }
    }

    pub fn save_named(&self, document: &VoxelDocument, name: &str) -> Result<PathBuf> {
        let path = self.path_for(name);
        save_document(document, &path, self.compression)?;
        Ok(path)
    }

    /// `Ok(None)` when no such document exists.
    pub fn load(&self, name: &str) -> Result<Option<Clipboard>> {
        let path = self.path_for(name);
        if !path.is_file() {
            debug!("no schematic at {}", path.display());
            return Ok(None);
        }
        let mut data = Vec::new();
        fs::File::open(&path)?.read_to_end(&mut data)?;
        self.reader.read(&data).map(Some)
    }

    pub fn read_from<R: Read>(&self, reader: R) -> Result<Clipboard> {
        self.reader.read_from(reader)
    }

    /// File names in the store with either schematic extension, sorted.
    pub fn list_names(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if has_schematic_extension(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_name;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("castle"), "castle.schem");
        assert_eq!(normalize_name("castle.schem"), "castle.schem");
        assert_eq!(normalize_name("castle.schematic"), "castle.schematic");
        assert_eq!(normalize_name("castle.nbt"), "castle.nbt.schem");
    }
}
