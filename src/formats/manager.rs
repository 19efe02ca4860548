use crate::clipboard::Clipboard;
use crate::error::{Result, SchematicError};
use flate2::read::GzDecoder;
use log::{debug, warn};
use quartz_nbt::io::Flavor;
use quartz_nbt::NbtCompound;
use std::io::{BufReader, Cursor, Read};

/// One on-disk schematic layout.
///
/// `decode` answers `Ok(None)` when the tag tree does not have this format's
/// shape, so the next decoder can try. An `Err` means the shape matched but
/// the contents are unusable.
pub trait FormatDecoder: Send + Sync {
    fn name(&self) -> &'static str;
    fn decode(&self, root: &NbtCompound) -> Result<Option<Clipboard>>;
}

/// Tries its decoders in registration order and returns the first match.
pub struct SchematicReader {
    decoders: Vec<Box<dyn FormatDecoder>>,
}

impl Default for SchematicReader {
    /// Current format first, then the legacy one.
    fn default() -> Self {
        let mut reader = SchematicReader::empty();
        reader.register(crate::formats::sponge::SpongeDecoder);
        reader.register(crate::formats::mcedit::McEditDecoder);
        reader
    }
}

impl SchematicReader {
    pub fn empty() -> Self {
        Self {
            decoders: Vec::new(),
        }
    }

    pub fn register<D: FormatDecoder + 'static>(&mut self, decoder: D) {
        self.decoders.push(Box::new(decoder));
    }

    pub fn list_decoders(&self) -> Vec<&'static str> {
        self.decoders.iter().map(|d| d.name()).collect()
    }

    /// Name of the first decoder that accepts `root`, without keeping the result.
    pub fn detect_format(&self, root: &NbtCompound) -> Option<&'static str> {
        self.decoders
            .iter()
            .find(|decoder| matches!(decoder.decode(root), Ok(Some(_))))
            .map(|decoder| decoder.name())
    }

    pub fn decode_root(&self, root: &NbtCompound) -> Result<Clipboard> {
        for (attempt, decoder) in self.decoders.iter().enumerate() {
            match decoder.decode(root)? {
                Some(clipboard) => {
                    if attempt > 0 {
                        warn!("schematic decoded with fallback format '{}'", decoder.name());
                    } else {
                        debug!("schematic decoded as '{}'", decoder.name());
                    }
                    return Ok(clipboard);
                }
                None => debug!("not a '{}' schematic", decoder.name()),
            }
        }
        Err(SchematicError::UnsupportedSchematicFormat)
    }

    /// Parses a document, gzip-compressed or not.
    pub fn read(&self, data: &[u8]) -> Result<Clipboard> {
        self.decode_root(&read_root(data)?)
    }

    pub fn read_from<R: Read>(&self, mut reader: R) -> Result<Clipboard> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.read(&data)
    }
}

/// Parses the tag tree of `data`, inflating it first when it carries the
/// gzip magic.
pub fn read_root(data: &[u8]) -> Result<NbtCompound> {
    let parsed = if data.starts_with(&[0x1f, 0x8b]) {
        let reader = BufReader::with_capacity(1 << 20, data);
        let mut gz = GzDecoder::new(reader);
        quartz_nbt::io::read_nbt(&mut gz, Flavor::Uncompressed)
    } else {
        quartz_nbt::io::read_nbt(&mut Cursor::new(data), Flavor::Uncompressed)
    };
    match parsed {
        Ok((root, _)) => Ok(root),
        Err(err) => {
            debug!("input is not a readable tag tree: {}", err);
            Err(SchematicError::UnsupportedSchematicFormat)
        }
    }
}
