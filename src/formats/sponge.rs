//! The document layout this crate writes (Version 2) and its Version 1
//! predecessor, which had no biomes and called block entities `TileEntities`.

use crate::clipboard::Clipboard;
use crate::document::VoxelDocument;
use crate::error::{Result, SchematicError};
use crate::formats::manager::FormatDecoder;
use crate::nbt_value::{self, bytes_from_i8};
use crate::tile_entity::TileEntityRecord;
use log::warn;
use quartz_nbt::{NbtCompound, NbtTag};

pub struct SpongeDecoder;

impl FormatDecoder for SpongeDecoder {
    fn name(&self) -> &'static str {
        "sponge"
    }

    fn decode(&self, root: &NbtCompound) -> Result<Option<Clipboard>> {
        match parse_document(root)? {
            Some(document) => document.to_clipboard().map(Some),
            None => Ok(None),
        }
    }
}

/// Reads the tag tree into a [`VoxelDocument`] without expanding it.
/// `Ok(None)` means the tree does not have this format's shape.
pub fn parse_document(root: &NbtCompound) -> Result<Option<VoxelDocument>> {
    let version = nbt_value::get_int(root, "Version").unwrap_or(1);
    if !(1..=2).contains(&version) {
        return Ok(None);
    }
    let (Some(width), Some(height), Some(length)) = (
        nbt_value::get_dimension(root, "Width"),
        nbt_value::get_dimension(root, "Height"),
        nbt_value::get_dimension(root, "Length"),
    ) else {
        return Ok(None);
    };
    let (Some(palette), Some(block_data)) = (
        nbt_value::get_compound(root, "Palette"),
        nbt_value::get_byte_array(root, "BlockData"),
    ) else {
        return Ok(None);
    };

    let block_palette = dense_palette(palette, "Palette")?;
    if let Some(max) = nbt_value::get_int(root, "PaletteMax") {
        if max as usize != block_palette.len() {
            warn!(
                "PaletteMax is {} but the palette has {} entries",
                max,
                block_palette.len()
            );
        }
    }

    let biome_palette = match nbt_value::get_compound(root, "BiomePalette") {
        Some(compound) => dense_palette(compound, "BiomePalette")?,
        None => Vec::new(),
    };
    let biome_data = nbt_value::get_byte_array(root, "BiomeData")
        .map(bytes_from_i8)
        .unwrap_or_default();

    let tile_list = nbt_value::get_list(root, "BlockEntities")
        .or_else(|| nbt_value::get_list(root, "TileEntities"));
    let mut tile_entities = Vec::new();
    if let Some(list) = tile_list {
        for tag in list.iter() {
            if let NbtTag::Compound(compound) = tag {
                tile_entities.push(TileEntityRecord::from_nbt(compound)?);
            }
        }
    }

    let offset = match nbt_value::get_tag(root, "Offset") {
        Some(NbtTag::IntArray(offset)) if offset.len() == 3 => [offset[0], offset[1], offset[2]],
        _ => [0; 3],
    };
    let metadata_offset = match nbt_value::get_compound(root, "Metadata") {
        Some(metadata) => [
            nbt_value::get_int(metadata, "WEOffsetX").unwrap_or(0),
            nbt_value::get_int(metadata, "WEOffsetY").unwrap_or(0),
            nbt_value::get_int(metadata, "WEOffsetZ").unwrap_or(0),
        ],
        None => [0; 3],
    };

    Ok(Some(VoxelDocument {
        version,
        data_version: nbt_value::get_int(root, "DataVersion").unwrap_or(0),
        metadata_offset,
        width: nbt_value::checked_dimension(width, "Width")?,
        height: nbt_value::checked_dimension(height, "Height")?,
        length: nbt_value::checked_dimension(length, "Length")?,
        offset,
        block_palette,
        block_data: bytes_from_i8(block_data),
        biome_palette,
        biome_data,
        tile_entities,
    }))
}

/// Turns a `key -> code` compound into a list indexed by code. Codes must be
/// exactly `0..len` with no repeats.
fn dense_palette(compound: &NbtCompound, field: &str) -> Result<Vec<String>> {
    let mut entries: Vec<Option<String>> = vec![None; compound.inner().len()];
    for (key, tag) in compound.inner() {
        let code = match tag {
            NbtTag::Int(code) => *code,
            _ => {
                return Err(SchematicError::CorruptDocument(format!(
                    "{} entry '{}' is not an int",
                    field, key
                )))
            }
        };
        let slot = usize::try_from(code)
            .ok()
            .and_then(|code| entries.get_mut(code))
            .ok_or_else(|| {
                SchematicError::CorruptDocument(format!(
                    "{} code {} for '{}' is outside 0..{}",
                    field,
                    code,
                    key,
                    compound.inner().len()
                ))
            })?;
        if slot.replace(key.clone()).is_some() {
            return Err(SchematicError::CorruptDocument(format!(
                "{} code {} is used twice",
                field, code
            )));
        }
    }
    Ok(entries.into_iter().flatten().collect())
}
