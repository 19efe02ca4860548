use crate::error::{Result, SchematicError};
use crate::nbt_value::{self, NbtMap, NbtValue};
use quartz_nbt::{NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};

/// Extra per-voxel data (chest contents, sign text, ...) captured with a
/// schematic. `pos` is relative to the document origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileEntityRecord {
    pub id: String,
    pub pos: (i32, i32, i32),
    pub extra: NbtMap,
}

impl TileEntityRecord {
    pub fn new(id: impl Into<String>, pos: (i32, i32, i32)) -> Self {
        TileEntityRecord {
            id: id.into(),
            pos,
            extra: NbtMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: NbtValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Builds a record from live world metadata. The world's own absolute
    /// `x`/`y`/`z` and lowercase `id` keys are dropped; the id falls back to
    /// `block_name` when the metadata carries none.
    pub fn from_metadata(metadata: &NbtMap, block_name: &str, pos: (i32, i32, i32)) -> Self {
        let id = metadata
            .get("id")
            .and_then(NbtValue::as_str)
            .unwrap_or(block_name)
            .to_string();
        let extra = metadata
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "x" | "y" | "z" | "id" | "Id" | "Pos"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        TileEntityRecord { id, pos, extra }
    }

    /// Document form: the extra tags plus canonical `Id` and `Pos`.
    pub fn to_nbt(&self) -> NbtCompound {
        let mut compound = nbt_value::map_to_compound(&self.extra);
        compound.insert("Id", NbtTag::String(self.id.clone()));
        compound.insert(
            "Pos",
            NbtTag::IntArray(vec![self.pos.0, self.pos.1, self.pos.2]),
        );
        compound
    }

    /// Reads the document form written by [`TileEntityRecord::to_nbt`].
    /// Older writers used a lowercase `id`, which is accepted too.
    pub fn from_nbt(compound: &NbtCompound) -> Result<Self> {
        let id = nbt_value::get_str(compound, "Id")
            .or_else(|| nbt_value::get_str(compound, "id"))
            .ok_or_else(|| SchematicError::CorruptDocument("block entity without Id".into()))?
            .to_string();
        let pos = match nbt_value::get_tag(compound, "Pos") {
            Some(NbtTag::IntArray(pos)) if pos.len() == 3 => (pos[0], pos[1], pos[2]),
            _ => {
                return Err(SchematicError::CorruptDocument(format!(
                    "block entity '{}' has no valid Pos",
                    id
                )))
            }
        };
        let extra = nbt_value::compound_to_map(compound)
            .into_iter()
            .filter(|(key, _)| !matches!(key.as_str(), "Id" | "id" | "Pos"))
            .collect();
        Ok(TileEntityRecord { id, pos, extra })
    }

    /// Reads the legacy form where the position lives in `x`/`y`/`z`.
    pub fn from_legacy_nbt(compound: &NbtCompound) -> Result<Self> {
        let map = nbt_value::compound_to_map(compound);
        let coord = |key: &str| {
            map.get(key).and_then(NbtValue::as_int).ok_or_else(|| {
                SchematicError::CorruptDocument(format!("legacy tile entity without '{}'", key))
            })
        };
        let pos = (coord("x")?, coord("y")?, coord("z")?);
        let id = map
            .get("id")
            .and_then(NbtValue::as_str)
            .ok_or_else(|| SchematicError::CorruptDocument("legacy tile entity without id".into()))?;
        Ok(TileEntityRecord::from_metadata(&map, id, pos))
    }
}
