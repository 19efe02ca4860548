//! Legacy MCEdit/Alpha schematics: numeric block ids in `Blocks` (with an
//! optional `AddBlocks` nibble array for ids above 255), 4-bit `Data`
//! values, and tile entities that carry their own `x`/`y`/`z`.

use crate::block_state::BlockState;
use crate::clipboard::Clipboard;
use crate::error::{Result, SchematicError};
use crate::formats::manager::FormatDecoder;
use crate::nbt_value;
use crate::tile_entity::TileEntityRecord;
use log::{debug, warn};
use quartz_nbt::{NbtCompound, NbtTag};
use rustc_hash::FxHashMap;

pub struct McEditDecoder;

impl FormatDecoder for McEditDecoder {
    fn name(&self) -> &'static str {
        "mcedit"
    }

    fn decode(&self, root: &NbtCompound) -> Result<Option<Clipboard>> {
        if let Some(materials) = nbt_value::get_str(root, "Materials") {
            if materials != "Alpha" {
                debug!("unsupported legacy materials '{}'", materials);
                return Ok(None);
            }
        }
        let (Some(width), Some(height), Some(length)) = (
            nbt_value::get_dimension(root, "Width"),
            nbt_value::get_dimension(root, "Height"),
            nbt_value::get_dimension(root, "Length"),
        ) else {
            return Ok(None);
        };
        let (Some(blocks), Some(data)) = (
            nbt_value::get_byte_array(root, "Blocks"),
            nbt_value::get_byte_array(root, "Data"),
        ) else {
            return Ok(None);
        };

        let width = nbt_value::checked_dimension(width, "Width")?;
        let height = nbt_value::checked_dimension(height, "Height")?;
        let length = nbt_value::checked_dimension(length, "Length")?;
        let volume = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(length as usize));
        if volume != Some(blocks.len()) || data.len() != blocks.len() {
            return Err(SchematicError::CorruptDocument(format!(
                "legacy schematic declares {}x{}x{} but has {} block ids and {} data values",
                width,
                height,
                length,
                blocks.len(),
                data.len()
            )));
        }
        let volume = blocks.len();
        let (width, height, length) = (width as i32, height as i32, length as i32);
        let add_blocks = nbt_value::get_byte_array(root, "AddBlocks").unwrap_or(&[]);

        let mut clipboard = Clipboard::new(width, height, length);
        let mut states: FxHashMap<(u16, u8), BlockState> = FxHashMap::default();
        for index in 0..volume {
            let id = block_id(blocks, add_blocks, index);
            let meta = (data[index] as u8) & 0x0F;
            if id == 0 {
                continue;
            }
            let state = states
                .entry((id, meta))
                .or_insert_with(|| legacy_block(id, meta));
            let (x, y, z) = clipboard.index_to_coords(index);
            clipboard.set_block(x, y, z, state);
        }

        if let Some(biomes) = nbt_value::get_byte_array(root, "Biomes") {
            if biomes.len() == width as usize * length as usize {
                for z in 0..length {
                    for x in 0..width {
                        let id = biomes[(x + z * width) as usize] as u8;
                        clipboard.set_biome(x, z, legacy_biome(id));
                    }
                }
            } else {
                warn!(
                    "ignoring legacy Biomes array of {} entries for a {}x{} footprint",
                    biomes.len(),
                    width,
                    length
                );
            }
        }

        if let Some(list) = nbt_value::get_list(root, "TileEntities") {
            for tag in list.iter() {
                let NbtTag::Compound(compound) = tag else {
                    continue;
                };
                let tile = TileEntityRecord::from_legacy_nbt(compound)?;
                let (x, y, z) = tile.pos;
                if clipboard.contains(x, y, z) {
                    clipboard.add_tile_entity(tile);
                } else {
                    warn!("dropping legacy tile entity '{}' outside the schematic at {:?}", tile.id, tile.pos);
                }
            }
        }

        Ok(Some(clipboard))
    }
}

fn block_id(blocks: &[i8], add_blocks: &[i8], index: usize) -> u16 {
    let base = blocks[index] as u8 as u16;
    match add_blocks.get(index >> 1) {
        None => base,
        Some(&add) => {
            let add = add as u8 as u16;
            if index & 1 == 0 {
                ((add & 0x0F) << 8) + base
            } else {
                ((add & 0xF0) << 4) + base
            }
        }
    }
}

/// Maps the common pre-flattening ids; anything else keeps its number.
fn legacy_block(id: u16, meta: u8) -> BlockState {
    let name = match id {
        1 => "minecraft:stone",
        2 => "minecraft:grass_block",
        3 => "minecraft:dirt",
        4 => "minecraft:cobblestone",
        5 => "minecraft:oak_planks",
        7 => "minecraft:bedrock",
        8 | 9 => "minecraft:water",
        10 | 11 => "minecraft:lava",
        12 => "minecraft:sand",
        13 => "minecraft:gravel",
        14 => "minecraft:gold_ore",
        15 => "minecraft:iron_ore",
        16 => "minecraft:coal_ore",
        17 => "minecraft:oak_log",
        18 => "minecraft:oak_leaves",
        20 => "minecraft:glass",
        24 => "minecraft:sandstone",
        35 => "minecraft:white_wool",
        41 => "minecraft:gold_block",
        42 => "minecraft:iron_block",
        45 => "minecraft:bricks",
        49 => "minecraft:obsidian",
        54 => "minecraft:chest",
        57 => "minecraft:diamond_block",
        80 => "minecraft:snow_block",
        82 => "minecraft:clay",
        87 => "minecraft:netherrack",
        89 => "minecraft:glowstone",
        98 => "minecraft:stone_bricks",
        _ => {
            return BlockState::new(format!("minecraft:legacy_{}", id))
                .with_property("data", meta.to_string())
        }
    };
    BlockState::new(name)
}

fn legacy_biome(id: u8) -> &'static str {
    match id {
        0 => "minecraft:ocean",
        1 => "minecraft:plains",
        2 => "minecraft:desert",
        3 => "minecraft:windswept_hills",
        4 => "minecraft:forest",
        5 => "minecraft:taiga",
        6 => "minecraft:swamp",
        7 => "minecraft:river",
        8 => "minecraft:nether_wastes",
        9 => "minecraft:the_end",
        12 => "minecraft:snowy_plains",
        14 => "minecraft:mushroom_fields",
        21 => "minecraft:jungle",
        24 => "minecraft:deep_ocean",
        27 => "minecraft:birch_forest",
        35 => "minecraft:savanna",
        37 => "minecraft:badlands",
        _ => "minecraft:plains",
    }
}
