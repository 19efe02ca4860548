use crate::block_state::BlockState;
use crate::bounding_box::CuboidRegion;
use crate::clipboard::Clipboard;
use crate::error::{Result, SchematicError};
use crate::nbt_value::bytes_to_i8;
use crate::palette::PaletteBuilder;
use crate::scanner::ScanOutput;
use crate::tile_entity::TileEntityRecord;
use crate::varint::{write_varint, VarIntReader};
use flate2::write::GzEncoder;
use flate2::Compression;
use quartz_nbt::io::Flavor;
use quartz_nbt::{NbtCompound, NbtList, NbtTag};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use std::io::Write;

/// Format revision written into `Version`.
pub const SCHEMATIC_VERSION: i32 = 2;

/// Name of the root compound.
pub const ROOT_NAME: &str = "Schematic";

/// A captured region set in document form.
///
/// `block_data` holds exactly `width * height * length` varint palette codes
/// in scan order (X fastest, then Z, then Y); `biome_data` holds one code per
/// (x, z) column. Palettes are indexed by code.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelDocument {
    pub version: i32,
    pub data_version: i32,
    pub metadata_offset: [i32; 3],
    pub width: u16,
    pub height: u16,
    pub length: u16,
    pub offset: [i32; 3],
    pub block_palette: Vec<String>,
    pub block_data: Vec<u8>,
    pub biome_palette: Vec<String>,
    pub biome_data: Vec<u8>,
    pub tile_entities: Vec<TileEntityRecord>,
}

impl VoxelDocument {
    /// Packages a finished scan. `data_version` is passed through untouched.
    pub fn assemble(scan: ScanOutput, data_version: i32) -> Result<Self> {
        let (width, height, length) = scan.bounds.dimensions();
        let max = u16::MAX as i32;
        if width > max || height > max || length > max {
            return Err(SchematicError::RegionTooLarge {
                width,
                height,
                length,
            });
        }

        let ScanOutput {
            regions,
            bounds,
            mut block_palette,
            block_data,
            biome_palette,
            biome_data,
            tile_entities,
            ..
        } = scan;

        let (block_data, biome_data) = if regions.len() == 1 {
            (block_data, biome_data)
        } else {
            relayout(
                &regions,
                &bounds,
                &mut block_palette,
                &block_data,
                &biome_data,
            )?
        };

        Ok(VoxelDocument {
            version: SCHEMATIC_VERSION,
            data_version,
            metadata_offset: [0; 3],
            width: width as u16,
            height: height as u16,
            length: length as u16,
            offset: [0; 3],
            block_palette: block_palette.into_keys(),
            block_data,
            biome_palette: biome_palette.into_keys(),
            biome_data,
            tile_entities,
        })
    }

    pub fn dimensions(&self) -> (i32, i32, i32) {
        (self.width as i32, self.height as i32, self.length as i32)
    }

    pub fn to_nbt(&self) -> NbtCompound {
        let mut root = NbtCompound::new();
        root.insert("Version", NbtTag::Int(self.version));
        root.insert("DataVersion", NbtTag::Int(self.data_version));

        let mut metadata = NbtCompound::new();
        metadata.insert("WEOffsetX", NbtTag::Int(self.metadata_offset[0]));
        metadata.insert("WEOffsetY", NbtTag::Int(self.metadata_offset[1]));
        metadata.insert("WEOffsetZ", NbtTag::Int(self.metadata_offset[2]));
        root.insert("Metadata", NbtTag::Compound(metadata));

        root.insert("Width", NbtTag::Short(self.width as i16));
        root.insert("Height", NbtTag::Short(self.height as i16));
        root.insert("Length", NbtTag::Short(self.length as i16));
        root.insert("Offset", NbtTag::IntArray(self.offset.to_vec()));

        root.insert("PaletteMax", NbtTag::Int(self.block_palette.len() as i32));
        root.insert("Palette", NbtTag::Compound(palette_to_nbt(&self.block_palette)));
        root.insert("BlockData", NbtTag::ByteArray(bytes_to_i8(&self.block_data)));

        let tile_entities = NbtList::from(
            self.tile_entities
                .iter()
                .map(|tile| NbtTag::Compound(tile.to_nbt()))
                .collect::<Vec<NbtTag>>(),
        );
        root.insert("BlockEntities", NbtTag::List(tile_entities));

        root.insert(
            "BiomePaletteMax",
            NbtTag::Int(self.biome_palette.len() as i32),
        );
        root.insert(
            "BiomePalette",
            NbtTag::Compound(palette_to_nbt(&self.biome_palette)),
        );
        root.insert("BiomeData", NbtTag::ByteArray(bytes_to_i8(&self.biome_data)));

        root
    }

    /// Writes the gzip-compressed tag tree.
    pub fn write_to<W: Write>(&self, writer: W, compression: Compression) -> Result<()> {
        let mut encoder = GzEncoder::new(writer, compression);
        quartz_nbt::io::write_nbt(
            &mut encoder,
            Some(ROOT_NAME),
            &self.to_nbt(),
            Flavor::Uncompressed,
        )?;
        encoder.finish()?;
        Ok(())
    }

    pub fn to_bytes(&self, compression: Compression) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes, compression)?;
        Ok(bytes)
    }

    /// Expands the palette-coded streams into a dense clipboard.
    pub fn to_clipboard(&self) -> Result<Clipboard> {
        let (width, height, length) = self.dimensions();
        let palette = self
            .block_palette
            .iter()
            .map(|key| key.parse::<BlockState>())
            .collect::<Result<Vec<_>>>()?;

        let volume = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(length as usize))
            .ok_or_else(|| {
                SchematicError::CorruptDocument(format!(
                    "{}x{}x{} does not fit in memory",
                    width, height, length
                ))
            })?;
        let blocks = decode_codes(&self.block_data, volume, palette.len(), "BlockData")?;

        let biomes = if self.biome_palette.is_empty() || self.biome_data.is_empty() {
            None
        } else {
            let columns = width as usize * length as usize;
            Some(decode_codes(
                &self.biome_data,
                columns,
                self.biome_palette.len(),
                "BiomeData",
            )?)
        };
        let biome_palette = self.biome_palette.iter().map(SmolStr::new).collect();

        for tile in &self.tile_entities {
            let (x, y, z) = tile.pos;
            if x < 0 || y < 0 || z < 0 || x >= width || y >= height || z >= length {
                return Err(SchematicError::CorruptDocument(format!(
                    "block entity '{}' at {:?} lies outside {}x{}x{}",
                    tile.id, tile.pos, width, height, length
                )));
            }
        }

        Ok(Clipboard::from_parts(
            (width, height, length),
            palette,
            blocks,
            biome_palette,
            biomes,
            self.tile_entities.clone(),
        ))
    }
}

fn palette_to_nbt(palette: &[String]) -> NbtCompound {
    let mut compound = NbtCompound::new();
    for (code, key) in palette.iter().enumerate() {
        compound.insert(key.clone(), NbtTag::Int(code as i32));
    }
    compound
}

/// Every code takes at least one byte, so a stream shorter than `count` is
/// truncated before anything is allocated for it.
fn decode_codes(data: &[u8], count: usize, palette_len: usize, field: &str) -> Result<Vec<usize>> {
    if data.len() < count {
        return Err(SchematicError::TruncatedVarInt { offset: data.len() });
    }
    let mut reader = VarIntReader::new(data);
    let mut codes = Vec::with_capacity(count);
    for _ in 0..count {
        let code = reader.next_value()? as usize;
        if code >= palette_len {
            return Err(SchematicError::CorruptDocument(format!(
                "{} references code {} but the palette has {} entries",
                field, code, palette_len
            )));
        }
        codes.push(code);
    }
    if !reader.is_exhausted() {
        return Err(SchematicError::CorruptDocument(format!(
            "{} has {} trailing bytes after {} entries",
            field,
            data.len() - reader.position(),
            count
        )));
    }
    Ok(codes)
}

/// Re-lays streams produced region by region into bounding-box order.
/// Voxels no region covers become air; uncovered columns reuse biome code 0.
fn relayout(
    regions: &[CuboidRegion],
    bounds: &CuboidRegion,
    block_palette: &mut PaletteBuilder,
    block_data: &[u8],
    biome_data: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let (width, height, length) = bounds.dimensions();
    let origin = bounds.min();
    let (w, l) = (width as usize, length as usize);
    let mut blocks: Vec<Option<u32>> = vec![None; w * height as usize * l];
    let mut columns: Vec<Option<u32>> = vec![None; w * l];

    let mut block_reader = VarIntReader::new(block_data);
    let mut biome_reader = VarIntReader::new(biome_data);
    let mut sampled = FxHashSet::default();

    for region in regions {
        let (min_x, min_y, min_z) = region.min();
        let (max_x, max_y, max_z) = region.max();
        for y in min_y..=max_y {
            for z in min_z..=max_z {
                for x in min_x..=max_x {
                    let (rx, ry, rz) = (
                        (x - origin.0) as usize,
                        (y - origin.1) as usize,
                        (z - origin.2) as usize,
                    );
                    blocks[rx + rz * w + ry * w * l] = Some(block_reader.next_value()?);
                    if y == min_y && sampled.insert((x, z)) {
                        columns[rx + rz * w] = Some(biome_reader.next_value()?);
                    }
                }
            }
        }
    }

    let air = if blocks.iter().any(Option::is_none) {
        block_palette.intern_index(&BlockState::air().key())
    } else {
        0
    };

    let mut block_out = Vec::with_capacity(blocks.len());
    for code in blocks {
        write_varint(&mut block_out, code.unwrap_or(air));
    }
    let mut biome_out = Vec::with_capacity(columns.len());
    for code in columns {
        write_varint(&mut biome_out, code.unwrap_or(0));
    }
    Ok((block_out, biome_out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::CooperativeScanner;
    use crate::varint::decode_all;
    use crate::world::MemoryWorld;

    fn scan(world: &MemoryWorld, regions: &[CuboidRegion]) -> ScanOutput {
        let mut scanner = CooperativeScanner::new(regions).unwrap();
        scanner.run_to_end(world).unwrap();
        scanner.into_output().unwrap()
    }

    #[test]
    fn test_header_fields() {
        let world = MemoryWorld::new();
        let output = scan(&world, &[CuboidRegion::new((10, 64, 10), (12, 65, 13))]);
        let document = VoxelDocument::assemble(output, 3465).unwrap();
        let root = document.to_nbt();

        assert_eq!(root.get::<_, i32>("Version").unwrap(), 2);
        assert_eq!(root.get::<_, i32>("DataVersion").unwrap(), 3465);
        assert_eq!(root.get::<_, i16>("Width").unwrap(), 3);
        assert_eq!(root.get::<_, i16>("Height").unwrap(), 2);
        assert_eq!(root.get::<_, i16>("Length").unwrap(), 4);
        assert_eq!(root.get::<_, &[i32]>("Offset").unwrap(), &[0, 0, 0]);
        assert_eq!(root.get::<_, i32>("PaletteMax").unwrap(), 1);
        assert_eq!(root.get::<_, i32>("BiomePaletteMax").unwrap(), 1);
        let metadata = root.get::<_, &NbtCompound>("Metadata").unwrap();
        assert_eq!(metadata.get::<_, i32>("WEOffsetY").unwrap(), 0);
        assert_eq!(document.block_data.len(), 24);
        assert_eq!(document.biome_data.len(), 12);
    }

    #[test]
    fn test_disjoint_regions_fill_gaps_with_air() {
        let mut world = MemoryWorld::new();
        let stone = BlockState::new("minecraft:stone");
        world.put_block(0, 0, 0, stone.clone());
        world.put_block(3, 0, 0, stone.clone());

        let output = scan(
            &world,
            &[
                CuboidRegion::new((3, 0, 0), (3, 0, 0)),
                CuboidRegion::new((0, 0, 0), (0, 0, 0)),
            ],
        );
        let document = VoxelDocument::assemble(output, 0).unwrap();

        assert_eq!(document.dimensions(), (4, 1, 1));
        assert_eq!(document.block_palette, vec!["minecraft:stone", "minecraft:air"]);
        assert_eq!(decode_all(&document.block_data).unwrap(), vec![0, 1, 1, 0]);
        assert_eq!(decode_all(&document.biome_data).unwrap(), vec![0, 0, 0, 0]);

        let clipboard = document.to_clipboard().unwrap();
        assert_eq!(clipboard.block(0, 0, 0), Some(&stone));
        assert_eq!(clipboard.block(1, 0, 0), Some(&BlockState::air()));
        assert_eq!(clipboard.block(3, 0, 0), Some(&stone));
    }

    #[test]
    fn test_out_of_range_code_is_corrupt() {
        let world = MemoryWorld::new();
        let output = scan(&world, &[CuboidRegion::new((0, 0, 0), (1, 0, 0))]);
        let mut document = VoxelDocument::assemble(output, 0).unwrap();
        document.block_data = vec![0, 7];
        assert!(matches!(
            document.to_clipboard(),
            Err(SchematicError::CorruptDocument(_))
        ));
        document.block_data = vec![0];
        assert!(matches!(
            document.to_clipboard(),
            Err(SchematicError::TruncatedVarInt { .. })
        ));
    }

    #[test]
    fn test_short_stream_fails_before_allocating() {
        assert!(matches!(
            decode_codes(&[0], usize::MAX / 2, 1, "BlockData"),
            Err(SchematicError::TruncatedVarInt { offset: 1 })
        ));
    }
}
