use crate::block_state::BlockState;
use crate::tile_entity::TileEntityRecord;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// Decoded, dense form of a schematic, ready to paste.
///
/// Voxels are stored as palette indices in scan order: X varies fastest,
/// then Z, then Y. Biomes, when present, hold one entry per (x, z) column.
#[derive(Debug, Clone)]
pub struct Clipboard {
    width: i32,
    height: i32,
    length: i32,
    palette: Vec<BlockState>,
    palette_index: FxHashMap<BlockState, usize>,
    blocks: Vec<usize>,
    biome_palette: Vec<SmolStr>,
    biomes: Option<Vec<usize>>,
    tile_entities: Vec<TileEntityRecord>,
}

impl Clipboard {
    /// An all-air clipboard of the given size. Each dimension is clamped to
    /// `0..=u16::MAX`, the range a document can describe.
    pub fn new(width: i32, height: i32, length: i32) -> Self {
        let clamp = |d: i32| d.clamp(0, u16::MAX as i32);
        let (width, height, length) = (clamp(width), clamp(height), clamp(length));
        let volume = width as usize * height as usize * length as usize;
        let air = BlockState::air();
        let mut palette_index = FxHashMap::default();
        palette_index.insert(air.clone(), 0);
        Clipboard {
            width,
            height,
            length,
            palette: vec![air],
            palette_index,
            blocks: vec![0; volume],
            biome_palette: Vec::new(),
            biomes: None,
            tile_entities: Vec::new(),
        }
    }

    /// Builds a clipboard from already-decoded parts. `blocks` must hold
    /// `width * height * length` valid palette indices.
    pub(crate) fn from_parts(
        (width, height, length): (i32, i32, i32),
        palette: Vec<BlockState>,
        blocks: Vec<usize>,
        biome_palette: Vec<SmolStr>,
        biomes: Option<Vec<usize>>,
        tile_entities: Vec<TileEntityRecord>,
    ) -> Self {
        let mut palette_index = FxHashMap::default();
        for (index, block) in palette.iter().enumerate() {
            palette_index.entry(block.clone()).or_insert(index);
        }
        Clipboard {
            width,
            height,
            length,
            palette,
            palette_index,
            blocks,
            biome_palette,
            biomes,
            tile_entities,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn length(&self) -> i32 {
        self.length
    }

    pub fn dimensions(&self) -> (i32, i32, i32) {
        (self.width, self.height, self.length)
    }

    pub fn volume(&self) -> usize {
        self.blocks.len()
    }

    #[inline(always)]
    pub fn coords_to_index(&self, x: i32, y: i32, z: i32) -> usize {
        let (w, l) = (self.width as usize, self.length as usize);
        x as usize + z as usize * w + y as usize * w * l
    }

    #[inline(always)]
    pub fn index_to_coords(&self, index: usize) -> (i32, i32, i32) {
        let w = self.width as usize;
        let wl = w * self.length as usize;
        let x = (index % w) as i32;
        let y = (index / wl) as i32;
        let z = ((index / w) % self.length as usize) as i32;
        (x, y, z)
    }

    #[inline(always)]
    pub fn contains(&self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && y >= 0 && z >= 0 && x < self.width && y < self.height && z < self.length
    }

    pub fn block(&self, x: i32, y: i32, z: i32) -> Option<&BlockState> {
        if !self.contains(x, y, z) {
            return None;
        }
        self.palette.get(self.blocks[self.coords_to_index(x, y, z)])
    }

    pub fn set_block(&mut self, x: i32, y: i32, z: i32, block: &BlockState) -> bool {
        if !self.contains(x, y, z) {
            return false;
        }
        let palette_index = match self.palette_index.get(block) {
            Some(&index) => index,
            None => {
                let index = self.palette.len();
                self.palette.push(block.clone());
                self.palette_index.insert(block.clone(), index);
                index
            }
        };
        let index = self.coords_to_index(x, y, z);
        self.blocks[index] = palette_index;
        true
    }

    pub fn biome(&self, x: i32, z: i32) -> Option<&str> {
        if !self.contains(x, 0, z) {
            return None;
        }
        let biomes = self.biomes.as_ref()?;
        let index = biomes[(x + z * self.width) as usize];
        self.biome_palette.get(index).map(|b| b.as_str())
    }

    pub fn has_biomes(&self) -> bool {
        self.biomes.is_some()
    }

    pub fn set_biome(&mut self, x: i32, z: i32, biome: &str) -> bool {
        if !self.contains(x, 0, z) {
            return false;
        }
        let code = match self.biome_palette.iter().position(|b| b == biome) {
            Some(code) => code,
            None => {
                self.biome_palette.push(SmolStr::new(biome));
                self.biome_palette.len() - 1
            }
        };
        let columns = (self.width * self.length) as usize;
        let index = (x + z * self.width) as usize;
        self.biomes.get_or_insert_with(|| vec![code; columns])[index] = code;
        true
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    pub fn tile_entities(&self) -> &[TileEntityRecord] {
        &self.tile_entities
    }

    pub fn add_tile_entity(&mut self, tile: TileEntityRecord) {
        self.tile_entities.push(tile);
    }

    /// Number of voxels that are not air.
    pub fn count_non_air(&self) -> usize {
        self.blocks
            .iter()
            .filter(|&&index| !self.palette[index].is_air())
            .count()
    }

    /// Iterates every voxel in scan order as `(x, y, z, state)`.
    pub fn iter_blocks(&self) -> impl Iterator<Item = (i32, i32, i32, &BlockState)> + '_ {
        self.blocks.iter().enumerate().map(move |(index, &palette_index)| {
            let (x, y, z) = self.index_to_coords(index);
            (x, y, z, &self.palette[palette_index])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_layout_matches_scan_order() {
        let clipboard = Clipboard::new(3, 2, 4);
        assert_eq!(clipboard.coords_to_index(1, 0, 0), 1);
        assert_eq!(clipboard.coords_to_index(0, 0, 1), 3);
        assert_eq!(clipboard.coords_to_index(0, 1, 0), 12);
        for index in 0..clipboard.volume() {
            let (x, y, z) = clipboard.index_to_coords(index);
            assert_eq!(clipboard.coords_to_index(x, y, z), index);
        }
    }

    #[test]
    fn test_dimensions_are_clamped() {
        let clipboard = Clipboard::new(-4, 70_000, 1);
        assert_eq!(clipboard.dimensions(), (0, 65535, 1));
        assert_eq!(clipboard.volume(), 0);
    }

    #[test]
    fn test_set_and_get_block() {
        let mut clipboard = Clipboard::new(2, 2, 2);
        let stone = BlockState::new("minecraft:stone");

        assert!(clipboard.set_block(0, 0, 0, &stone));
        assert_eq!(clipboard.block(0, 0, 0), Some(&stone));
        assert_eq!(clipboard.block(1, 1, 1), Some(&BlockState::air()));
        assert_eq!(clipboard.block(2, 2, 2), None);
        assert!(!clipboard.set_block(-1, 0, 0, &stone));
        assert_eq!(clipboard.count_non_air(), 1);
    }

    #[test]
    fn test_biomes() {
        let mut clipboard = Clipboard::new(2, 1, 2);
        assert_eq!(clipboard.biome(0, 0), None);
        clipboard.set_biome(1, 1, "minecraft:desert");
        assert_eq!(clipboard.biome(1, 1), Some("minecraft:desert"));
        assert_eq!(clipboard.biome(0, 0), Some("minecraft:desert"));
        clipboard.set_biome(0, 0, "minecraft:plains");
        assert_eq!(clipboard.biome(0, 0), Some("minecraft:plains"));
        assert_eq!(clipboard.biome(1, 1), Some("minecraft:desert"));
    }
}
