//! Contracts for the live world the scanner reads from and the mutation
//! queue the paste engine writes through, plus an in-memory world that
//! implements both.

use crate::block_state::BlockState;
use crate::error::Result;
use crate::nbt_value::NbtMap;
use crate::tile_entity::TileEntityRecord;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// What the world holds at one voxel.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelSample {
    pub state: BlockState,
    /// Tile-entity data as the world stores it, absolute `x`/`y`/`z` included.
    pub metadata: Option<NbtMap>,
}

impl VoxelSample {
    pub fn plain(state: BlockState) -> Self {
        VoxelSample {
            state,
            metadata: None,
        }
    }
}

/// Read access to a world. Implementations are only called from the tick loop.
pub trait WorldReader {
    fn block_at(&self, x: i32, y: i32, z: i32) -> Result<VoxelSample>;
    fn biome_at(&self, x: i32, z: i32) -> Result<String>;
    /// Y of the highest non-air voxel in the column.
    fn highest_block_y(&self, x: i32, z: i32) -> Result<i32>;
}

pub type ProgressSubscriber = Box<dyn FnMut(f32) + Send>;
pub type CompletionTask = Box<dyn FnOnce(bool) + Send>;

/// Batched world writes. Calls before [`MutationQueue::enqueue`] only stage
/// work; `enqueue` hands the batch over and returns immediately.
pub trait MutationQueue {
    fn set_block(&mut self, x: i32, y: i32, z: i32, state: &BlockState) -> bool;
    fn set_tile(&mut self, x: i32, y: i32, z: i32, tile: &TileEntityRecord) -> bool;
    fn set_biome(&mut self, x: i32, y: i32, z: i32, biome: &str) -> bool;
    fn add_progress_subscriber(&mut self, subscriber: ProgressSubscriber);
    fn set_complete_task(&mut self, task: CompletionTask);
    fn enqueue(&mut self) -> bool;
}

#[derive(Debug, Clone)]
enum Mutation {
    Block((i32, i32, i32), BlockState),
    Tile((i32, i32, i32), TileEntityRecord),
    Biome((i32, i32), SmolStr),
}

/// Sparse world kept in hash maps. Unset voxels read as air and unset
/// columns read as the default biome. As a [`MutationQueue`] it stages
/// writes and applies them all when the batch is enqueued.
#[derive(Default)]
pub struct MemoryWorld {
    blocks: FxHashMap<(i32, i32, i32), BlockState>,
    tiles: FxHashMap<(i32, i32, i32), NbtMap>,
    biomes: FxHashMap<(i32, i32), SmolStr>,
    default_biome: SmolStr,
    pending: Vec<Mutation>,
    subscribers: Vec<ProgressSubscriber>,
    complete_task: Option<CompletionTask>,
    block_sets: usize,
    biome_sets: usize,
    batches: usize,
}

impl MemoryWorld {
    pub fn new() -> Self {
        MemoryWorld {
            default_biome: SmolStr::new("minecraft:plains"),
            ..Default::default()
        }
    }

    pub fn with_default_biome(mut self, biome: &str) -> Self {
        self.default_biome = SmolStr::new(biome);
        self
    }

    pub fn put_block(&mut self, x: i32, y: i32, z: i32, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&(x, y, z));
        } else {
            self.blocks.insert((x, y, z), state);
        }
    }

    /// Attaches tile-entity data. Absolute coordinates are stamped into the
    /// data the way a real world stores them.
    pub fn put_tile(&mut self, x: i32, y: i32, z: i32, mut metadata: NbtMap) {
        use crate::nbt_value::NbtValue;
        metadata.insert("x".into(), NbtValue::Int(x));
        metadata.insert("y".into(), NbtValue::Int(y));
        metadata.insert("z".into(), NbtValue::Int(z));
        self.tiles.insert((x, y, z), metadata);
    }

    pub fn put_biome(&mut self, x: i32, z: i32, biome: &str) {
        self.biomes.insert((x, z), SmolStr::new(biome));
    }

    pub fn block(&self, x: i32, y: i32, z: i32) -> BlockState {
        self.blocks
            .get(&(x, y, z))
            .cloned()
            .unwrap_or_else(BlockState::air)
    }

    pub fn tile(&self, x: i32, y: i32, z: i32) -> Option<&NbtMap> {
        self.tiles.get(&(x, y, z))
    }

    pub fn biome(&self, x: i32, z: i32) -> &str {
        self.biomes
            .get(&(x, z))
            .unwrap_or(&self.default_biome)
            .as_str()
    }

    /// Number of `set_block` calls received so far, applied or not.
    pub fn block_set_calls(&self) -> usize {
        self.block_sets
    }

    pub fn biome_set_calls(&self) -> usize {
        self.biome_sets
    }

    pub fn pending_mutations(&self) -> usize {
        self.pending.len()
    }

    pub fn enqueued_batches(&self) -> usize {
        self.batches
    }

    pub fn non_air_count(&self) -> usize {
        self.blocks.len()
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Block((x, y, z), state) => {
                self.tiles.remove(&(x, y, z));
                self.put_block(x, y, z, state);
            }
            Mutation::Tile((x, y, z), tile) => {
                let mut metadata = tile.extra;
                metadata.insert("id".into(), crate::nbt_value::NbtValue::String(tile.id));
                self.put_tile(x, y, z, metadata);
            }
            Mutation::Biome((x, z), biome) => {
                self.biomes.insert((x, z), biome);
            }
        }
    }
}

impl WorldReader for MemoryWorld {
    fn block_at(&self, x: i32, y: i32, z: i32) -> Result<VoxelSample> {
        Ok(VoxelSample {
            state: self.block(x, y, z),
            metadata: self.tiles.get(&(x, y, z)).cloned(),
        })
    }

    fn biome_at(&self, x: i32, z: i32) -> Result<String> {
        Ok(self.biome(x, z).to_string())
    }

    fn highest_block_y(&self, x: i32, z: i32) -> Result<i32> {
        Ok(self
            .blocks
            .keys()
            .filter(|(bx, _, bz)| *bx == x && *bz == z)
            .map(|(_, y, _)| *y)
            .max()
            .unwrap_or(0))
    }
}

impl MutationQueue for MemoryWorld {
    fn set_block(&mut self, x: i32, y: i32, z: i32, state: &BlockState) -> bool {
        self.block_sets += 1;
        self.pending.push(Mutation::Block((x, y, z), state.clone()));
        true
    }

    fn set_tile(&mut self, x: i32, y: i32, z: i32, tile: &TileEntityRecord) -> bool {
        self.pending.push(Mutation::Tile((x, y, z), tile.clone()));
        true
    }

    fn set_biome(&mut self, x: i32, _y: i32, z: i32, biome: &str) -> bool {
        self.biome_sets += 1;
        self.pending.push(Mutation::Biome((x, z), SmolStr::new(biome)));
        true
    }

    fn add_progress_subscriber(&mut self, subscriber: ProgressSubscriber) {
        self.subscribers.push(subscriber);
    }

    fn set_complete_task(&mut self, task: CompletionTask) {
        self.complete_task = Some(task);
    }

    fn enqueue(&mut self) -> bool {
        self.batches += 1;
        let pending = std::mem::take(&mut self.pending);
        let total = pending.len().max(1) as f32;
        let mut subscribers = std::mem::take(&mut self.subscribers);
        for (done, mutation) in pending.into_iter().enumerate() {
            self.apply(mutation);
            if (done + 1) % 4096 == 0 {
                for subscriber in &mut subscribers {
                    subscriber((done + 1) as f32 / total);
                }
            }
        }
        for subscriber in &mut subscribers {
            subscriber(1.0);
        }
        if let Some(task) = self.complete_task.take() {
            task(true);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_voxels_read_as_air_and_default_biome() {
        let world = MemoryWorld::new();
        assert_eq!(world.block_at(3, 4, 5).unwrap().state, BlockState::air());
        assert_eq!(world.biome_at(3, 5).unwrap(), "minecraft:plains");
        assert_eq!(world.highest_block_y(3, 5).unwrap(), 0);
    }

    #[test]
    fn test_writes_apply_on_enqueue() {
        let mut world = MemoryWorld::new();
        let stone = BlockState::new("minecraft:stone");
        world.set_block(0, 10, 0, &stone);
        world.set_biome(0, 10, 0, "minecraft:desert");
        assert_eq!(world.block(0, 10, 0), BlockState::air());
        assert_eq!(world.pending_mutations(), 2);

        let (tx, rx) = std::sync::mpsc::channel();
        world.set_complete_task(Box::new(move |ok| tx.send(ok).unwrap()));
        assert!(world.enqueue());

        assert!(rx.recv().unwrap());
        assert_eq!(world.block(0, 10, 0), stone);
        assert_eq!(world.biome(0, 0), "minecraft:desert");
        assert_eq!(world.highest_block_y(0, 0).unwrap(), 10);
        assert_eq!(world.pending_mutations(), 0);
    }
}
