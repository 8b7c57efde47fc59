use crate::block::{BlockMaterial, Facing};
use crate::geom::BlockPos;
use crate::world::WorldProvider;
use log::debug;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag, checked between structures and between
/// commit batches. Cloning shares the flag.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One block mutation waiting to be committed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct QueuedBlock {
    pub pos: BlockPos,
    pub material: BlockMaterial,
    pub facing: Option<Facing>,
}

/// Observable progress of a draining queue.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CommitProgress {
    /// Layer (y) of the last committed block.
    pub layer: i32,
    /// Row (z) of the last committed block.
    pub row: i32,
    pub percent: f32,
    pub done: bool,
}

/// Batched voxel commits: fixed-size batches per tick in deterministic
/// layer -> row -> x order. A queue holds exactly one structure's blocks
/// at a time so commits never interleave within a voxel region.
pub struct CommitQueue {
    pending: VecDeque<QueuedBlock>,
    batch_size: usize,
    total: usize,
    committed: usize,
    last: Option<BlockPos>,
}

impl CommitQueue {
    pub fn new(batch_size: usize) -> CommitQueue {
        CommitQueue {
            pending: VecDeque::new(),
            batch_size: batch_size.max(1),
            total: 0,
            committed: 0,
            last: None,
        }
    }

    /// Queue a structure's blocks, sorted into commit order.
    pub fn enqueue(&mut self, mut blocks: Vec<QueuedBlock>) {
        blocks.sort_by_key(|b| (b.pos.y, b.pos.z, b.pos.x));
        self.total += blocks.len();
        self.pending.extend(blocks);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Commit one batch.
    pub fn tick(&mut self, world: &mut dyn WorldProvider) -> CommitProgress {
        for _ in 0..self.batch_size {
            let Some(block) = self.pending.pop_front() else {
                break;
            };
            match block.facing {
                Some(facing) => {
                    world.set_block_facing(block.pos.x, block.pos.y, block.pos.z, block.material, facing)
                }
                None => world.set_block(block.pos.x, block.pos.y, block.pos.z, block.material),
            }
            self.committed += 1;
            self.last = Some(block.pos);
        }
        self.progress()
    }

    pub fn progress(&self) -> CommitProgress {
        CommitProgress {
            layer: self.last.map(|p| p.y).unwrap_or(0),
            row: self.last.map(|p| p.z).unwrap_or(0),
            percent: if self.total == 0 {
                100.0
            } else {
                self.committed as f32 * 100.0 / self.total as f32
            },
            done: self.pending.is_empty(),
        }
    }

    /// Drain the queue, honoring cancellation between batches. Returns
    /// true when every block was committed.
    pub fn run_to_completion(&mut self, world: &mut dyn WorldProvider, cancel: &CancelToken) -> bool {
        while !self.pending.is_empty() {
            if cancel.is_cancelled() {
                debug!(
                    "[STRUCT] commit cancelled with {} blocks pending",
                    self.pending.len()
                );
                return false;
            }
            self.tick(world);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::GridWorld;

    fn blocks_3x3(y: i32) -> Vec<QueuedBlock> {
        let mut blocks = Vec::new();
        for x in 0..3 {
            for z in 0..3 {
                blocks.push(QueuedBlock {
                    pos: BlockPos::new(x, y, z),
                    material: BlockMaterial::Cobblestone,
                    facing: None,
                });
            }
        }
        blocks
    }

    #[test]
    fn batches_commit_in_layer_row_x_order() {
        let mut world = GridWorld::flat("test", 64);
        let mut queue = CommitQueue::new(4);
        // Enqueue out of order across two layers.
        let mut blocks = blocks_3x3(66);
        blocks.extend(blocks_3x3(65));
        queue.enqueue(blocks);

        let progress = queue.tick(&mut world);
        assert!(!progress.done);
        assert_eq!(progress.layer, 65);
        // First batch fills layer 65 row 0 and one block of row 1.
        assert_eq!(world.block_at(2, 65, 0), BlockMaterial::Cobblestone);
        assert_eq!(world.block_at(0, 65, 1), BlockMaterial::Cobblestone);
        assert_eq!(world.block_at(1, 65, 1), BlockMaterial::Air);
        assert_eq!(world.block_at(0, 66, 0), BlockMaterial::Air);
    }

    #[test]
    fn run_to_completion_commits_everything() {
        let mut world = GridWorld::flat("test", 64);
        let mut queue = CommitQueue::new(5);
        queue.enqueue(blocks_3x3(65));
        assert!(queue.run_to_completion(&mut world, &CancelToken::new()));
        assert_eq!(queue.progress().percent, 100.0);
        for x in 0..3 {
            for z in 0..3 {
                assert_eq!(world.block_at(x, 65, z), BlockMaterial::Cobblestone);
            }
        }
    }

    #[test]
    fn cancellation_stops_between_batches() {
        let mut world = GridWorld::flat("test", 64);
        let mut queue = CommitQueue::new(5);
        queue.enqueue(blocks_3x3(65));
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(!queue.run_to_completion(&mut world, &cancel));
        assert_eq!(queue.remaining(), 9);
    }
}
