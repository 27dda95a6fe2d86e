use std::collections::VecDeque;

use hashbrown::HashSet;
use lumen_world::ChunkCoord;

/// FIFO of chunks waiting for border stitching, without duplicates.
#[derive(Debug, Default)]
pub struct RelightQueue {
    order: VecDeque<ChunkCoord>,
    queued: HashSet<ChunkCoord>,
}

impl RelightQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `coord` was already queued.
    pub fn push(&mut self, coord: ChunkCoord) -> bool {
        if !self.queued.insert(coord) {
            return false;
        }
        self.order.push_back(coord);
        true
    }

    pub fn pop(&mut self) -> Option<ChunkCoord> {
        while let Some(coord) = self.order.pop_front() {
            if self.queued.remove(&coord) {
                return Some(coord);
            }
        }
        None
    }

    /// Forgets queued work for an unloaded chunk.
    pub fn drop_chunk(&mut self, coord: ChunkCoord) -> bool {
        if !self.queued.remove(&coord) {
            return false;
        }
        self.order.retain(|c| *c != coord);
        true
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.queued.contains(&coord)
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}
