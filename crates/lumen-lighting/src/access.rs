use hashbrown::HashMap;
use lumen_blocks::Block;
use lumen_chunk::{Chunk, ChunkState, LightChannel};
use lumen_world::{ChunkCoord, WorldDims, WorldPos};

/// World-space view of voxels and light that the engine propagates through.
///
/// `block` returns `None` for positions the view cannot see (outside the
/// vertical range or in a chunk that is not available); propagation treats
/// those as walls. Light reads there return 0.
pub trait LightAccess {
    fn dims(&self) -> WorldDims;

    fn has_chunk(&self, coord: ChunkCoord) -> bool;

    fn block(&self, p: WorldPos) -> Option<Block>;

    fn light(&self, ch: LightChannel, p: WorldPos) -> u8;

    fn set_light(&mut self, ch: LightChannel, p: WorldPos, level: u8);
}

/// Single-chunk view used while a chunk is still owned by a worker.
pub struct ChunkAccess<'a> {
    chunk: &'a mut Chunk,
}

impl<'a> ChunkAccess<'a> {
    pub fn new(chunk: &'a mut Chunk) -> Self {
        Self { chunk }
    }

    #[inline]
    fn local(&self, p: WorldPos) -> Option<(usize, usize)> {
        if p.chunk() != self.chunk.coord || !self.chunk.column.dims().contains_y(p.y) {
            return None;
        }
        Some(p.local_xz())
    }
}

impl LightAccess for ChunkAccess<'_> {
    fn dims(&self) -> WorldDims {
        self.chunk.column.dims()
    }

    fn has_chunk(&self, coord: ChunkCoord) -> bool {
        coord == self.chunk.coord
    }

    fn block(&self, p: WorldPos) -> Option<Block> {
        let (lx, lz) = self.local(p)?;
        Some(self.chunk.column.get_voxel(lx, p.y, lz))
    }

    fn light(&self, ch: LightChannel, p: WorldPos) -> u8 {
        match self.local(p) {
            Some((lx, lz)) => self.chunk.column.light(ch, lx, p.y, lz),
            None => 0,
        }
    }

    fn set_light(&mut self, ch: LightChannel, p: WorldPos, level: u8) {
        if let Some((lx, lz)) = self.local(p) {
            self.chunk.column.set_light(ch, lx, p.y, lz, level);
        }
    }
}

/// View over the resident chunk map. Only chunks that have finished
/// generation (`LightPending` or `Ready`) take part in propagation. Any light
/// change marks the owning chunk's lighting dirty.
pub struct ResidentAccess<'a> {
    chunks: &'a mut HashMap<ChunkCoord, Chunk>,
    dims: WorldDims,
}

impl<'a> ResidentAccess<'a> {
    pub fn new(chunks: &'a mut HashMap<ChunkCoord, Chunk>, dims: WorldDims) -> Self {
        Self { chunks, dims }
    }

    #[inline]
    fn admitted(chunk: &Chunk) -> bool {
        matches!(chunk.state(), ChunkState::LightPending | ChunkState::Ready)
    }

    #[inline]
    fn chunk_at(&self, p: WorldPos) -> Option<&Chunk> {
        if !self.dims.contains_y(p.y) {
            return None;
        }
        self.chunks.get(&p.chunk()).filter(|c| Self::admitted(c))
    }
}

impl LightAccess for ResidentAccess<'_> {
    fn dims(&self) -> WorldDims {
        self.dims
    }

    fn has_chunk(&self, coord: ChunkCoord) -> bool {
        self.chunks.get(&coord).is_some_and(Self::admitted)
    }

    fn block(&self, p: WorldPos) -> Option<Block> {
        let chunk = self.chunk_at(p)?;
        let (lx, lz) = p.local_xz();
        Some(chunk.column.get_voxel(lx, p.y, lz))
    }

    fn light(&self, ch: LightChannel, p: WorldPos) -> u8 {
        let Some(chunk) = self.chunk_at(p) else {
            return 0;
        };
        let (lx, lz) = p.local_xz();
        chunk.column.light(ch, lx, p.y, lz)
    }

    fn set_light(&mut self, ch: LightChannel, p: WorldPos, level: u8) {
        if !self.dims.contains_y(p.y) {
            return;
        }
        let Some(chunk) = self.chunks.get_mut(&p.chunk()) else {
            return;
        };
        if !Self::admitted(chunk) {
            return;
        }
        let (lx, lz) = p.local_xz();
        if chunk.column.set_light(ch, lx, p.y, lz, level) {
            chunk.mark_lighting_dirty();
        }
    }
}
