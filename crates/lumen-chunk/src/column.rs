use lumen_blocks::{Block, BlockRegistry, MAX_LIGHT};
use lumen_world::{CHUNK_SIZE, ColumnSink, SECTION_SIZE, WorldDims};

use crate::section::Section;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LightChannel {
    Sky,
    Block,
}

impl LightChannel {
    pub const ALL: [LightChannel; 2] = [LightChannel::Sky, LightChannel::Block];

    /// Value read from voxels whose section is not allocated.
    #[inline]
    pub const fn absent_level(self) -> u8 {
        match self {
            LightChannel::Sky => MAX_LIGHT,
            LightChannel::Block => 0,
        }
    }
}

/// Outcome of a voxel write, as seen by lighting and meshing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VoxelChange {
    pub old: Block,
    pub new: Block,
    pub opacity_changed: bool,
    pub emission_changed: bool,
}

impl VoxelChange {
    pub fn unchanged(block: Block) -> Self {
        Self {
            old: block,
            new: block,
            opacity_changed: false,
            emission_changed: false,
        }
    }

    #[inline]
    pub fn changed(&self) -> bool {
        self.old != self.new
    }

    /// Presence or opacity changed, so meshes touching the voxel are stale.
    pub fn shape_changed(&self) -> bool {
        self.old.is_air() != self.new.is_air() || self.opacity_changed
    }
}

/// Voxel and light storage for one chunk column, split into lazily
/// allocated sections.
#[derive(Clone, Debug)]
pub struct ChunkColumn {
    dims: WorldDims,
    sections: Vec<Option<Box<Section>>>,
}

impl ChunkColumn {
    pub fn new(dims: WorldDims) -> Self {
        Self {
            dims,
            sections: (0..dims.sections).map(|_| None).collect(),
        }
    }

    #[inline]
    pub fn dims(&self) -> WorldDims {
        self.dims
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.dims.height()
    }

    // (section index, index within section), None outside the column.
    #[inline]
    fn locate(&self, lx: usize, y: i32, lz: usize) -> Option<(usize, usize)> {
        if lx >= CHUNK_SIZE || lz >= CHUNK_SIZE || !self.dims.contains_y(y) {
            return None;
        }
        let y = y as usize;
        Some((y / SECTION_SIZE, Section::idx(lx, y % SECTION_SIZE, lz)))
    }

    #[inline]
    fn section_for_write(&mut self, si: usize) -> &mut Section {
        self.sections[si].get_or_insert_with(|| Box::new(Section::new()))
    }

    fn collapse_if_default(&mut self, si: usize) {
        if self.sections[si].as_ref().is_some_and(|s| s.is_default()) {
            self.sections[si] = None;
        }
    }

    #[inline]
    pub fn get_voxel(&self, lx: usize, y: i32, lz: usize) -> Block {
        match self.locate(lx, y, lz) {
            Some((si, i)) => self.sections[si]
                .as_ref()
                .map_or(Block::AIR, |s| s.block(i)),
            None => Block::AIR,
        }
    }

    /// Stores `block` and reports what changed. Light arrays are untouched;
    /// relighting is the caller's job.
    pub fn set_voxel(
        &mut self,
        lx: usize,
        y: i32,
        lz: usize,
        block: Block,
        reg: &BlockRegistry,
    ) -> VoxelChange {
        let Some((si, i)) = self.locate(lx, y, lz) else {
            return VoxelChange::unchanged(block);
        };
        let old = self.put_raw(si, i, block);
        VoxelChange {
            old,
            new: block,
            opacity_changed: reg.light_behavior(old) != reg.light_behavior(block),
            emission_changed: reg.emission(old) != reg.emission(block),
        }
    }

    fn put_raw(&mut self, si: usize, i: usize, block: Block) -> Block {
        if self.sections[si].is_none() && block.is_air() {
            return Block::AIR;
        }
        let old = self.section_for_write(si).set_block(i, block);
        if block.is_air() {
            self.collapse_if_default(si);
        }
        old
    }

    #[inline]
    pub fn light(&self, ch: LightChannel, lx: usize, y: i32, lz: usize) -> u8 {
        let Some((si, i)) = self.locate(lx, y, lz) else {
            return 0;
        };
        match (&self.sections[si], ch) {
            (None, ch) => ch.absent_level(),
            (Some(s), LightChannel::Sky) => s.sky(i),
            (Some(s), LightChannel::Block) => s.block_light(i),
        }
    }

    /// Returns whether the stored value changed. Writing the absent default
    /// into an absent section does not allocate it.
    pub fn set_light(&mut self, ch: LightChannel, lx: usize, y: i32, lz: usize, level: u8) -> bool {
        let Some((si, i)) = self.locate(lx, y, lz) else {
            return false;
        };
        let level = level.min(MAX_LIGHT);
        if self.sections[si].is_none() && level == ch.absent_level() {
            return false;
        }
        let s = self.section_for_write(si);
        let changed = match ch {
            LightChannel::Sky => s.set_sky(i, level),
            LightChannel::Block => s.set_block_light(i, level),
        };
        if changed && level == ch.absent_level() {
            self.collapse_if_default(si);
        }
        changed
    }

    #[inline]
    pub fn get_sky_light(&self, lx: usize, y: i32, lz: usize) -> u8 {
        self.light(LightChannel::Sky, lx, y, lz)
    }

    #[inline]
    pub fn get_block_light(&self, lx: usize, y: i32, lz: usize) -> u8 {
        self.light(LightChannel::Block, lx, y, lz)
    }

    pub fn set_sky_light(&mut self, lx: usize, y: i32, lz: usize, level: u8) -> bool {
        self.set_light(LightChannel::Sky, lx, y, lz, level)
    }

    pub fn set_block_light(&mut self, lx: usize, y: i32, lz: usize, level: u8) -> bool {
        self.set_light(LightChannel::Block, lx, y, lz, level)
    }

    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index).and_then(|s| s.as_deref())
    }

    /// Absent sections and allocated all-air sections both count as empty.
    pub fn section_is_empty(&self, index: usize) -> bool {
        self.section(index).is_none_or(Section::is_empty)
    }

    pub fn allocated_sections(&self) -> usize {
        self.sections.iter().filter(|s| s.is_some()).count()
    }

    /// Highest y holding a non-air voxel in column `(lx, lz)`.
    pub fn top_non_air(&self, lx: usize, lz: usize) -> Option<usize> {
        for si in (0..self.sections.len()).rev() {
            let Some(s) = self.sections[si].as_deref() else {
                continue;
            };
            if s.is_empty() {
                continue;
            }
            for ly in (0..SECTION_SIZE).rev() {
                if !s.block(Section::idx(lx, ly, lz)).is_air() {
                    return Some(si * SECTION_SIZE + ly);
                }
            }
        }
        None
    }
}

impl ColumnSink for ChunkColumn {
    fn dims(&self) -> WorldDims {
        self.dims
    }

    fn put(&mut self, lx: usize, y: usize, lz: usize, block: Block) {
        if let Some((si, i)) = self.locate(lx, y as i32, lz) {
            self.put_raw(si, i, block);
        }
    }
}
