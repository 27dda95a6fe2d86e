use lumen_blocks::{Block, MAX_LIGHT};
use lumen_world::SECTION_SIZE;

pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// Dense 16³ block of voxels with both light channels.
///
/// Counters track how far the contents are from the implicit state of an
/// absent section (all air, sky 15, block light 0) so the owning column can
/// drop it without scanning.
#[derive(Clone, Debug)]
pub struct Section {
    blocks: Box<[Block]>,
    sky: Box<[u8]>,
    block_light: Box<[u8]>,
    non_air: u16,
    sky_dimmed: u16,
    block_lit: u16,
}

impl Default for Section {
    fn default() -> Self {
        Self::new()
    }
}

impl Section {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::AIR; SECTION_VOLUME].into_boxed_slice(),
            sky: vec![MAX_LIGHT; SECTION_VOLUME].into_boxed_slice(),
            block_light: vec![0; SECTION_VOLUME].into_boxed_slice(),
            non_air: 0,
            sky_dimmed: 0,
            block_lit: 0,
        }
    }

    #[inline]
    pub fn idx(x: usize, y: usize, z: usize) -> usize {
        (y * SECTION_SIZE + z) * SECTION_SIZE + x
    }

    #[inline]
    pub fn block(&self, i: usize) -> Block {
        self.blocks[i]
    }

    /// Returns the previous block.
    pub fn set_block(&mut self, i: usize, block: Block) -> Block {
        let old = self.blocks[i];
        if old == block {
            return old;
        }
        match (old.is_air(), block.is_air()) {
            (true, false) => self.non_air += 1,
            (false, true) => self.non_air -= 1,
            _ => {}
        }
        self.blocks[i] = block;
        old
    }

    #[inline]
    pub fn sky(&self, i: usize) -> u8 {
        self.sky[i]
    }

    pub fn set_sky(&mut self, i: usize, level: u8) -> bool {
        let old = self.sky[i];
        if old == level {
            return false;
        }
        match (old == MAX_LIGHT, level == MAX_LIGHT) {
            (true, false) => self.sky_dimmed += 1,
            (false, true) => self.sky_dimmed -= 1,
            _ => {}
        }
        self.sky[i] = level;
        true
    }

    #[inline]
    pub fn block_light(&self, i: usize) -> u8 {
        self.block_light[i]
    }

    pub fn set_block_light(&mut self, i: usize, level: u8) -> bool {
        let old = self.block_light[i];
        if old == level {
            return false;
        }
        match (old == 0, level == 0) {
            (true, false) => self.block_lit += 1,
            (false, true) => self.block_lit -= 1,
            _ => {}
        }
        self.block_light[i] = level;
        true
    }

    #[inline]
    pub fn non_air_count(&self) -> usize {
        self.non_air as usize
    }

    /// True when the section holds only air.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.non_air == 0
    }

    /// True when the section is indistinguishable from an absent one.
    #[inline]
    pub fn is_default(&self) -> bool {
        self.non_air == 0 && self.sky_dimmed == 0 && self.block_lit == 0
    }
}
