use std::collections::VecDeque;
use std::sync::Arc;

use lumen_blocks::{Block, BlockRegistry, LightBehavior, MAX_LIGHT};
use lumen_chunk::{Chunk, LightChannel, VoxelChange};
use lumen_world::{CHUNK_SIZE, ChunkCoord, WorldPos};
use serde::Deserialize;

use crate::access::{ChunkAccess, LightAccess};

// Indices into `WorldPos::neighbors()`: +Y, -Y, +X, -X, +Z, -Z.
const DOWN: usize = 1;
const POS_X: usize = 2;
const NEG_X: usize = 3;
const POS_Z: usize = 4;
const NEG_Z: usize = 5;
const HORIZONTAL: [usize; 4] = [POS_X, NEG_X, POS_Z, NEG_Z];

#[inline]
fn opposite(dir: usize) -> usize {
    dir ^ 1
}

/// `center` and its eight surrounding chunks. Light from a voxel travels at
/// most `MAX_LIGHT - 1` steps sideways, so it cannot leave this area.
fn area_around(center: ChunkCoord) -> Vec<ChunkCoord> {
    (-1..=1)
        .flat_map(|dz| (-1..=1).map(move |dx| center.offset(dx, dz)))
        .collect()
}

#[derive(Clone, Debug, Deserialize)]
pub struct LightConfig {
    #[serde(default = "default_max_flood_nodes")]
    pub max_flood_nodes: usize,
    #[serde(default = "default_max_remove_nodes")]
    pub max_remove_nodes: usize,
}

fn default_max_flood_nodes() -> usize {
    1 << 20
}
fn default_max_remove_nodes() -> usize {
    1 << 18
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            max_flood_nodes: default_max_flood_nodes(),
            max_remove_nodes: default_max_remove_nodes(),
        }
    }
}

/// Work done by one propagation call.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FloodStats {
    pub nodes_added: usize,
    pub nodes_removed: usize,
    pub capped: bool,
}

impl FloodStats {
    pub fn merge(&mut self, other: FloodStats) {
        self.nodes_added += other.nodes_added;
        self.nodes_removed += other.nodes_removed;
        self.capped |= other.capped;
    }
}

/// Breadth-first light propagation over any [`LightAccess`] view.
///
/// Stored levels satisfy: every non-opaque voxel holds the maximum of its own
/// source level and each neighbor's level minus the cost of stepping into it.
/// A step costs `1 + extra` where `extra` is the target's extra attenuation,
/// except sky light moving straight down, which only pays `extra`. Opaque
/// voxels hold their emission in the block channel and 0 otherwise.
pub struct LightEngine {
    reg: Arc<BlockRegistry>,
    cfg: LightConfig,
}

impl LightEngine {
    pub fn new(reg: Arc<BlockRegistry>, cfg: LightConfig) -> Self {
        Self { reg, cfg }
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.reg
    }

    pub fn config(&self) -> &LightConfig {
        &self.cfg
    }

    #[inline]
    fn behavior(&self, b: Block) -> LightBehavior {
        self.reg.light_behavior(b)
    }

    /// Level arriving in a voxel of behavior `target` from a neighbor at
    /// `level`, moving in direction `dir`.
    #[inline]
    fn step(&self, ch: LightChannel, level: u8, dir: usize, target: LightBehavior) -> u8 {
        if target.is_opaque() || level == 0 {
            return 0;
        }
        let extra = target.extra_attenuation();
        let cost = if ch == LightChannel::Sky && dir == DOWN {
            extra
        } else {
            1 + extra
        };
        level.saturating_sub(cost)
    }

    /// Light a voxel produces by itself, independent of its neighbors.
    fn source_level<A: LightAccess + ?Sized>(
        &self,
        access: &A,
        ch: LightChannel,
        p: WorldPos,
        block: Block,
    ) -> u8 {
        match ch {
            LightChannel::Block => self.reg.emission(block),
            LightChannel::Sky => {
                let top = access.dims().height() as i32 - 1;
                if p.y == top {
                    self.step(ch, MAX_LIGHT, DOWN, self.behavior(block))
                } else {
                    0
                }
            }
        }
    }

    /// Lights a freshly generated chunk in isolation: column scan for sky,
    /// emitters for block light, then a flood bounded by the chunk.
    /// Running it twice gives the same result.
    pub fn seed_chunk(&self, chunk: &mut Chunk) -> FloodStats {
        let coord = chunk.coord;
        let stats = {
            let mut access = ChunkAccess::new(chunk);
            self.recompute(&mut access, &[coord], &LightChannel::ALL)
        };
        chunk.set_light_initialized(true);
        if stats.capped {
            log::warn!(target: "lighting", "seed for chunk ({}, {}) hit the node cap", coord.cx, coord.cz);
        }
        stats
    }

    /// Recomputes both channels from scratch for `coords`, pulling in light
    /// from any other chunk the view can see. Intended for closed sets of
    /// chunks (all resident chunks) and as a reference for the incremental
    /// paths.
    pub fn full_recompute<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        coords: &[ChunkCoord],
    ) -> FloodStats {
        self.recompute(access, coords, &LightChannel::ALL)
    }

    fn recompute<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        coords: &[ChunkCoord],
        channels: &[LightChannel],
    ) -> FloodStats {
        let height = access.dims().height();
        let sky = channels.contains(&LightChannel::Sky);
        let block = channels.contains(&LightChannel::Block);
        let mut sky_q = VecDeque::new();
        let mut blk_q = VecDeque::new();

        for &coord in coords {
            if !access.has_chunk(coord) {
                continue;
            }
            for lz in 0..CHUNK_SIZE {
                for lx in 0..CHUNK_SIZE {
                    let mut level = MAX_LIGHT;
                    for y in (0..height).rev() {
                        let p = WorldPos::from_local(coord, lx, y, lz);
                        let Some(b) = access.block(p) else {
                            continue;
                        };
                        if sky {
                            level = self.step(LightChannel::Sky, level, DOWN, self.behavior(b));
                            access.set_light(LightChannel::Sky, p, level);
                        }
                        if block {
                            let emission = self.reg.emission(b);
                            access.set_light(LightChannel::Block, p, emission);
                            if emission > 0 {
                                blk_q.push_back(p);
                            }
                        }
                    }
                }
            }
        }

        // Column scan already settled vertical neighbors; only sideways
        // spread can raise anything, including across into other chunks.
        for &coord in coords {
            if !access.has_chunk(coord) {
                continue;
            }
            if sky {
                for y in 0..height {
                    for lz in 0..CHUNK_SIZE {
                        for lx in 0..CHUNK_SIZE {
                            let p = WorldPos::from_local(coord, lx, y, lz);
                            let level = access.light(LightChannel::Sky, p);
                            if level > 1 && self.raises_sideways(access, LightChannel::Sky, p, level) {
                                sky_q.push_back(p);
                            }
                        }
                    }
                }
            }
            for neighbor in coord.face_neighbors() {
                if coords.contains(&neighbor) {
                    continue;
                }
                for &ch in channels {
                    let queue = match ch {
                        LightChannel::Sky => &mut sky_q,
                        LightChannel::Block => &mut blk_q,
                    };
                    self.push_border_donors(access, ch, coord, neighbor, queue);
                }
            }
        }

        let mut stats = FloodStats::default();
        self.flood_add(access, LightChannel::Sky, &mut sky_q, &mut stats);
        self.flood_add(access, LightChannel::Block, &mut blk_q, &mut stats);
        stats
    }

    fn raises_sideways<A: LightAccess + ?Sized>(
        &self,
        access: &A,
        ch: LightChannel,
        p: WorldPos,
        level: u8,
    ) -> bool {
        let neighbors = p.neighbors();
        HORIZONTAL.iter().any(|&dir| {
            let n = neighbors[dir];
            access
                .block(n)
                .is_some_and(|b| self.step(ch, level, dir, self.behavior(b)) > access.light(ch, n))
        })
    }

    /// Pushes voxels on the face between `coord` and `neighbor` that can
    /// raise the voxel across from them, on either side.
    fn push_border_donors<A: LightAccess + ?Sized>(
        &self,
        access: &A,
        ch: LightChannel,
        coord: ChunkCoord,
        neighbor: ChunkCoord,
        queue: &mut VecDeque<WorldPos>,
    ) {
        if !access.has_chunk(coord) || !access.has_chunk(neighbor) {
            return;
        }
        let last = CHUNK_SIZE - 1;
        // dir points from `coord` into `neighbor`.
        let dir = match (neighbor.cx - coord.cx, neighbor.cz - coord.cz) {
            (-1, 0) => NEG_X,
            (1, 0) => POS_X,
            (0, -1) => NEG_Z,
            (0, 1) => POS_Z,
            _ => return,
        };
        let height = access.dims().height();
        for y in 0..height {
            for i in 0..CHUNK_SIZE {
                let (ax, az, bx, bz) = match dir {
                    NEG_X => (0, i, last, i),
                    POS_X => (last, i, 0, i),
                    NEG_Z => (i, 0, i, last),
                    _ => (i, last, i, 0),
                };
                let a = WorldPos::from_local(coord, ax, y, az);
                let b = WorldPos::from_local(neighbor, bx, y, bz);
                let (Some(block_a), Some(block_b)) = (access.block(a), access.block(b)) else {
                    continue;
                };
                let la = access.light(ch, a);
                let lb = access.light(ch, b);
                if self.step(ch, la, dir, self.behavior(block_b)) > lb {
                    queue.push_back(a);
                }
                if self.step(ch, lb, opposite(dir), self.behavior(block_a)) > la {
                    queue.push_back(b);
                }
            }
        }
    }

    /// Exchanges light between `coord` and every visible face neighbor.
    pub fn stitch<A: LightAccess + ?Sized>(&self, access: &mut A, coord: ChunkCoord) -> FloodStats {
        let mut stats = FloodStats::default();
        for ch in LightChannel::ALL {
            let mut queue = VecDeque::new();
            for neighbor in coord.face_neighbors() {
                self.push_border_donors(access, ch, coord, neighbor, &mut queue);
            }
            self.flood_add(access, ch, &mut queue, &mut stats);
        }
        stats
    }

    fn flood_add<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        ch: LightChannel,
        queue: &mut VecDeque<WorldPos>,
        stats: &mut FloodStats,
    ) {
        let mut processed = 0usize;
        while let Some(p) = queue.pop_front() {
            if processed >= self.cfg.max_flood_nodes {
                stats.capped = true;
                log::warn!(
                    target: "lighting",
                    "{:?} flood stopped at cap {} with {} nodes queued near ({}, {}, {})",
                    ch, self.cfg.max_flood_nodes, queue.len() + 1, p.x, p.y, p.z
                );
                queue.clear();
                break;
            }
            processed += 1;
            let level = access.light(ch, p);
            if level == 0 {
                continue;
            }
            for (dir, n) in p.neighbors().into_iter().enumerate() {
                let Some(b) = access.block(n) else {
                    continue;
                };
                let cand = self.step(ch, level, dir, self.behavior(b));
                if cand > access.light(ch, n) {
                    access.set_light(ch, n, cand);
                    queue.push_back(n);
                }
            }
        }
        stats.nodes_added += processed;
    }

    // Phase one of removal: darken everything that could only have been lit
    // through the queued voxels, collecting the brighter boundary as seeds.
    // Returns true if it stopped at the node cap, leaving the neighbors of
    // still-queued voxels unvisited.
    fn flood_remove<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        ch: LightChannel,
        queue: &mut VecDeque<(WorldPos, u8)>,
        seeds: &mut VecDeque<WorldPos>,
        stats: &mut FloodStats,
    ) -> bool {
        let mut processed = 0usize;
        let mut overrun = false;
        while let Some((p, old)) = queue.pop_front() {
            if processed >= self.cfg.max_remove_nodes {
                stats.capped = true;
                overrun = true;
                log::warn!(
                    target: "lighting",
                    "{:?} removal stopped at cap {} with {} nodes queued near ({}, {}, {}); rebuilding the area",
                    ch, self.cfg.max_remove_nodes, queue.len() + 1, p.x, p.y, p.z
                );
                queue.clear();
                break;
            }
            processed += 1;
            for (dir, n) in p.neighbors().into_iter().enumerate() {
                let Some(b) = access.block(n) else {
                    continue;
                };
                let v = access.light(ch, n);
                if v == 0 {
                    continue;
                }
                let beh = self.behavior(b);
                let through = self.step(ch, old, dir, beh);
                let dependent = !beh.is_opaque() && (v < old || v == through);
                if dependent {
                    access.set_light(ch, n, 0);
                    queue.push_back((n, v));
                    let src = self.source_level(access, ch, n, b);
                    if src > 0 {
                        access.set_light(ch, n, src);
                        seeds.push_back(n);
                    }
                } else {
                    seeds.push_back(n);
                }
            }
        }
        stats.nodes_removed += processed;
        overrun
    }

    // Zeroes `p` ahead of a removal flood, keeping what it emits by itself.
    fn unseat<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        ch: LightChannel,
        p: WorldPos,
        queue: &mut VecDeque<(WorldPos, u8)>,
        seeds: &mut VecDeque<WorldPos>,
    ) {
        let Some(block) = access.block(p) else {
            return;
        };
        let old = access.light(ch, p);
        if old == 0 {
            return;
        }
        access.set_light(ch, p, 0);
        queue.push_back((p, old));
        let src = self.source_level(access, ch, p, block);
        if src > 0 {
            access.set_light(ch, p, src);
            seeds.push_back(p);
        }
    }

    // Phase two, or a rebuild of `ch` over `area` when phase one overran.
    fn finish_remove<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        ch: LightChannel,
        overrun: bool,
        area: &[ChunkCoord],
        seeds: &mut VecDeque<WorldPos>,
        stats: &mut FloodStats,
    ) {
        if overrun {
            seeds.clear();
            stats.merge(self.recompute(access, area, &[ch]));
        } else {
            self.flood_add(access, ch, seeds, stats);
        }
    }

    /// Two-phase removal of the light held at `pos`, whose level before the
    /// change was `old_level`. The voxel's current block decides what it
    /// still emits.
    pub fn propagate_remove<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        ch: LightChannel,
        pos: WorldPos,
        old_level: u8,
    ) -> FloodStats {
        let mut stats = FloodStats::default();
        let Some(block) = access.block(pos) else {
            return stats;
        };
        let mut queue = VecDeque::new();
        let mut seeds = VecDeque::new();
        access.set_light(ch, pos, 0);
        queue.push_back((pos, old_level));

        // Full-strength sky runs straight down the column: clear it in one
        // pass instead of one BFS layer at a time.
        if ch == LightChannel::Sky && old_level == MAX_LIGHT {
            let mut q = pos.offset(0, -1, 0);
            while let Some(b) = access.block(q) {
                if self.step(ch, MAX_LIGHT, DOWN, self.behavior(b)) != MAX_LIGHT
                    || access.light(ch, q) != MAX_LIGHT
                {
                    break;
                }
                access.set_light(ch, q, 0);
                queue.push_back((q, MAX_LIGHT));
                q = q.offset(0, -1, 0);
            }
        }

        let src = self.source_level(access, ch, pos, block);
        if src > 0 {
            access.set_light(ch, pos, src);
            seeds.push_back(pos);
        }
        let overrun = self.flood_remove(access, ch, &mut queue, &mut seeds, &mut stats);
        self.finish_remove(access, ch, overrun, &area_around(pos.chunk()), &mut seeds, &mut stats);
        stats
    }

    /// Takes back the light `gone` gave its face neighbors. Call after
    /// `gone` has left the view; light the neighbors hold on their own is
    /// refilled.
    pub fn release_chunk<A: LightAccess + ?Sized>(&self, access: &mut A, gone: ChunkCoord) -> FloodStats {
        let mut stats = FloodStats::default();
        if access.has_chunk(gone) {
            return stats;
        }
        let height = access.dims().height();
        let last = CHUNK_SIZE - 1;
        for ch in LightChannel::ALL {
            let mut queue = VecDeque::new();
            let mut seeds = VecDeque::new();
            for neighbor in gone.face_neighbors() {
                if !access.has_chunk(neighbor) {
                    continue;
                }
                for y in 0..height {
                    for i in 0..CHUNK_SIZE {
                        // Local column of `neighbor` on the face it shares with `gone`.
                        let (lx, lz) = match (gone.cx - neighbor.cx, gone.cz - neighbor.cz) {
                            (-1, 0) => (0, i),
                            (1, 0) => (last, i),
                            (0, -1) => (i, 0),
                            _ => (i, last),
                        };
                        let p = WorldPos::from_local(neighbor, lx, y, lz);
                        self.unseat(access, ch, p, &mut queue, &mut seeds);
                    }
                }
            }
            if queue.is_empty() {
                continue;
            }
            let overrun = self.flood_remove(access, ch, &mut queue, &mut seeds, &mut stats);
            self.finish_remove(access, ch, overrun, &area_around(gone), &mut seeds, &mut stats);
        }
        stats
    }

    /// Relaxes outward from `seeds` using their stored levels.
    pub fn propagate_add<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        ch: LightChannel,
        seeds: impl IntoIterator<Item = WorldPos>,
    ) -> FloodStats {
        let mut stats = FloodStats::default();
        let mut queue: VecDeque<WorldPos> = seeds.into_iter().collect();
        self.flood_add(access, ch, &mut queue, &mut stats);
        stats
    }

    // Raise `pos` to what its own source and neighbors support, then spread.
    fn relight_at<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        ch: LightChannel,
        pos: WorldPos,
        block: Block,
    ) -> FloodStats {
        let beh = self.behavior(block);
        let mut level = self.source_level(access, ch, pos, block);
        if !beh.is_opaque() {
            for (dir, n) in pos.neighbors().into_iter().enumerate() {
                if access.block(n).is_none() {
                    continue;
                }
                let incoming = self.step(ch, access.light(ch, n), opposite(dir), beh);
                level = level.max(incoming);
            }
        }
        if level <= access.light(ch, pos) {
            return FloodStats::default();
        }
        access.set_light(ch, pos, level);
        let mut queue = VecDeque::from([pos]);

        // Open to the sky: fill the column below directly.
        if ch == LightChannel::Sky && level == MAX_LIGHT {
            let mut carried = level;
            let mut q = pos.offset(0, -1, 0);
            while let Some(b) = access.block(q) {
                let cand = self.step(ch, carried, DOWN, self.behavior(b));
                if cand <= access.light(ch, q) {
                    break;
                }
                access.set_light(ch, q, cand);
                queue.push_back(q);
                carried = cand;
                q = q.offset(0, -1, 0);
            }
        }

        let mut stats = FloodStats::default();
        self.flood_add(access, ch, &mut queue, &mut stats);
        stats
    }

    /// Updates both channels after the voxel at `pos` changed as described by
    /// `change`. The new block must already be stored in the view.
    pub fn on_voxel_changed<A: LightAccess + ?Sized>(
        &self,
        access: &mut A,
        pos: WorldPos,
        change: &VoxelChange,
    ) -> FloodStats {
        let mut stats = FloodStats::default();
        if !change.changed() || access.block(pos).is_none() {
            return stats;
        }
        let old_beh = self.behavior(change.old);
        let new_beh = self.behavior(change.new);
        let blocks_more = new_beh.extra_attenuation() > old_beh.extra_attenuation();
        let emission_dropped = self.reg.emission(change.new) < self.reg.emission(change.old);

        for ch in LightChannel::ALL {
            let old_level = access.light(ch, pos);
            let lost_source = ch == LightChannel::Block && emission_dropped;
            if old_level > 0 && (blocks_more || lost_source) {
                stats.merge(self.propagate_remove(access, ch, pos, old_level));
            }
            stats.merge(self.relight_at(access, ch, pos, change.new));
        }
        if stats.capped {
            log::warn!(target: "lighting", "relight at ({}, {}, {}) is incomplete", pos.x, pos.y, pos.z);
        }
        stats
    }
}
