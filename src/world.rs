use std::error::Error;
use std::sync::Arc;

use hashbrown::HashMap;
use lumen_blocks::{Block, BlockRegistry};
use lumen_chunk::{Chunk, ChunkState, LightChannel};
use lumen_lighting::{FloodStats, LightEngine, RelightQueue, ResidentAccess};
use lumen_runtime::{
    ChunkWorkers, GenerateJob, JobOut, SchedulerCounters, StreamConfig, StreamingScheduler,
    process_generate_job,
};
use lumen_world::{CHUNK_SIZE, ChunkCoord, GenerateError, TerrainGenerator, WorldDims, WorldPos};

use crate::config::LumenConfig;

/// What one `update` call did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub center: Option<ChunkCoord>,
    pub unloaded: usize,
    pub completed: usize,
    pub failed: usize,
    pub discarded: usize,
    pub dispatched: usize,
    pub dropped: usize,
    pub stitched: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub resident: usize,
    pub ready: usize,
    pub light_pending: usize,
    pub pending: usize,
    pub inflight: usize,
    pub relight_queued: usize,
    /// Jobs sent to the pool and not yet picked up by a worker.
    pub jobs_queued: usize,
    pub jobs_running: usize,
    pub counters: SchedulerCounters,
}

/// Streaming voxel world with propagated sky and block light.
///
/// The value is the single writer of the resident chunk map: workers build
/// chunks off-thread and hand them back through `update`. Reads and edits
/// only see chunks that are `Ready`; everything else reads as air in the dark.
pub struct VoxelWorld {
    dims: WorldDims,
    reg: Arc<BlockRegistry>,
    generator: Arc<dyn TerrainGenerator>,
    engine: Arc<LightEngine>,
    chunks: HashMap<ChunkCoord, Chunk>,
    scheduler: StreamingScheduler,
    workers: ChunkWorkers,
    relight: RelightQueue,
}

impl VoxelWorld {
    pub fn new(
        reg: Arc<BlockRegistry>,
        generator: Arc<dyn TerrainGenerator>,
        dims: WorldDims,
        cfg: &LumenConfig,
    ) -> Result<Self, Box<dyn Error>> {
        let engine = Arc::new(LightEngine::new(reg.clone(), cfg.lighting.clone()));
        let workers = ChunkWorkers::new(
            cfg.stream.worker_count(),
            dims,
            generator.clone(),
            engine.clone(),
        )?;
        Ok(Self {
            dims,
            reg,
            generator,
            engine,
            chunks: HashMap::new(),
            scheduler: StreamingScheduler::new(cfg.stream.clone()),
            workers,
            relight: RelightQueue::new(),
        })
    }

    /// World with the generator and height described by `cfg.world`.
    pub fn from_config(reg: Arc<BlockRegistry>, cfg: &LumenConfig) -> Result<Self, Box<dyn Error>> {
        let generator = lumen_world::generator::from_config(&cfg.world, &reg)?;
        Self::new(reg, generator, cfg.world.dims(), cfg)
    }

    pub fn dims(&self) -> WorldDims {
        self.dims
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.reg
    }

    pub fn stream_config(&self) -> &StreamConfig {
        self.scheduler.config()
    }

    #[inline]
    fn ready_chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord).filter(|c| c.is_ready())
    }

    fn light_at(&self, ch: LightChannel, wx: i32, wy: i32, wz: i32) -> u8 {
        if !self.dims.contains_y(wy) {
            return 0;
        }
        let p = WorldPos::new(wx, wy, wz);
        let Some(chunk) = self.ready_chunk(p.chunk()) else {
            return 0;
        };
        let (lx, lz) = p.local_xz();
        chunk.column.light(ch, lx, wy, lz)
    }

    pub fn get_voxel(&self, wx: i32, wy: i32, wz: i32) -> Block {
        let p = WorldPos::new(wx, wy, wz);
        let Some(chunk) = self.ready_chunk(p.chunk()) else {
            return Block::AIR;
        };
        let (lx, lz) = p.local_xz();
        chunk.column.get_voxel(lx, wy, lz)
    }

    pub fn get_sky_light(&self, wx: i32, wy: i32, wz: i32) -> u8 {
        self.light_at(LightChannel::Sky, wx, wy, wz)
    }

    pub fn get_block_light(&self, wx: i32, wy: i32, wz: i32) -> u8 {
        self.light_at(LightChannel::Block, wx, wy, wz)
    }

    /// Writes a voxel into a `Ready` chunk and relights around it. Returns
    /// false, changing nothing, when the chunk is not `Ready` or `wy` is out
    /// of range.
    pub fn set_voxel(&mut self, wx: i32, wy: i32, wz: i32, block: Block) -> bool {
        if !self.dims.contains_y(wy) {
            return false;
        }
        let p = WorldPos::new(wx, wy, wz);
        let coord = p.chunk();
        let (lx, lz) = p.local_xz();
        let Some(chunk) = self.chunks.get_mut(&coord).filter(|c| c.is_ready()) else {
            return false;
        };
        let change = chunk.column.set_voxel(lx, wy, lz, block, &self.reg);
        if !change.changed() {
            return true;
        }
        // Chunks getting a rebuild here, with whether lighting was already dirty.
        let mut rebuilt = Vec::new();
        if change.shape_changed() {
            rebuilt.push((coord, chunk.dirty().needs_lighting_update));
            chunk.mark_geometry_dirty();
            for n in face_neighbors_touching(coord, lx, lz) {
                if let Some(nc) = self.chunks.get_mut(&n).filter(|c| c.is_ready()) {
                    rebuilt.push((n, nc.dirty().needs_lighting_update));
                    nc.mark_geometry_dirty();
                }
            }
        }
        let stats = {
            let mut access = ResidentAccess::new(&mut self.chunks, self.dims);
            self.engine.on_voxel_changed(&mut access, p, &change)
        };
        // Lighting dirty is only for light changes without a shape change.
        for (c, was_dirty) in rebuilt {
            if was_dirty {
                continue;
            }
            if let Some(chunk) = self.chunks.get_mut(&c) {
                chunk.consume_lighting_dirty();
            }
        }
        log::trace!(
            target: "world",
            "set ({wx}, {wy}, {wz}) {} -> {}: +{} -{} nodes",
            change.old.id,
            change.new.id,
            stats.nodes_added,
            stats.nodes_removed
        );
        true
    }

    pub fn is_chunk_ready(&self, cx: i32, cz: i32) -> bool {
        self.ready_chunk(ChunkCoord::new(cx, cz)).is_some()
    }

    /// Lifecycle state as seen from outside: resident chunks report their
    /// own state, chunks with a job in flight report `Generating`.
    pub fn chunk_state(&self, cx: i32, cz: i32) -> ChunkState {
        let coord = ChunkCoord::new(cx, cz);
        if let Some(chunk) = self.chunks.get(&coord) {
            return chunk.state();
        }
        if self.scheduler.is_inflight(coord) {
            ChunkState::Generating
        } else {
            ChunkState::Empty
        }
    }

    /// Generation failures since the chunk last loaded successfully.
    pub fn failure_count(&self, cx: i32, cz: i32) -> u32 {
        self.scheduler.failure_count(ChunkCoord::new(cx, cz))
    }

    pub fn consume_geometry_dirty(&mut self, cx: i32, cz: i32) -> bool {
        self.chunks
            .get_mut(&ChunkCoord::new(cx, cz))
            .is_some_and(|c| c.is_ready() && c.consume_geometry_dirty())
    }

    pub fn consume_lighting_dirty(&mut self, cx: i32, cz: i32) -> bool {
        self.chunks
            .get_mut(&ChunkCoord::new(cx, cz))
            .is_some_and(|c| c.is_ready() && c.consume_lighting_dirty())
    }

    /// Coordinates of every `Ready` chunk, in no particular order.
    pub fn ready_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks
            .values()
            .filter(|c| c.is_ready())
            .map(|c| c.coord)
    }

    /// One streaming step for an observer at world position
    /// (`observer_x`, `observer_z`): unload, apply finished jobs, refill the
    /// pending queue, start new jobs, stitch newly arrived chunks.
    pub fn update(&mut self, observer_x: f32, observer_z: f32) -> TickReport {
        let center = ChunkCoord::containing(observer_x.floor() as i32, observer_z.floor() as i32);
        let mut report = TickReport {
            center: Some(center),
            ..TickReport::default()
        };
        self.scheduler.set_center(center);

        report.unloaded = self.unload_far();
        for coord in self.scheduler.prune_inflight() {
            log::trace!(target: "stream", "cancelled in-flight ({}, {})", coord.cx, coord.cz);
        }

        let budget = self.scheduler.config().max_completions_per_tick;
        for out in self.workers.drain(budget) {
            let (done, ticket) = (out.coord(), out.ticket());
            log::trace!(target: "stream", "job {ticket} for ({}, {}) returned", done.cx, done.cz);
            match out {
                JobOut::Ready {
                    coord,
                    ticket,
                    chunk,
                    t_gen_ms,
                    t_light_ms,
                } => {
                    if !self.scheduler.complete(coord, ticket) || self.chunks.contains_key(&coord) {
                        report.discarded += 1;
                        continue;
                    }
                    log::debug!(
                        target: "stream",
                        "chunk ({}, {}) generated in {t_gen_ms} ms, seeded in {t_light_ms} ms",
                        coord.cx,
                        coord.cz
                    );
                    if self.insert_generated(*chunk) {
                        report.completed += 1;
                    }
                }
                JobOut::Failed {
                    coord,
                    ticket,
                    error,
                } => match self.scheduler.fail(coord, ticket) {
                    Some(attempts) => {
                        log::warn!(
                            target: "stream",
                            "chunk ({}, {}) attempt {attempts}: {error}",
                            coord.cx,
                            coord.cz
                        );
                        report.failed += 1;
                    }
                    None => report.discarded += 1,
                },
            }
        }

        let chunks = &self.chunks;
        report.dropped = self.scheduler.refresh_pending(|c| chunks.contains_key(&c));

        for (coord, ticket) in self.scheduler.dispatch() {
            if self.workers.submit(GenerateJob { coord, ticket }) {
                report.dispatched += 1;
            } else {
                log::warn!(target: "stream", "worker pool closed; dropping job for ({}, {})", coord.cx, coord.cz);
                self.scheduler.cancel(coord);
            }
        }

        let stitch_budget = self.scheduler.config().max_stitches_per_tick;
        while report.stitched < stitch_budget {
            let Some(coord) = self.relight.pop() else {
                break;
            };
            if self.stitch_and_publish(coord) {
                report.stitched += 1;
            }
        }
        report
    }

    /// Generates, seeds and stitches `coord` on the calling thread. Any job
    /// in flight for it is cancelled. Returns `Ok(false)` if it was already
    /// resident.
    pub fn load_now(&mut self, coord: ChunkCoord) -> Result<bool, GenerateError> {
        if self.chunks.contains_key(&coord) {
            return Ok(false);
        }
        self.scheduler.cancel(coord);
        let job = GenerateJob { coord, ticket: 0 };
        match process_generate_job(job, self.dims, self.generator.as_ref(), &self.engine) {
            JobOut::Ready { chunk, .. } => {
                if self.insert_generated(*chunk) {
                    self.relight.drop_chunk(coord);
                    self.stitch_and_publish(coord);
                }
                Ok(true)
            }
            JobOut::Failed { error, .. } => {
                let attempts = self.scheduler.record_failure(coord);
                log::warn!(target: "stream", "chunk ({}, {}) attempt {attempts}: {error}", coord.cx, coord.cz);
                Err(error)
            }
        }
    }

    pub fn stats(&self) -> WorldStats {
        let ready = self.chunks.values().filter(|c| c.is_ready()).count();
        let light_pending = self
            .chunks
            .values()
            .filter(|c| c.state() == ChunkState::LightPending)
            .count();
        let (jobs_queued, jobs_running) = self.workers.queue_counts();
        WorldStats {
            resident: self.chunks.len(),
            ready,
            light_pending,
            pending: self.scheduler.pending_len(),
            inflight: self.scheduler.inflight_len(),
            relight_queued: self.relight.len(),
            jobs_queued,
            jobs_running,
            counters: self.scheduler.counters(),
        }
    }

    fn unload_far(&mut self) -> usize {
        let far: Vec<ChunkCoord> = self
            .chunks
            .keys()
            .copied()
            .filter(|&c| self.scheduler.should_unload(c))
            .collect();
        for &coord in &far {
            self.chunks.remove(&coord);
            self.relight.drop_chunk(coord);
            self.scheduler.cancel(coord);
        }
        // Survivors give back the light the unloaded chunks lit them with.
        for &coord in &far {
            let stats = {
                let mut access = ResidentAccess::new(&mut self.chunks, self.dims);
                self.engine.release_chunk(&mut access, coord)
            };
            log::trace!(
                target: "stream",
                "unloaded ({}, {}): -{} +{} nodes",
                coord.cx,
                coord.cz,
                stats.nodes_removed,
                stats.nodes_added
            );
        }
        far.len()
    }

    fn insert_generated(&mut self, mut chunk: Chunk) -> bool {
        let coord = chunk.coord;
        if let Err(e) = chunk.mark_light_pending() {
            log::warn!(target: "stream", "discarding chunk ({}, {}): {e}", coord.cx, coord.cz);
            return false;
        }
        self.chunks.insert(coord, chunk);
        self.relight.push(coord);
        true
    }

    /// Exchanges border light with resident neighbors and moves the chunk to
    /// `Ready`.
    fn stitch_and_publish(&mut self, coord: ChunkCoord) -> bool {
        if self.chunks.get(&coord).map(Chunk::state) != Some(ChunkState::LightPending) {
            return false;
        }
        let stats: FloodStats = {
            let mut access = ResidentAccess::new(&mut self.chunks, self.dims);
            self.engine.stitch(&mut access, coord)
        };
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        if let Err(e) = chunk.mark_ready() {
            log::warn!(target: "stream", "chunk ({}, {}) not published: {e}", coord.cx, coord.cz);
            return false;
        }
        log::trace!(target: "lighting", "stitched ({}, {}): {} nodes", coord.cx, coord.cz, stats.nodes_added);
        true
    }
}

/// Neighbor chunks sharing a face with local column (`lx`, `lz`).
fn face_neighbors_touching(coord: ChunkCoord, lx: usize, lz: usize) -> Vec<ChunkCoord> {
    let last = CHUNK_SIZE - 1;
    let mut out = Vec::with_capacity(2);
    if lx == 0 {
        out.push(coord.offset(-1, 0));
    } else if lx == last {
        out.push(coord.offset(1, 0));
    }
    if lz == 0 {
        out.push(coord.offset(0, -1));
    } else if lz == last {
        out.push(coord.offset(0, 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_columns_touch_their_neighbors() {
        let c = ChunkCoord::new(2, -1);
        assert!(face_neighbors_touching(c, 5, 5).is_empty());
        assert_eq!(face_neighbors_touching(c, 0, 5), vec![ChunkCoord::new(1, -1)]);
        assert_eq!(
            face_neighbors_touching(c, 15, 0),
            vec![ChunkCoord::new(3, -1), ChunkCoord::new(2, -2)]
        );
        assert_eq!(face_neighbors_touching(c, 7, 15), vec![ChunkCoord::new(2, 0)]);
    }
}
