use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen::{Block, BlockRegistry, ChunkCoord, ChunkState, LumenConfig, VoxelWorld, WorldDims};
use lumen_world::{ColumnSink, FlatGenerator, GenerateError, NoiseGenerator, TerrainGenerator, WorldGenConfig};
use proptest::prelude::*;

const DIMS: WorldDims = WorldDims::new(2);
const GROUND: i32 = 10;

const STONE: Block = Block::new(1);
const TORCH: Block = Block::new(7);

fn cfg(radius: i32) -> LumenConfig {
    let mut cfg = LumenConfig::default();
    cfg.stream.load_radius = radius;
    cfg.stream.unload_buffer = 1;
    cfg.stream.workers = 2;
    cfg
}

fn flat() -> FlatGenerator {
    FlatGenerator::new(GROUND, Block::new(3), Block::new(2), STONE)
}

fn world_with(generator: Arc<dyn TerrainGenerator>, radius: i32) -> VoxelWorld {
    VoxelWorld::new(Arc::new(BlockRegistry::builtin()), generator, DIMS, &cfg(radius)).unwrap()
}

fn flat_world(radius: i32) -> VoxelWorld {
    world_with(Arc::new(flat()), radius)
}

fn tick_until(world: &mut VoxelWorld, x: f32, z: f32, mut done: impl FnMut(&VoxelWorld) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while Instant::now() < deadline {
        world.update(x, z);
        if done(world) {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    panic!("world did not settle: {:?}", world.stats());
}

/// Fails for one chunk, delegates otherwise.
struct FailsAt {
    bad: ChunkCoord,
    inner: FlatGenerator,
}

impl TerrainGenerator for FailsAt {
    fn populate(&self, coord: ChunkCoord, out: &mut dyn ColumnSink) -> Result<(), GenerateError> {
        if coord == self.bad {
            return Err(GenerateError::Failed("bad seed".into()));
        }
        self.inner.populate(coord, out)
    }
}

#[test]
fn absent_chunks_read_as_dark_air() {
    let mut w = flat_world(1);
    assert_eq!(w.get_voxel(3, 5, 3), Block::AIR);
    assert_eq!(w.get_sky_light(3, 5, 3), 0);
    assert_eq!(w.get_block_light(3, 5, 3), 0);
    assert!(!w.set_voxel(3, 5, 3, STONE));
    assert!(!w.is_chunk_ready(0, 0));
    assert_eq!(w.chunk_state(0, 0), ChunkState::Empty);
    assert!(!w.consume_geometry_dirty(0, 0));
}

#[test]
fn out_of_range_height_is_safe() {
    let mut w = flat_world(0);
    w.load_now(ChunkCoord::new(0, 0)).unwrap();
    let top = DIMS.height() as i32;
    assert_eq!(w.get_voxel(0, -1, 0), Block::AIR);
    assert_eq!(w.get_voxel(0, top, 0), Block::AIR);
    assert_eq!(w.get_sky_light(0, top + 5, 0), 0);
    assert_eq!(w.get_block_light(0, -100, 0), 0);
    assert!(!w.set_voxel(0, -1, 0, STONE));
    assert!(!w.set_voxel(0, top, 0, STONE));
}

#[test]
fn load_now_publishes_a_lit_chunk() {
    let mut w = flat_world(0);
    assert_eq!(w.load_now(ChunkCoord::new(0, 0)), Ok(true));
    assert_eq!(w.load_now(ChunkCoord::new(0, 0)), Ok(false));
    assert!(w.is_chunk_ready(0, 0));
    assert_eq!(w.chunk_state(0, 0), ChunkState::Ready);
    assert_eq!(w.get_voxel(4, GROUND - 1, 4), Block::new(3));
    assert_eq!(w.get_sky_light(4, GROUND, 4), 15);
    assert_eq!(w.get_sky_light(4, GROUND - 1, 4), 0);
    // First publication asks for a mesh but not a lighting refresh.
    assert!(w.consume_geometry_dirty(0, 0));
    assert!(!w.consume_geometry_dirty(0, 0));
    assert!(!w.consume_lighting_dirty(0, 0));
}

#[test]
fn negative_coordinates_use_floor_division() {
    let mut w = flat_world(0);
    w.load_now(ChunkCoord::new(-1, -1)).unwrap();
    assert!(w.set_voxel(-1, GROUND, -1, STONE));
    assert_eq!(w.get_voxel(-1, GROUND, -1), STONE);
    assert_eq!(w.get_voxel(-16, GROUND - 1, -16), Block::new(3));
    // x = 0 belongs to chunk 0, which is not loaded.
    assert_eq!(w.get_voxel(0, GROUND - 1, -1), Block::AIR);
    assert!(!w.set_voxel(0, GROUND, -1, STONE));
    assert_eq!(w.get_sky_light(-1, GROUND - 1, -1), 0);
    assert_eq!(w.get_sky_light(-2, GROUND, -1), 15);
}

#[test]
fn edits_mark_geometry_on_shared_faces_only() {
    let mut w = flat_world(0);
    w.load_now(ChunkCoord::new(0, 0)).unwrap();
    w.load_now(ChunkCoord::new(1, 0)).unwrap();
    for cx in 0..2 {
        w.consume_geometry_dirty(cx, 0);
        w.consume_lighting_dirty(cx, 0);
    }

    assert!(w.set_voxel(5, GROUND, 5, STONE));
    assert!(w.consume_geometry_dirty(0, 0));
    assert!(!w.consume_geometry_dirty(1, 0));
    // Shape changes raise the geometry flag only.
    assert!(!w.consume_lighting_dirty(0, 0));

    assert!(w.set_voxel(15, GROUND, 5, STONE));
    assert!(w.consume_geometry_dirty(0, 0));
    assert!(w.consume_geometry_dirty(1, 0));

    // Same block again: accepted, nothing to rebuild.
    assert!(w.set_voxel(15, GROUND, 5, STONE));
    assert!(!w.consume_geometry_dirty(0, 0));
    assert!(!w.consume_geometry_dirty(1, 0));
}

#[test]
fn light_spilling_over_a_border_marks_lighting_only() {
    let mut w = flat_world(0);
    w.load_now(ChunkCoord::new(0, 0)).unwrap();
    w.load_now(ChunkCoord::new(1, 0)).unwrap();
    for cx in 0..2 {
        w.consume_geometry_dirty(cx, 0);
        w.consume_lighting_dirty(cx, 0);
    }
    assert!(w.set_voxel(14, GROUND, 8, TORCH));
    assert_eq!(w.get_block_light(14, GROUND, 8), 14);
    assert_eq!(w.get_block_light(16, GROUND, 8), 12);
    assert_eq!(w.get_block_light(20, GROUND, 8), 8);
    assert!(w.consume_lighting_dirty(1, 0));
    assert!(!w.consume_geometry_dirty(1, 0));
    assert!(w.consume_geometry_dirty(0, 0));
    assert!(!w.consume_lighting_dirty(0, 0));
}

#[test]
fn unloading_takes_back_light_and_reload_starts_clean() {
    let mut w = flat_world(0);
    for cx in 0..=2 {
        w.load_now(ChunkCoord::new(cx, 0)).unwrap();
    }
    assert!(w.set_voxel(14, GROUND, 8, TORCH));
    assert_eq!(w.get_block_light(16, GROUND, 8), 12);
    assert!(w.consume_lighting_dirty(1, 0));

    // Observer in chunk 2: chunk 0 is past the unload distance, chunk 1 is not.
    let report = w.update(40.0, 8.0);
    assert_eq!(report.unloaded, 1);
    assert!(!w.is_chunk_ready(0, 0));
    assert!(w.is_chunk_ready(1, 0));
    assert!(w.consume_lighting_dirty(1, 0));
    for y in 0..DIMS.height() as i32 {
        for z in 0..16 {
            for x in 16..48 {
                assert_eq!(w.get_block_light(x, y, z), 0, "({x}, {y}, {z})");
            }
        }
    }

    // Edits are not kept: the reloaded chunk has no torch and gets no light back.
    w.load_now(ChunkCoord::new(0, 0)).unwrap();
    let mut fresh = flat_world(0);
    for cx in 0..=2 {
        fresh.load_now(ChunkCoord::new(cx, 0)).unwrap();
    }
    for y in 0..DIMS.height() as i32 {
        for z in 0..16 {
            for x in 0..48 {
                assert_eq!(w.get_voxel(x, y, z), fresh.get_voxel(x, y, z));
                assert_eq!(w.get_block_light(x, y, z), 0, "({x}, {y}, {z})");
                assert_eq!(w.get_sky_light(x, y, z), fresh.get_sky_light(x, y, z), "sky ({x}, {y}, {z})");
            }
        }
    }
}

#[test]
fn torch_removal_across_border_leaves_no_light() {
    let mut w = flat_world(0);
    for cx in -1..=1 {
        w.load_now(ChunkCoord::new(cx, 0)).unwrap();
    }
    assert!(w.set_voxel(0, GROUND, 8, TORCH));
    assert!(w.set_voxel(16, GROUND + 1, 8, TORCH));
    assert_eq!(w.get_block_light(-1, GROUND, 8), 13);
    assert_eq!(w.get_block_light(15, GROUND + 1, 8), 13);
    assert_eq!(w.get_block_light(8, GROUND, 8), 6);
    assert!(w.set_voxel(0, GROUND, 8, Block::AIR));
    assert!(w.set_voxel(16, GROUND + 1, 8, Block::AIR));
    for y in 0..DIMS.height() as i32 {
        for z in 0..16 {
            for x in -16..32 {
                assert_eq!(w.get_block_light(x, y, z), 0, "({x}, {y}, {z})");
            }
        }
    }
}

#[test]
fn sky_shaft_opens_and_closes() {
    let mut w = flat_world(0);
    w.load_now(ChunkCoord::new(0, 0)).unwrap();
    for y in (GROUND - 4..GROUND).rev() {
        assert!(w.set_voxel(6, y, 6, Block::AIR));
    }
    for y in GROUND - 4..GROUND {
        assert_eq!(w.get_sky_light(6, y, 6), 15, "y={y}");
    }
    assert_eq!(w.get_sky_light(6, GROUND - 5, 6), 0);
    assert!(w.set_voxel(6, GROUND - 1, 6, STONE));
    for y in GROUND - 4..GROUND - 1 {
        assert_eq!(w.get_sky_light(6, y, 6), 0, "y={y}");
    }
}

#[test]
fn load_order_does_not_change_light() {
    let reg = Arc::new(BlockRegistry::builtin());
    let wcfg = WorldGenConfig {
        sections: 2,
        seed: 99,
        ..WorldGenConfig::default()
    };
    let generator: Arc<dyn TerrainGenerator> = Arc::new(NoiseGenerator::from_config(&wcfg, &reg).unwrap());
    let coords = [(0, 0), (1, 0), (0, 1), (1, 1), (-1, 0)];
    let mut a = VoxelWorld::new(reg.clone(), generator.clone(), DIMS, &cfg(0)).unwrap();
    let mut b = VoxelWorld::new(reg, generator, DIMS, &cfg(0)).unwrap();
    for &(cx, cz) in &coords {
        a.load_now(ChunkCoord::new(cx, cz)).unwrap();
    }
    for &(cx, cz) in coords.iter().rev() {
        b.load_now(ChunkCoord::new(cx, cz)).unwrap();
    }
    for y in 0..DIMS.height() as i32 {
        for z in 0..32 {
            for x in -16..32 {
                assert_eq!(a.get_sky_light(x, y, z), b.get_sky_light(x, y, z), "sky ({x}, {y}, {z})");
                assert_eq!(a.get_block_light(x, y, z), b.get_block_light(x, y, z));
            }
        }
    }
}

#[test]
fn streaming_loads_the_disc_and_unloads_behind() {
    let mut w = flat_world(2);
    tick_until(&mut w, 8.0, 8.0, |w| w.stats().ready == 13);
    for cz in -2..=2 {
        for cx in -2i32..=2 {
            let wanted = cx * cx + cz * cz <= 4;
            assert_eq!(w.is_chunk_ready(cx, cz), wanted, "({cx}, {cz})");
        }
    }
    assert_eq!(w.chunk_state(3, 0), ChunkState::Empty);
    assert_eq!(w.get_sky_light(-20, GROUND, 5), 15);

    // Move 10 chunks east; everything west of the new buffer unloads.
    let x = 8.0 + 16.0 * 10.0;
    tick_until(&mut w, x, 8.0, |w| w.is_chunk_ready(10, 0) && !w.is_chunk_ready(0, 0));
    tick_until(&mut w, x, 8.0, |w| w.stats().ready == 13 && w.stats().resident == 13);
    assert_eq!(w.get_voxel(8, GROUND - 1, 8), Block::AIR);
    assert_eq!(w.chunk_state(0, 0), ChunkState::Empty);
    assert!(w.is_chunk_ready(12, 0));
    let s = w.stats();
    assert_eq!(s.relight_queued, 0);
    assert!(s.counters.completed >= 26);
}

#[test]
fn failing_chunk_keeps_retrying_without_blocking_others() {
    let bad = ChunkCoord::new(1, 0);
    let generator = FailsAt { bad, inner: flat() };
    let mut w = world_with(Arc::new(generator), 1);
    tick_until(&mut w, 8.0, 8.0, |w| w.stats().ready == 4 && w.failure_count(1, 0) >= 3);
    assert!(!w.is_chunk_ready(1, 0));
    assert!(matches!(w.chunk_state(1, 0), ChunkState::Empty | ChunkState::Generating));
    assert_eq!(w.failure_count(0, 0), 0);
    assert!(w.stats().counters.failed >= 3);
    assert!(matches!(w.load_now(bad), Err(GenerateError::Failed(_))));
    // Neighbors of the hole still read sky light at the seam.
    assert_eq!(w.get_sky_light(15, GROUND, 3), 15);
}

#[test]
fn pending_queue_respects_cap_while_streaming() {
    let mut c = cfg(6);
    c.stream.max_pending = 5;
    c.stream.max_starts_per_tick = 2;
    let mut w = VoxelWorld::new(Arc::new(BlockRegistry::builtin()), Arc::new(flat()), DIMS, &c).unwrap();
    for i in 0..50 {
        let report = w.update(8.0 + i as f32 * 3.0, 8.0);
        assert!(w.stats().pending <= 5);
        assert!(report.dispatched <= 2);
    }
    assert!(w.stats().counters.dropped > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reads_never_panic(x in any::<i32>(), y in any::<i32>(), z in any::<i32>()) {
        let w = flat_world(0);
        prop_assert!(w.get_sky_light(x, y, z) <= 15);
        prop_assert!(w.get_block_light(x, y, z) <= 15);
        prop_assert_eq!(w.get_voxel(x, y, z), Block::AIR);
    }
}
