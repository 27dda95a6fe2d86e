use lumen_blocks::{Block, BlockRegistry, MAX_LIGHT};
use lumen_chunk::{ChunkColumn, LightChannel};
use lumen_world::{CHUNK_SIZE, SECTION_SIZE, WorldDims};
use proptest::prelude::*;

const SECTIONS: usize = 3;
const HEIGHT: usize = SECTIONS * SECTION_SIZE;

#[derive(Clone, Debug)]
enum Op {
    Voxel(usize, usize, usize, u16),
    Sky(usize, usize, usize, u8),
    Blk(usize, usize, usize, u8),
}

fn op() -> impl Strategy<Value = Op> {
    let pos = (0..CHUNK_SIZE, 0..HEIGHT, 0..CHUNK_SIZE);
    prop_oneof![
        (pos.clone(), 0u16..4).prop_map(|((x, y, z), id)| Op::Voxel(x, y, z, id)),
        (pos.clone(), 0u8..=MAX_LIGHT).prop_map(|((x, y, z), l)| Op::Sky(x, y, z, l)),
        (pos, 0u8..=MAX_LIGHT).prop_map(|((x, y, z), l)| Op::Blk(x, y, z, l)),
    ]
}

fn idx(x: usize, y: usize, z: usize) -> usize {
    (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
}

proptest! {
    // Sparse storage reads back exactly like a dense array would
    #[test]
    fn sparse_matches_dense_model(ops in prop::collection::vec(op(), 1..200)) {
        let reg = BlockRegistry::builtin();
        let mut col = ChunkColumn::new(WorldDims::new(SECTIONS));
        let n = CHUNK_SIZE * CHUNK_SIZE * HEIGHT;
        let mut blocks = vec![Block::AIR; n];
        let mut sky = vec![MAX_LIGHT; n];
        let mut blk = vec![0u8; n];

        for op in &ops {
            match *op {
                Op::Voxel(x, y, z, id) => {
                    let change = col.set_voxel(x, y as i32, z, Block::new(id), &reg);
                    prop_assert_eq!(change.old, blocks[idx(x, y, z)]);
                    blocks[idx(x, y, z)] = Block::new(id);
                }
                Op::Sky(x, y, z, l) => {
                    let changed = col.set_sky_light(x, y as i32, z, l);
                    prop_assert_eq!(changed, sky[idx(x, y, z)] != l);
                    sky[idx(x, y, z)] = l;
                }
                Op::Blk(x, y, z, l) => {
                    let changed = col.set_block_light(x, y as i32, z, l);
                    prop_assert_eq!(changed, blk[idx(x, y, z)] != l);
                    blk[idx(x, y, z)] = l;
                }
            }
        }

        for y in 0..HEIGHT { for z in 0..CHUNK_SIZE { for x in 0..CHUNK_SIZE {
            let i = idx(x, y, z);
            prop_assert_eq!(col.get_voxel(x, y as i32, z), blocks[i]);
            prop_assert_eq!(col.light(LightChannel::Sky, x, y as i32, z), sky[i]);
            prop_assert_eq!(col.light(LightChannel::Block, x, y as i32, z), blk[i]);
        }}}
    }

    // A section is allocated only while it differs from the implicit default
    #[test]
    fn sections_allocated_only_when_needed(ops in prop::collection::vec(op(), 1..120)) {
        let reg = BlockRegistry::builtin();
        let mut col = ChunkColumn::new(WorldDims::new(SECTIONS));
        for op in &ops {
            match *op {
                Op::Voxel(x, y, z, id) => { col.set_voxel(x, y as i32, z, Block::new(id), &reg); }
                Op::Sky(x, y, z, l) => { col.set_sky_light(x, y as i32, z, l); }
                Op::Blk(x, y, z, l) => { col.set_block_light(x, y as i32, z, l); }
            }
        }
        for si in 0..SECTIONS {
            let mut differs = false;
            let mut any_block = false;
            for ly in 0..SECTION_SIZE { for z in 0..CHUNK_SIZE { for x in 0..CHUNK_SIZE {
                let y = (si * SECTION_SIZE + ly) as i32;
                let solid = !col.get_voxel(x, y, z).is_air();
                any_block |= solid;
                differs |= solid
                    || col.get_sky_light(x, y, z) != MAX_LIGHT
                    || col.get_block_light(x, y, z) != 0;
            }}}
            prop_assert_eq!(col.section(si).is_some(), differs);
            prop_assert_eq!(col.section_is_empty(si), !any_block);
        }
    }
}

#[test]
fn clearing_last_voxel_empties_section() {
    let reg = BlockRegistry::builtin();
    let mut col = ChunkColumn::new(WorldDims::new(2));
    let stone = reg.block_by_name("stone").unwrap();
    col.set_voxel(4, 20, 4, stone, &reg);
    col.set_voxel(5, 20, 4, stone, &reg);
    assert!(!col.section_is_empty(1));
    assert_eq!(col.section(1).map(|s| s.non_air_count()), Some(2));
    col.set_voxel(4, 20, 4, Block::AIR, &reg);
    assert!(!col.section_is_empty(1));
    col.set_voxel(5, 20, 4, Block::AIR, &reg);
    assert!(col.section_is_empty(1));
    assert!(col.section(1).is_none());
    assert!(col.section_is_empty(0));
}
