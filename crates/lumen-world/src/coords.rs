use serde::{Deserialize, Serialize};

/// Horizontal footprint of a chunk column, in voxels.
pub const CHUNK_SIZE: usize = 16;
/// Edge length of a cubic section, in voxels.
pub const SECTION_SIZE: usize = 16;

const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Chunk containing the world-space column `(wx, wz)`.
    #[inline]
    pub const fn containing(wx: i32, wz: i32) -> Self {
        Self {
            cx: wx.div_euclid(CHUNK_SIZE_I32),
            cz: wz.div_euclid(CHUNK_SIZE_I32),
        }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx) - i64::from(other.cx);
        let dz = i64::from(self.cz) - i64::from(other.cz);
        dx * dx + dz * dz
    }

    /// World-space coordinates of local voxel (0, _, 0).
    #[inline]
    pub fn origin(self) -> (i32, i32) {
        (self.cx * CHUNK_SIZE_I32, self.cz * CHUNK_SIZE_I32)
    }

    /// The four chunks sharing a vertical face with this one (-X, +X, -Z, +Z).
    pub fn face_neighbors(self) -> [ChunkCoord; 4] {
        [
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(0, 1),
        ]
    }
}

impl From<(i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkCoord> for (i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cz)
    }
}

/// Integer world-space voxel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    #[inline]
    pub fn chunk(self) -> ChunkCoord {
        ChunkCoord::containing(self.x, self.z)
    }

    /// Chunk-local `(lx, lz)`, always in `0..CHUNK_SIZE`.
    #[inline]
    pub fn local_xz(self) -> (usize, usize) {
        (
            self.x.rem_euclid(CHUNK_SIZE_I32) as usize,
            self.z.rem_euclid(CHUNK_SIZE_I32) as usize,
        )
    }

    #[inline]
    pub fn from_local(coord: ChunkCoord, lx: usize, y: usize, lz: usize) -> Self {
        let (x0, z0) = coord.origin();
        Self {
            x: x0 + lx as i32,
            y: y as i32,
            z: z0 + lz as i32,
        }
    }

    /// Face-adjacent positions: +Y, -Y, +X, -X, +Z, -Z.
    #[inline]
    pub fn neighbors(self) -> [WorldPos; 6] {
        [
            self.offset(0, 1, 0),
            self.offset(0, -1, 0),
            self.offset(1, 0, 0),
            self.offset(-1, 0, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }
}

impl From<(i32, i32, i32)> for WorldPos {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

/// Vertical extent of every chunk column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldDims {
    pub sections: usize,
}

impl Default for WorldDims {
    fn default() -> Self {
        Self { sections: 16 }
    }
}

impl WorldDims {
    #[inline]
    pub const fn new(sections: usize) -> Self {
        Self { sections }
    }

    #[inline]
    pub const fn height(self) -> usize {
        self.sections * SECTION_SIZE
    }

    #[inline]
    pub fn contains_y(self, y: i32) -> bool {
        y >= 0 && (y as usize) < self.height()
    }
}
