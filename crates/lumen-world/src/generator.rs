use std::error::Error;
use std::fmt;
use std::sync::Arc;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use lumen_blocks::{Block, BlockRegistry};

use crate::coords::{CHUNK_SIZE, ChunkCoord, WorldDims};
use crate::worldgen::{Mode, WorldGenConfig};

/// Write target handed to a generator; chunk-local coordinates.
pub trait ColumnSink {
    fn dims(&self) -> WorldDims;

    fn put(&mut self, lx: usize, y: usize, lz: usize, block: Block);

    /// Fill `y0..y1` of one column.
    fn put_span(&mut self, lx: usize, lz: usize, y0: usize, y1: usize, block: Block) {
        for y in y0..y1 {
            self.put(lx, y, lz, block);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateError {
    Failed(String),
    Panicked(String),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::Failed(msg) => write!(f, "generation failed: {msg}"),
            GenerateError::Panicked(msg) => write!(f, "generator panicked: {msg}"),
        }
    }
}

impl Error for GenerateError {}

/// Produces the voxels of one chunk column. Called from worker threads.
pub trait TerrainGenerator: Send + Sync {
    fn populate(&self, coord: ChunkCoord, out: &mut dyn ColumnSink) -> Result<(), GenerateError>;
}

#[derive(Clone, Copy, Debug)]
struct Layers {
    top: Block,
    subsoil: Block,
    deep: Block,
    topsoil: i32,
}

impl Layers {
    fn from_config(cfg: &WorldGenConfig, reg: &BlockRegistry) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            top: resolve(reg, &cfg.surface.top)?,
            subsoil: resolve(reg, &cfg.surface.subsoil)?,
            deep: resolve(reg, &cfg.surface.deep)?,
            topsoil: cfg.surface.topsoil_thickness.max(1),
        })
    }

    // Solid column up to (excluding) `height`.
    fn fill(&self, out: &mut dyn ColumnSink, lx: usize, lz: usize, height: usize) {
        if height == 0 {
            return;
        }
        let soil = (self.topsoil as usize).min(height);
        out.put_span(lx, lz, 0, height - soil, self.deep);
        out.put_span(lx, lz, height - soil, height - 1, self.subsoil);
        out.put(lx, height - 1, lz, self.top);
    }
}

fn resolve(reg: &BlockRegistry, name: &str) -> Result<Block, Box<dyn Error>> {
    reg.block_by_name(name)
        .ok_or_else(|| format!("unknown block '{name}' in worldgen config").into())
}

/// Constant-height terrain.
#[derive(Clone, Debug)]
pub struct FlatGenerator {
    ground: i32,
    layers: Layers,
}

impl FlatGenerator {
    pub fn new(ground: i32, top: Block, subsoil: Block, deep: Block) -> Self {
        Self {
            ground,
            layers: Layers {
                top,
                subsoil,
                deep,
                topsoil: 3,
            },
        }
    }

    pub fn from_config(cfg: &WorldGenConfig, reg: &BlockRegistry) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            ground: cfg.flat.ground,
            layers: Layers::from_config(cfg, reg)?,
        })
    }
}

impl TerrainGenerator for FlatGenerator {
    fn populate(&self, _coord: ChunkCoord, out: &mut dyn ColumnSink) -> Result<(), GenerateError> {
        let height = self.ground.clamp(0, out.dims().height() as i32) as usize;
        for lz in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                self.layers.fill(out, lx, lz, height);
            }
        }
        Ok(())
    }
}

/// Height-map terrain from 2D simplex noise, flooded up to a water line.
pub struct NoiseGenerator {
    terrain: FastNoiseLite,
    min_h: i32,
    max_h: i32,
    layers: Layers,
    water: Option<(i32, Block)>,
}

impl NoiseGenerator {
    pub fn from_config(cfg: &WorldGenConfig, reg: &BlockRegistry) -> Result<Self, Box<dyn Error>> {
        let mut terrain = FastNoiseLite::with_seed(cfg.seed);
        terrain.set_noise_type(Some(NoiseType::OpenSimplex2));
        terrain.set_frequency(Some(cfg.height.frequency));
        let world_height_f = cfg.dims().height() as f32;
        let water = if cfg.water.enable {
            let level = (world_height_f * cfg.water.level_ratio).round() as i32;
            Some((level, resolve(reg, &cfg.water.block)?))
        } else {
            None
        };
        Ok(Self {
            terrain,
            min_h: (world_height_f * cfg.height.min_y_ratio) as i32,
            max_h: (world_height_f * cfg.height.max_y_ratio) as i32,
            layers: Layers::from_config(cfg, reg)?,
            water,
        })
    }

    /// Number of solid voxels in the column at `(wx, wz)`.
    pub fn height_at(&self, wx: i32, wz: i32) -> i32 {
        let h = self.terrain.get_noise_2d(wx as f32, wz as f32);
        ((h + 1.0) * 0.5 * (self.max_h - self.min_h) as f32) as i32 + self.min_h
    }
}

impl TerrainGenerator for NoiseGenerator {
    fn populate(&self, coord: ChunkCoord, out: &mut dyn ColumnSink) -> Result<(), GenerateError> {
        let world_height = out.dims().height() as i32;
        if world_height < 2 {
            return Err(GenerateError::Failed(format!(
                "world height {world_height} too small for terrain"
            )));
        }
        let (x0, z0) = coord.origin();
        for lz in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let h = self
                    .height_at(x0 + lx as i32, z0 + lz as i32)
                    .clamp(1, world_height - 1);
                self.layers.fill(out, lx, lz, h as usize);
                if let Some((level, water)) = self.water {
                    let level = level.min(world_height);
                    if level > h {
                        out.put_span(lx, lz, h as usize, level as usize, water);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Generator selected by `cfg.mode`.
pub fn from_config(
    cfg: &WorldGenConfig,
    reg: &BlockRegistry,
) -> Result<Arc<dyn TerrainGenerator>, Box<dyn Error>> {
    let generator: Arc<dyn TerrainGenerator> = match cfg.mode {
        Mode::Flat => Arc::new(FlatGenerator::from_config(cfg, reg)?),
        Mode::Normal => Arc::new(NoiseGenerator::from_config(cfg, reg)?),
    };
    log::debug!(target: "worldgen", "generator mode={:?} seed={} sections={}", cfg.mode, cfg.seed, cfg.sections);
    Ok(generator)
}
