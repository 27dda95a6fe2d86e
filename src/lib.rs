//! Streaming voxel world with sky and block light propagation.
#![forbid(unsafe_code)]

pub mod config;
pub mod world;

pub use config::LumenConfig;
pub use lumen_blocks::{Block, BlockRegistry};
pub use lumen_chunk::ChunkState;
pub use lumen_world::{ChunkCoord, WorldDims};
pub use world::{TickReport, VoxelWorld, WorldStats};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Registry named by `cfg.blocks`, resolved against `base_dir`, or the
/// built-in palette.
pub fn load_registry(cfg: &LumenConfig, base_dir: &Path) -> Result<Arc<BlockRegistry>, Box<dyn Error>> {
    let reg = match &cfg.blocks {
        Some(rel) => BlockRegistry::load_from_path(base_dir.join(rel))?,
        None => BlockRegistry::builtin(),
    };
    log::info!(target: "world", "block registry: {} types", reg.len());
    Ok(Arc::new(reg))
}
