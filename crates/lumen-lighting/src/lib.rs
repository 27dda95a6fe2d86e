//! Sky and block light propagation across resident chunks.
#![forbid(unsafe_code)]

mod access;
mod engine;
mod queue;

pub use access::{ChunkAccess, LightAccess, ResidentAccess};
pub use engine::{FloodStats, LightConfig, LightEngine};
pub use lumen_chunk::LightChannel;
pub use queue::RelightQueue;
