//! Sparse chunk column storage and chunk lifecycle.
#![forbid(unsafe_code)]

mod column;
mod lifecycle;
mod section;

pub use column::{ChunkColumn, LightChannel, VoxelChange};
pub use lifecycle::{Chunk, ChunkState, DirtyFlags, LifecycleError};
pub use section::{SECTION_VOLUME, Section};
