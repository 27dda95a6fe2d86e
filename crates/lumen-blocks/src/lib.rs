//! Block definitions, light behavior, and the block registry.
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;
pub mod types;

pub use registry::{BlockRegistry, BlockType};
pub use types::{Block, BlockId, LightBehavior, MAX_LIGHT};
