//! World coordinates, dimensions, and terrain generation.
#![forbid(unsafe_code)]

pub mod coords;
pub mod generator;
pub mod worldgen;

pub use coords::{CHUNK_SIZE, ChunkCoord, SECTION_SIZE, WorldDims, WorldPos};
pub use generator::{ColumnSink, FlatGenerator, GenerateError, NoiseGenerator, TerrainGenerator};
pub use worldgen::WorldGenConfig;
