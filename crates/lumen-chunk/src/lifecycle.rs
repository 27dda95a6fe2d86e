use std::error::Error;
use std::fmt;

use lumen_world::{ChunkCoord, GenerateError, TerrainGenerator, WorldDims};

use crate::column::ChunkColumn;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    Empty,
    Generating,
    Generated,
    LightPending,
    Ready,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    InvalidTransition {
        coord: ChunkCoord,
        from: ChunkState,
        to: ChunkState,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::InvalidTransition { coord, from, to } => write!(
                f,
                "chunk ({}, {}) cannot move from {:?} to {:?}",
                coord.cx, coord.cz, from, to
            ),
        }
    }
}

impl Error for LifecycleError {}

/// Rebuild requests for downstream consumers. Read-and-clear via `consume_*`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    pub needs_geometry_rebuild: bool,
    pub needs_lighting_update: bool,
}

#[derive(Clone, Debug)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub column: ChunkColumn,
    state: ChunkState,
    dirty: DirtyFlags,
    light_initialized: bool,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, dims: WorldDims) -> Self {
        Self {
            coord,
            column: ChunkColumn::new(dims),
            state: ChunkState::Empty,
            dirty: DirtyFlags::default(),
            light_initialized: false,
        }
    }

    #[inline]
    pub fn state(&self) -> ChunkState {
        self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == ChunkState::Ready
    }

    #[inline]
    pub fn light_initialized(&self) -> bool {
        self.light_initialized
    }

    pub fn set_light_initialized(&mut self, value: bool) {
        self.light_initialized = value;
    }

    fn transition(&mut self, from: ChunkState, to: ChunkState) -> Result<(), LifecycleError> {
        if self.state != from {
            return Err(LifecycleError::InvalidTransition {
                coord: self.coord,
                from: self.state,
                to,
            });
        }
        log::trace!(target: "lifecycle", "chunk ({}, {}) {:?} -> {:?}", self.coord.cx, self.coord.cz, from, to);
        self.state = to;
        Ok(())
    }

    pub fn begin_generation(&mut self) -> Result<(), LifecycleError> {
        self.transition(ChunkState::Empty, ChunkState::Generating)
    }

    pub fn finish_generation(&mut self) -> Result<(), LifecycleError> {
        self.transition(ChunkState::Generating, ChunkState::Generated)
    }

    /// Generation failed: drop partial contents and go back to `Empty`.
    pub fn fail_generation(&mut self) -> Result<(), LifecycleError> {
        self.transition(ChunkState::Generating, ChunkState::Empty)?;
        self.column = ChunkColumn::new(self.column.dims());
        self.light_initialized = false;
        Ok(())
    }

    pub fn mark_light_pending(&mut self) -> Result<(), LifecycleError> {
        self.transition(ChunkState::Generated, ChunkState::LightPending)
    }

    /// First publication: geometry must be built, lighting is current.
    pub fn mark_ready(&mut self) -> Result<(), LifecycleError> {
        self.transition(ChunkState::LightPending, ChunkState::Ready)?;
        self.dirty = DirtyFlags {
            needs_geometry_rebuild: true,
            needs_lighting_update: false,
        };
        Ok(())
    }

    /// Runs `generator` over a chunk in `Generating`, ending in `Generated`
    /// on success or `Empty` on failure.
    pub fn populate_with(&mut self, generator: &dyn TerrainGenerator) -> Result<(), GenerateError> {
        if self.state != ChunkState::Generating {
            return Err(GenerateError::Failed(format!(
                "chunk ({}, {}) is {:?}, not Generating",
                self.coord.cx, self.coord.cz, self.state
            )));
        }
        let res = generator.populate(self.coord, &mut self.column);
        // State was checked above, so neither transition can fail.
        let _ = match &res {
            Ok(()) => self.finish_generation(),
            Err(_) => self.fail_generation(),
        };
        res
    }

    #[inline]
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn mark_geometry_dirty(&mut self) {
        self.dirty.needs_geometry_rebuild = true;
    }

    pub fn mark_lighting_dirty(&mut self) {
        self.dirty.needs_lighting_update = true;
    }

    pub fn consume_geometry_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty.needs_geometry_rebuild)
    }

    pub fn consume_lighting_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty.needs_lighting_update)
    }
}
