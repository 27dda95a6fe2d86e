use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use lumen_lighting::LightConfig;
use lumen_runtime::StreamConfig;
use lumen_world::WorldGenConfig;

/// Top-level `lumen.toml`. Every section and field is optional.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LumenConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub lighting: LightConfig,
    #[serde(default)]
    pub world: WorldGenConfig,
    /// Block definitions file, relative to the config file. The built-in
    /// palette is used when absent.
    #[serde(default)]
    pub blocks: Option<String>,
}

impl LumenConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: LumenConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), Box<dyn Error>> {
        if self.world.sections == 0 {
            return Err("world.sections must be at least 1".into());
        }
        if self.stream.load_radius < 0 || self.stream.unload_buffer < 0 {
            return Err("stream.load_radius and stream.unload_buffer must not be negative".into());
        }
        if self.stream.max_inflight == 0 || self.stream.max_starts_per_tick == 0 {
            return Err("stream.max_inflight and stream.max_starts_per_tick must be positive".into());
        }
        Ok(())
    }
}

pub fn load_from_path(path: &Path) -> Result<LumenConfig, Box<dyn Error>> {
    let s = fs::read_to_string(path)
        .map_err(|e| format!("reading {}: {e}", path.display()))?;
    LumenConfig::from_toml_str(&s).map_err(|e| format!("{}: {e}", path.display()).into())
}
