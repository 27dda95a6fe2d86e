use serde::Deserialize;

/// Streaming knobs. Distances are in chunks.
#[derive(Clone, Debug, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_load_radius")]
    pub load_radius: i32,
    /// Extra distance past `load_radius` before a resident chunk unloads.
    #[serde(default = "default_unload_buffer")]
    pub unload_buffer: i32,
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    #[serde(default = "default_max_starts_per_tick")]
    pub max_starts_per_tick: usize,
    #[serde(default = "default_max_completions_per_tick")]
    pub max_completions_per_tick: usize,
    #[serde(default = "default_max_stitches_per_tick")]
    pub max_stitches_per_tick: usize,
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
    /// Generation threads; 0 uses the available parallelism.
    #[serde(default)]
    pub workers: usize,
}

fn default_load_radius() -> i32 {
    8
}
fn default_unload_buffer() -> i32 {
    2
}
fn default_max_pending() -> usize {
    256
}
fn default_max_starts_per_tick() -> usize {
    8
}
fn default_max_completions_per_tick() -> usize {
    16
}
fn default_max_stitches_per_tick() -> usize {
    8
}
fn default_max_inflight() -> usize {
    32
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            load_radius: default_load_radius(),
            unload_buffer: default_unload_buffer(),
            max_pending: default_max_pending(),
            max_starts_per_tick: default_max_starts_per_tick(),
            max_completions_per_tick: default_max_completions_per_tick(),
            max_stitches_per_tick: default_max_stitches_per_tick(),
            max_inflight: default_max_inflight(),
            workers: 0,
        }
    }
}

impl StreamConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }

    /// Squared unload distance.
    pub fn unload_distance_sq(&self) -> i64 {
        let d = i64::from(self.load_radius.max(0)) + i64::from(self.unload_buffer.max(0));
        d * d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: StreamConfig = toml::from_str("load_radius = 3\nworkers = 2\n").unwrap();
        assert_eq!(cfg.load_radius, 3);
        assert_eq!(cfg.worker_count(), 2);
        assert_eq!(cfg.unload_buffer, 2);
        assert_eq!(cfg.max_pending, 256);
        assert_eq!(cfg.unload_distance_sq(), 25);
    }

    #[test]
    fn zero_workers_uses_machine_parallelism() {
        let cfg = StreamConfig::default();
        assert!(cfg.worker_count() >= 1);
    }
}
