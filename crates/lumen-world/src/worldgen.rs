use serde::Deserialize;

use crate::coords::WorldDims;

#[derive(Clone, Debug, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default = "default_sections")]
    pub sections: usize,
    #[serde(default = "default_seed")]
    pub seed: i32,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default)]
    pub flat: Flat,
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default)]
    pub water: Water,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            sections: default_sections(),
            seed: default_seed(),
            mode: Mode::Normal,
            flat: Flat::default(),
            height: Height::default(),
            surface: Surface::default(),
            water: Water::default(),
        }
    }
}

impl WorldGenConfig {
    pub fn dims(&self) -> WorldDims {
        WorldDims::new(self.sections)
    }
}

fn default_sections() -> usize {
    16
}
fn default_seed() -> i32 {
    1337
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Normal,
    Flat,
}

fn default_mode() -> Mode {
    Mode::Normal
}

#[derive(Clone, Debug, Deserialize)]
pub struct Flat {
    #[serde(default = "default_flat_ground")]
    pub ground: i32,
}
fn default_flat_ground() -> i32 {
    64
}
impl Default for Flat {
    fn default() -> Self {
        Self {
            ground: default_flat_ground(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_height_freq")]
    pub frequency: f32,
    #[serde(default = "default_min_y_ratio")]
    pub min_y_ratio: f32,
    #[serde(default = "default_max_y_ratio")]
    pub max_y_ratio: f32,
}
fn default_height_freq() -> f32 {
    0.02
}
fn default_min_y_ratio() -> f32 {
    0.15
}
fn default_max_y_ratio() -> f32 {
    0.70
}
impl Default for Height {
    fn default() -> Self {
        Self {
            frequency: default_height_freq(),
            min_y_ratio: default_min_y_ratio(),
            max_y_ratio: default_max_y_ratio(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Surface {
    #[serde(default = "default_topsoil")]
    pub topsoil_thickness: i32,
    #[serde(default = "default_top_block")]
    pub top: String,
    #[serde(default = "default_subsoil_block")]
    pub subsoil: String,
    #[serde(default = "default_deep_block")]
    pub deep: String,
}
fn default_topsoil() -> i32 {
    3
}
fn default_top_block() -> String {
    "grass".into()
}
fn default_subsoil_block() -> String {
    "dirt".into()
}
fn default_deep_block() -> String {
    "stone".into()
}
impl Default for Surface {
    fn default() -> Self {
        Self {
            topsoil_thickness: default_topsoil(),
            top: default_top_block(),
            subsoil: default_subsoil_block(),
            deep: default_deep_block(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Water {
    #[serde(default = "default_water_enable")]
    pub enable: bool,
    #[serde(default = "default_water_level_ratio")]
    pub level_ratio: f32,
    #[serde(default = "default_water_block")]
    pub block: String,
}
fn default_water_enable() -> bool {
    true
}
fn default_water_level_ratio() -> f32 {
    0.33
}
fn default_water_block() -> String {
    "water".into()
}
impl Default for Water {
    fn default() -> Self {
        Self {
            enable: default_water_enable(),
            level_ratio: default_water_level_ratio(),
            block: default_water_block(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let cfg: WorldGenConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.sections, 16);
        assert_eq!(cfg.mode, Mode::Normal);
        assert_eq!(cfg.surface.top, "grass");
        assert!(cfg.water.enable);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let cfg: WorldGenConfig = toml::from_str(
            r#"
            mode = "flat"
            sections = 4
            [flat]
            ground = 10
            [water]
            enable = false
        "#,
        )
        .unwrap();
        assert_eq!(cfg.mode, Mode::Flat);
        assert_eq!(cfg.dims().height(), 64);
        assert_eq!(cfg.flat.ground, 10);
        assert!(!cfg.water.enable);
        assert_eq!(cfg.water.block, "water");
    }
}
