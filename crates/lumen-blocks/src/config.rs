use serde::Deserialize;

use crate::types::LightBehavior;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BlocksConfig {
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub solid: Option<bool>,
    #[serde(default)]
    pub light: Option<LightDef>,
    #[serde(default)]
    pub emission: Option<u8>,
}

impl BlockDef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            solid: None,
            light: None,
            emission: None,
        }
    }
}

// TOML form: light = { kind = "semi_transparent", attenuation = 2 }
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LightDef {
    Opaque,
    Transparent,
    SemiTransparent { attenuation: u8 },
}

impl From<LightDef> for LightBehavior {
    fn from(value: LightDef) -> Self {
        match value {
            LightDef::Opaque => LightBehavior::Opaque,
            LightDef::Transparent => LightBehavior::Transparent,
            LightDef::SemiTransparent { attenuation } => {
                LightBehavior::SemiTransparent { attenuation }
            }
        }
    }
}
