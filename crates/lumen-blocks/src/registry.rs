use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use super::config::BlocksConfig;
use super::types::{Block, BlockId, LightBehavior, MAX_LIGHT};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub solid: bool,
    pub light: LightBehavior,
    pub emission: u8,
}

impl BlockType {
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.light.is_opaque()
    }
}

/// Immutable lookup table from block id to its definition.
///
/// Built once at startup and shared behind an `Arc`; nothing mutates it after
/// construction. Ids that were never registered behave as opaque,
/// non-emissive blocks.
#[derive(Clone, Debug, Default)]
pub struct BlockRegistry {
    pub blocks: Vec<Option<BlockType>>,
    pub by_name: HashMap<String, BlockId>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize).and_then(Option::as_ref)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn block_by_name(&self, name: &str) -> Option<Block> {
        self.id_by_name(name).map(Block::new)
    }

    #[inline]
    pub fn light_behavior(&self, block: Block) -> LightBehavior {
        self.get(block.id)
            .map(|ty| ty.light)
            .unwrap_or(LightBehavior::Opaque)
    }

    #[inline]
    pub fn is_opaque(&self, block: Block) -> bool {
        self.light_behavior(block).is_opaque()
    }

    #[inline]
    pub fn emission(&self, block: Block) -> u8 {
        self.get(block.id).map(|ty| ty.emission).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.blocks.iter().flatten()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(s)?;
        Self::from_configs(cfg)
    }

    pub fn from_configs(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry::new();
        for (pos, def) in cfg.blocks.into_iter().enumerate() {
            let id = match def.id {
                Some(id) => id,
                None => u16::try_from(pos)
                    .map_err(|_| format!("block '{}' has no id and too many blocks precede it", def.name))?,
            };
            let solid = def.solid.unwrap_or(true);
            let light = match def.light {
                Some(l) => LightBehavior::from(l),
                None if solid => LightBehavior::Opaque,
                None => LightBehavior::Transparent,
            };
            let emission = def.emission.unwrap_or(0);
            if emission > MAX_LIGHT {
                return Err(format!(
                    "block '{}' emission {} exceeds {}",
                    def.name, emission, MAX_LIGHT
                )
                .into());
            }
            if light.extra_attenuation() > MAX_LIGHT {
                return Err(format!(
                    "block '{}' attenuation {} exceeds {}",
                    def.name,
                    light.extra_attenuation(),
                    MAX_LIGHT
                )
                .into());
            }
            reg.insert(BlockType {
                id,
                name: def.name,
                solid,
                light,
                emission,
            })?;
        }
        match reg.get(0) {
            None => return Err("block id 0 (air) is not defined".into()),
            Some(air) if air.light != LightBehavior::Transparent || air.emission != 0 => {
                return Err(format!(
                    "block id 0 ('{}') must be transparent and non-emissive",
                    air.name
                )
                .into());
            }
            Some(_) => {}
        }
        Ok(reg)
    }

    fn insert(&mut self, ty: BlockType) -> Result<(), Box<dyn Error>> {
        if self.by_name.contains_key(&ty.name) {
            return Err(format!("duplicate block name '{}'", ty.name).into());
        }
        let idx = ty.id as usize;
        if self.blocks.len() <= idx {
            self.blocks.resize(idx + 1, None);
        }
        if let Some(prev) = &self.blocks[idx] {
            return Err(format!(
                "block id {} used by both '{}' and '{}'",
                ty.id, prev.name, ty.name
            )
            .into());
        }
        self.by_name.insert(ty.name.clone(), ty.id);
        self.blocks[idx] = Some(ty);
        Ok(())
    }

    /// Small default palette used when no block file is configured.
    pub fn builtin() -> Self {
        let defs: [(&str, bool, LightBehavior, u8); 9] = [
            ("air", false, LightBehavior::Transparent, 0),
            ("stone", true, LightBehavior::Opaque, 0),
            ("dirt", true, LightBehavior::Opaque, 0),
            ("grass", true, LightBehavior::Opaque, 0),
            ("water", false, LightBehavior::SemiTransparent { attenuation: 2 }, 0),
            ("leaves", true, LightBehavior::SemiTransparent { attenuation: 1 }, 0),
            ("glass", true, LightBehavior::Transparent, 0),
            ("torch", false, LightBehavior::Transparent, 14),
            ("glowstone", true, LightBehavior::Opaque, 15),
        ];
        let mut reg = BlockRegistry::new();
        for (i, (name, solid, light, emission)) in defs.into_iter().enumerate() {
            let ty = BlockType {
                id: i as BlockId,
                name: name.to_string(),
                solid,
                light,
                emission,
            };
            reg.by_name.insert(ty.name.clone(), ty.id);
            reg.blocks.push(Some(ty));
        }
        reg
    }
}
