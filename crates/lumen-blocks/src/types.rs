pub type BlockId = u16;

/// Highest light level stored in either channel.
pub const MAX_LIGHT: u8 = 15;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Block {
    pub id: BlockId,
}

impl Block {
    pub const AIR: Block = Block { id: 0 };

    #[inline]
    pub const fn new(id: BlockId) -> Self {
        Self { id }
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        self.id == 0
    }
}

impl From<BlockId> for Block {
    fn from(id: BlockId) -> Self {
        Self { id }
    }
}

/// How a block interacts with light passing into it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightBehavior {
    /// Never receives light; blocks both channels.
    #[default]
    Opaque,
    /// Light passes with the normal one-level step cost.
    Transparent,
    /// Light passes but loses `attenuation` extra levels on entry.
    SemiTransparent { attenuation: u8 },
}

impl LightBehavior {
    #[inline]
    pub const fn is_opaque(self) -> bool {
        matches!(self, LightBehavior::Opaque)
    }

    /// Extra levels lost when light enters a block with this behavior.
    /// Opaque blocks report `MAX_LIGHT`, which no light level can cross.
    #[inline]
    pub const fn extra_attenuation(self) -> u8 {
        match self {
            LightBehavior::Opaque => MAX_LIGHT,
            LightBehavior::Transparent => 0,
            LightBehavior::SemiTransparent { attenuation } => attenuation,
        }
    }
}
