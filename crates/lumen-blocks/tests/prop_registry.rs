use lumen_blocks::config::{BlockDef, BlocksConfig, LightDef};
use lumen_blocks::{Block, BlockRegistry, LightBehavior, MAX_LIGHT};
use proptest::prelude::*;

fn air() -> BlockDef {
    BlockDef {
        name: "air".into(),
        id: Some(0),
        solid: Some(false),
        light: Some(LightDef::Transparent),
        emission: Some(0),
    }
}

#[test]
fn parses_toml_light_kinds() {
    let reg = BlockRegistry::from_toml_str(
        r#"
        [[blocks]]
        name = "air"
        id = 0
        solid = false
        light = { kind = "transparent" }

        [[blocks]]
        name = "stone"
        id = 1

        [[blocks]]
        name = "water"
        id = 2
        solid = false
        light = { kind = "semi_transparent", attenuation = 2 }

        [[blocks]]
        name = "lamp"
        id = 3
        emission = 15
    "#,
    )
    .expect("registry");
    assert_eq!(reg.len(), 4);
    assert_eq!(reg.light_behavior(Block::AIR), LightBehavior::Transparent);
    assert!(reg.is_opaque(Block::new(1)));
    assert_eq!(
        reg.light_behavior(Block::new(2)),
        LightBehavior::SemiTransparent { attenuation: 2 }
    );
    assert_eq!(reg.emission(Block::new(3)), 15);
    assert!(reg.is_opaque(Block::new(3)));
}

#[test]
fn unknown_ids_are_opaque_and_dark() {
    let reg = BlockRegistry::builtin();
    let unknown = Block::new(999);
    assert!(reg.get(999).is_none());
    assert!(reg.is_opaque(unknown));
    assert_eq!(reg.emission(unknown), 0);
}

#[test]
fn builtin_palette_has_expected_light_sources() {
    let reg = BlockRegistry::builtin();
    let torch = reg.block_by_name("torch").unwrap();
    let glow = reg.block_by_name("glowstone").unwrap();
    assert_eq!(reg.emission(torch), 14);
    assert!(!reg.is_opaque(torch));
    assert_eq!(reg.emission(glow), 15);
    assert!(reg.is_opaque(glow));
    assert_eq!(reg.id_by_name("air"), Some(0));
}

#[test]
fn rejects_duplicate_ids_and_names() {
    let mut stone = BlockDef::named("stone");
    stone.id = Some(1);
    let mut dup_id = BlockDef::named("dirt");
    dup_id.id = Some(1);
    let cfg = BlocksConfig {
        blocks: vec![air(), stone.clone(), dup_id],
    };
    assert!(BlockRegistry::from_configs(cfg).is_err());

    let mut dup_name = BlockDef::named("stone");
    dup_name.id = Some(2);
    let cfg = BlocksConfig {
        blocks: vec![air(), stone, dup_name],
    };
    assert!(BlockRegistry::from_configs(cfg).is_err());
}

#[test]
fn requires_transparent_air() {
    let cfg = BlocksConfig {
        blocks: vec![BlockDef::named("stone")],
    };
    let err = BlockRegistry::from_configs(cfg).unwrap_err();
    assert!(err.to_string().contains("id 0"));

    let cfg = BlocksConfig { blocks: vec![] };
    assert!(BlockRegistry::from_configs(cfg).is_err());
}

#[test]
fn omitted_light_follows_solidity() {
    let mut glass = BlockDef::named("pane");
    glass.solid = Some(false);
    let cfg = BlocksConfig {
        blocks: vec![air(), glass],
    };
    let reg = BlockRegistry::from_configs(cfg).unwrap();
    assert_eq!(reg.light_behavior(Block::new(1)), LightBehavior::Transparent);
}

proptest! {
    #[test]
    fn emission_is_validated(emission in 0u8..=255) {
        let mut lamp = BlockDef::named("lamp");
        lamp.emission = Some(emission);
        let cfg = BlocksConfig { blocks: vec![air(), lamp] };
        let res = BlockRegistry::from_configs(cfg);
        if emission <= MAX_LIGHT {
            let reg = res.unwrap();
            prop_assert_eq!(reg.emission(Block::new(1)), emission);
        } else {
            prop_assert!(res.is_err());
        }
    }

    #[test]
    fn attenuation_is_validated(att in 0u8..=64) {
        let mut fog = BlockDef::named("fog");
        fog.solid = Some(false);
        fog.light = Some(LightDef::SemiTransparent { attenuation: att });
        let cfg = BlocksConfig { blocks: vec![air(), fog] };
        let res = BlockRegistry::from_configs(cfg);
        prop_assert_eq!(res.is_ok(), att <= MAX_LIGHT);
    }

    // Ids default to list position when omitted
    #[test]
    fn implicit_ids_follow_position(n in 1usize..20) {
        let mut blocks = vec![air()];
        for i in 0..n {
            blocks.push(BlockDef::named(format!("b{i}")));
        }
        let reg = BlockRegistry::from_configs(BlocksConfig { blocks }).unwrap();
        for i in 0..n {
            prop_assert_eq!(reg.id_by_name(&format!("b{i}")), Some((i + 1) as u16));
        }
    }
}
