//! Custom enchantments.
//!
//! Enchantments are structured `(id, level)` attributes on an item. An item carries
//! at most one. Applying the same enchantment at a higher level replaces it; any
//! other application is refused. Lore lines are rendered from the attribute.

use log::info;
use thiserror::Error;

use super::errors::{RealmError, RealmResult};
use crate::host::{CustomEnchantment, ItemStack, WorldView};

/// Item families an enchantment can go on, matched by type id suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Weapon,
    Tool,
    Bow,
    Armor,
}

impl Slot {
    fn matches(self, type_id: &str) -> bool {
        let suffixes: &[&str] = match self {
            Slot::Weapon => &["_sword", "_axe"],
            Slot::Tool => &["_pickaxe", "_shovel", "_axe", "_hoe"],
            Slot::Bow => &[":bow", ":crossbow"],
            Slot::Armor => &["_helmet", "_chestplate", "_leggings", "_boots"],
        };
        suffixes.iter().any(|s| type_id.ends_with(s))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnchantDef {
    pub id: &'static str,
    pub display_name: &'static str,
    pub max_level: u8,
    pub slots: &'static [Slot],
}

pub const CATALOG: &[EnchantDef] = &[
    EnchantDef {
        id: "griswolds_curse",
        display_name: "그리스월드의 저주",
        max_level: 3,
        slots: &[Slot::Weapon],
    },
    EnchantDef {
        id: "vampiric",
        display_name: "흡혈",
        max_level: 3,
        slots: &[Slot::Weapon],
    },
    EnchantDef {
        id: "lightning",
        display_name: "번개",
        max_level: 2,
        slots: &[Slot::Weapon, Slot::Bow],
    },
    EnchantDef {
        id: "auto_smelt",
        display_name: "자동 제련",
        max_level: 1,
        slots: &[Slot::Tool],
    },
    EnchantDef {
        id: "vein_miner",
        display_name: "광맥 채굴",
        max_level: 3,
        slots: &[Slot::Tool],
    },
    EnchantDef {
        id: "thorns_aura",
        display_name: "가시 오라",
        max_level: 3,
        slots: &[Slot::Armor],
    },
];

pub fn lookup(id: &str) -> Option<&'static EnchantDef> {
    CATALOG.iter().find(|d| d.id == id)
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnchantError {
    #[error("알 수 없는 인챈트입니다: {0}")]
    Unknown(String),

    #[error("{id} 의 레벨은 1~{max} 이어야 합니다")]
    LevelOutOfRange { id: String, max: u8 },

    #[error("{id} 은(는) {item} 에 적용할 수 없습니다")]
    NotApplicable { id: String, item: String },

    #[error("이미 다른 인챈트({existing})가 있습니다")]
    AlreadyEnchanted { existing: String },

    #[error("현재 레벨({current}) 이하로는 적용할 수 없습니다")]
    NotAnUpgrade { current: u8 },
}

impl From<EnchantError> for RealmError {
    fn from(e: EnchantError) -> Self {
        match &e {
            EnchantError::Unknown(_) | EnchantError::LevelOutOfRange { .. } => {
                RealmError::Validation(e.to_string())
            }
            _ => RealmError::Precondition(e.to_string()),
        }
    }
}

/// Apply an enchantment, returning the updated item.
pub fn apply(item: &ItemStack, enchantment: CustomEnchantment) -> Result<ItemStack, EnchantError> {
    let def = lookup(&enchantment.id).ok_or_else(|| EnchantError::Unknown(enchantment.id.clone()))?;
    if enchantment.level == 0 || enchantment.level > def.max_level {
        return Err(EnchantError::LevelOutOfRange {
            id: def.id.to_string(),
            max: def.max_level,
        });
    }
    if !def.slots.iter().any(|s| s.matches(&item.type_id)) {
        return Err(EnchantError::NotApplicable {
            id: def.id.to_string(),
            item: item.type_id.clone(),
        });
    }
    if let Some(current) = item.enchantments.first() {
        if current.id != enchantment.id {
            return Err(EnchantError::AlreadyEnchanted {
                existing: current.id.clone(),
            });
        }
        if enchantment.level <= current.level {
            return Err(EnchantError::NotAnUpgrade {
                current: current.level,
            });
        }
    }
    let mut updated = item.clone();
    updated.enchantments = vec![enchantment];
    Ok(updated)
}

fn roman(level: u8) -> String {
    match level {
        1 => "I".into(),
        2 => "II".into(),
        3 => "III".into(),
        4 => "IV".into(),
        5 => "V".into(),
        n => n.to_string(),
    }
}

/// Display lines for an item's enchantments.
pub fn lore_lines(item: &ItemStack) -> Vec<String> {
    item.enchantments
        .iter()
        .map(|e| {
            let name = lookup(&e.id).map(|d| d.display_name).unwrap_or(e.id.as_str());
            format!("§7{} {}", name, roman(e.level))
        })
        .collect()
}

/// Enchant the item the player is holding.
pub fn enchant_held<W: WorldView>(world: &W, player: &str, id: &str, level: u8) -> RealmResult<ItemStack> {
    let held = world
        .held_item(player)
        .ok_or_else(|| RealmError::precondition("손에 아이템을 들고 있어야 합니다."))?;
    let updated = apply(
        &held,
        CustomEnchantment {
            id: id.to_string(),
            level,
        },
    )?;
    world.set_held_item(player, updated.clone())?;
    info!(target: "audit", "enchant: {} applied {} {} to {}", player, id, level, held.type_id);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sword() -> ItemStack {
        ItemStack::new("minecraft:diamond_sword", 1)
    }

    fn ench(id: &str, level: u8) -> CustomEnchantment {
        CustomEnchantment {
            id: id.into(),
            level,
        }
    }

    #[test]
    fn higher_level_replaces_lower() {
        let item = apply(&sword(), ench("vampiric", 1)).unwrap();
        let item = apply(&item, ench("vampiric", 3)).unwrap();
        assert_eq!(item.enchantments, vec![ench("vampiric", 3)]);
        assert_eq!(
            apply(&item, ench("vampiric", 2)),
            Err(EnchantError::NotAnUpgrade { current: 3 })
        );
        assert_eq!(
            apply(&item, ench("vampiric", 3)),
            Err(EnchantError::NotAnUpgrade { current: 3 })
        );
    }

    #[test]
    fn only_one_enchantment_per_item() {
        let item = apply(&sword(), ench("griswolds_curse", 2)).unwrap();
        assert!(matches!(
            apply(&item, ench("lightning", 1)),
            Err(EnchantError::AlreadyEnchanted { .. })
        ));
    }

    #[test]
    fn catalog_limits_apply() {
        assert!(matches!(
            apply(&sword(), ench("unknown", 1)),
            Err(EnchantError::Unknown(_))
        ));
        assert!(matches!(
            apply(&sword(), ench("vampiric", 4)),
            Err(EnchantError::LevelOutOfRange { max: 3, .. })
        ));
        assert!(matches!(
            apply(&sword(), ench("auto_smelt", 1)),
            Err(EnchantError::NotApplicable { .. })
        ));
        assert!(apply(&ItemStack::new("minecraft:iron_pickaxe", 1), ench("auto_smelt", 1)).is_ok());
    }

    #[test]
    fn lore_is_rendered_from_attributes() {
        let item = apply(&sword(), ench("griswolds_curse", 2)).unwrap();
        assert_eq!(lore_lines(&item), vec!["§7그리스월드의 저주 II".to_string()]);
    }
}
