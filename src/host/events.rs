//! Typed world events delivered by the host event bus, one variant per event kind.

use super::{ItemStack, Location};

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEvent {
    pub player: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemUseEvent {
    pub player: String,
    pub item: ItemStack,
}

/// Block interaction, break or placement by a player.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEvent {
    pub player: String,
    pub block_type: String,
    pub location: Location,
    pub held_item: Option<ItemStack>,
}

/// Either a player (by name) or some other entity (by type id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    Player(String),
    Entity { type_id: String },
}

impl EntityRef {
    pub fn player_name(&self) -> Option<&str> {
        match self {
            EntityRef::Player(name) => Some(name),
            EntityRef::Entity { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityHurtEvent {
    pub victim: EntityRef,
    pub attacker: Option<EntityRef>,
    pub damage: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDieEvent {
    pub victim: EntityRef,
    pub killer: Option<EntityRef>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Chat(ChatEvent),
    ItemUse(ItemUseEvent),
    BlockInteract(BlockEvent),
    BlockBreak(BlockEvent),
    BlockPlace(BlockEvent),
    EntityHurt(EntityHurtEvent),
    EntityDie(EntityDieEvent),
    PlayerJoin { player: String },
    PlayerLeave { player: String },
    PlayerSpawn { player: String, initial: bool },
}

impl WorldEvent {
    pub fn chat(player: &str, message: &str) -> Self {
        WorldEvent::Chat(ChatEvent {
            player: player.to_string(),
            message: message.to_string(),
        })
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorldEvent::Chat(_) => "chat",
            WorldEvent::ItemUse(_) => "item_use",
            WorldEvent::BlockInteract(_) => "block_interact",
            WorldEvent::BlockBreak(_) => "block_break",
            WorldEvent::BlockPlace(_) => "block_place",
            WorldEvent::EntityHurt(_) => "entity_hurt",
            WorldEvent::EntityDie(_) => "entity_die",
            WorldEvent::PlayerJoin { .. } => "player_join",
            WorldEvent::PlayerLeave { .. } => "player_leave",
            WorldEvent::PlayerSpawn { .. } => "player_spawn",
        }
    }
}

/// What the handler decided about the host's default behaviour for the event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    pub cancel: bool,
}

impl EventOutcome {
    pub const PASS: EventOutcome = EventOutcome { cancel: false };
    pub const CANCEL: EventOutcome = EventOutcome { cancel: true };
}
