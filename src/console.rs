//! Console input for the `start` command.
//!
//! Each stdin line either stands for a player chatting (`Steve: !은행`) or is a
//! `/`-command that drives the simulated world:
//!
//! ```text
//! /join <p> [x y z [dim]]      /leave <p>
//! /tp <p> x y z [dim]          /give <p> <item> [n]       /hold <p> <item>
//! /use <p> <item>              /hit <attacker> <victim>   /die <p> [killer]
//! /interact <p> <block> x y z [dim]
//! /break <p> <block> x y z [dim]
//! /answer <p> yes|no|close|busy|button <n>|text <value>
//! /kill <entity id>            /who
//! ```

use crate::host::events::{BlockEvent, EntityDieEvent, EntityHurtEvent, EntityRef, ItemUseEvent};
use crate::host::{
    CancelReason, Dimension, EntityId, EventOutcome, FormResponse, FormValue, ItemStack, Location,
    Messenger, SimulatedHost, WorldEvent, WorldView,
};
use crate::realm::Realm;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleLine {
    Chat { player: String, text: String },
    Join { player: String, at: Location },
    Leave { player: String },
    Teleport { player: String, to: Location },
    Give { player: String, item: String, amount: u32 },
    Hold { player: String, item: String },
    Use { player: String, item: String },
    Hit { attacker: String, victim: String },
    Die { player: String, killer: Option<String> },
    Interact { player: String, block: String, at: Location },
    Break { player: String, block: String, at: Location },
    Answer { player: String, response: FormResponse },
    Kill { entity: String },
    Who,
}

fn spawn_point() -> Location {
    Location::new(Dimension::Overworld, 0, 64, 0)
}

fn location(args: &[&str]) -> Result<Location, String> {
    let coords: Vec<i32> = args
        .iter()
        .take(3)
        .map(|a| a.parse::<i32>().map_err(|_| format!("bad coordinate '{}'", a)))
        .collect::<Result<_, _>>()?;
    if coords.len() != 3 {
        return Err("expected x y z".to_string());
    }
    let dimension = match args.get(3) {
        Some(d) => Dimension::parse(d).ok_or_else(|| format!("unknown dimension '{}'", d))?,
        None => Dimension::Overworld,
    };
    Ok(Location::new(dimension, coords[0], coords[1], coords[2]))
}

/// Parse one console line. Empty lines parse to `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleLine>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        let (player, text) = line
            .split_once(':')
            .ok_or_else(|| "expected '<player>: <message>' or a /command".to_string())?;
        let player = player.trim();
        if player.is_empty() {
            return Err("missing player name".to_string());
        }
        return Ok(Some(ConsoleLine::Chat {
            player: player.to_string(),
            text: text.trim().to_string(),
        }));
    };
    let words: Vec<&str> = rest.split_whitespace().collect();
    let arg = |i: usize| -> Result<String, String> {
        words
            .get(i)
            .map(|s| s.to_string())
            .ok_or_else(|| format!("missing argument {} for /{}", i, words.first().unwrap_or(&"")))
    };
    let parsed = match words.first().copied().unwrap_or("") {
        "join" => ConsoleLine::Join {
            player: arg(1)?,
            at: if words.len() > 2 {
                location(&words[2..])?
            } else {
                spawn_point()
            },
        },
        "leave" => ConsoleLine::Leave { player: arg(1)? },
        "tp" => ConsoleLine::Teleport {
            player: arg(1)?,
            to: location(words.get(2..).unwrap_or(&[]))?,
        },
        "give" => ConsoleLine::Give {
            player: arg(1)?,
            item: arg(2)?,
            amount: match words.get(3) {
                Some(n) => n.parse().map_err(|_| format!("bad amount '{}'", n))?,
                None => 1,
            },
        },
        "hold" => ConsoleLine::Hold {
            player: arg(1)?,
            item: arg(2)?,
        },
        "use" => ConsoleLine::Use {
            player: arg(1)?,
            item: arg(2)?,
        },
        "hit" => ConsoleLine::Hit {
            attacker: arg(1)?,
            victim: arg(2)?,
        },
        "die" => ConsoleLine::Die {
            player: arg(1)?,
            killer: words.get(2).map(|s| s.to_string()),
        },
        "interact" | "break" => {
            let player = arg(1)?;
            let block = arg(2)?;
            let at = location(words.get(3..).unwrap_or(&[]))?;
            if words[0] == "interact" {
                ConsoleLine::Interact { player, block, at }
            } else {
                ConsoleLine::Break { player, block, at }
            }
        }
        "answer" => {
            let player = arg(1)?;
            let response = match words.get(2).copied() {
                Some("yes") => FormResponse::Message(true),
                Some("no") => FormResponse::Message(false),
                Some("close") => FormResponse::Cancelled(CancelReason::UserClosed),
                Some("busy") => FormResponse::Cancelled(CancelReason::UserBusy),
                Some("button") => {
                    let n = arg(3)?;
                    FormResponse::Action(n.parse().map_err(|_| format!("bad button '{}'", n))?)
                }
                Some("text") => FormResponse::Modal(vec![FormValue::Text(words[3..].join(" "))]),
                _ => return Err("expected yes|no|close|busy|button <n>|text <value>".to_string()),
            };
            ConsoleLine::Answer { player, response }
        }
        "kill" => ConsoleLine::Kill { entity: arg(1)? },
        "who" => ConsoleLine::Who,
        other => return Err(format!("unknown command /{}", other)),
    };
    Ok(Some(parsed))
}

/// Apply a console line to the simulated world. Lines that become world events
/// return the realm's outcome.
pub async fn apply(realm: &mut Realm<SimulatedHost>, line: ConsoleLine) -> Option<EventOutcome> {
    let event = match line {
        ConsoleLine::Chat { player, text } => {
            if !realm.host().is_online(&player) {
                realm.host().join(&player, spawn_point());
            }
            WorldEvent::chat(&player, &text)
        }
        ConsoleLine::Join { player, at } => {
            realm.host().join(&player, at);
            WorldEvent::PlayerJoin { player }
        }
        ConsoleLine::Leave { player } => {
            realm.host().leave(&player);
            WorldEvent::PlayerLeave { player }
        }
        ConsoleLine::Teleport { player, to } => {
            realm.host().move_player(&player, to);
            return None;
        }
        ConsoleLine::Give { player, item, amount } => {
            realm.host().give_items(&player, &item, amount);
            return None;
        }
        ConsoleLine::Hold { player, item } => {
            realm.host().hold(&player, Some(ItemStack::new(item, 1)));
            return None;
        }
        ConsoleLine::Use { player, item } => WorldEvent::ItemUse(ItemUseEvent {
            player,
            item: ItemStack::new(item, 1),
        }),
        ConsoleLine::Hit { attacker, victim } => WorldEvent::EntityHurt(EntityHurtEvent {
            victim: EntityRef::Player(victim),
            attacker: Some(EntityRef::Player(attacker)),
            damage: 1.0,
        }),
        ConsoleLine::Die { player, killer } => {
            let location = realm.host().player_location(&player).unwrap_or_else(spawn_point);
            WorldEvent::EntityDie(EntityDieEvent {
                victim: EntityRef::Player(player),
                killer: killer.map(EntityRef::Player),
                location,
            })
        }
        ConsoleLine::Interact { player, block, at } => {
            let held_item = realm.host().held_item(&player);
            WorldEvent::BlockInteract(BlockEvent {
                player,
                block_type: block,
                location: at,
                held_item,
            })
        }
        ConsoleLine::Break { player, block, at } => {
            let held_item = realm.host().held_item(&player);
            WorldEvent::BlockBreak(BlockEvent {
                player,
                block_type: block,
                location: at,
                held_item,
            })
        }
        ConsoleLine::Answer { player, response } => {
            realm.host().script_form(&player, response);
            return None;
        }
        ConsoleLine::Kill { entity } => {
            let id = EntityId(entity);
            if !realm.host().despawn_entity(&id) {
                println!("no entity {}", id);
            }
            return None;
        }
        ConsoleLine::Who => {
            let names = realm.host().player_names();
            realm.host().broadcast(&format!("§7online: {}", names.join(", ")));
            return None;
        }
    };
    Some(realm.handle_event(event).await)
}
