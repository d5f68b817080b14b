//! Container locks.
//!
//! Using a lockable block while holding the key item toggles a lock owned by the
//! player. Locked containers cannot be opened or broken by anyone but the owner or
//! an admin. Records live in `locked_containers`, keyed by [`Location::key`].

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::errors::RealmResult;
use crate::config::Config;
use crate::host::events::BlockEvent;
use crate::host::{EventOutcome, Location, Messenger};
use crate::storage::RecordStore;

pub const NAMESPACE: &str = "locked_containers";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerLock {
    pub owner: String,
    pub block_type: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub locked_at: DateTime<Utc>,
}

pub fn lock_at(store: &RecordStore, location: &Location) -> RealmResult<Option<ContainerLock>> {
    Ok(store.get(NAMESPACE, &location.key())?)
}

fn holds_key(config: &Config, event: &BlockEvent) -> bool {
    event
        .held_item
        .as_ref()
        .is_some_and(|item| item.type_id == config.locks.key_item)
}

pub fn on_interact<M: Messenger>(
    host: &M,
    store: &RecordStore,
    config: &Config,
    event: &BlockEvent,
    now: DateTime<Utc>,
) -> RealmResult<EventOutcome> {
    if !config.locks.is_lockable(&event.block_type) {
        return Ok(EventOutcome::PASS);
    }
    let key = event.location.key();
    let existing = lock_at(store, &event.location)?;
    let player = event.player.as_str();
    let is_admin = config.world.is_admin(player);

    if holds_key(config, event) {
        match existing {
            None => {
                store.upsert(
                    NAMESPACE,
                    &key,
                    &ContainerLock {
                        owner: player.to_string(),
                        block_type: event.block_type.clone(),
                        locked_at: now,
                    },
                )?;
                info!("lock: {} locked {} at {}", player, event.block_type, key);
                host.tell(player, "§a상자를 잠갔습니다.");
            }
            Some(lock) if lock.owner == player || is_admin => {
                store.delete(NAMESPACE, &key)?;
                info!("lock: {} unlocked {} (owner {})", player, key, lock.owner);
                host.tell(player, "§e상자 잠금을 해제했습니다.");
            }
            Some(lock) => {
                host.tell(player, &format!("§c{}님이 잠근 상자입니다.", lock.owner));
            }
        }
        return Ok(EventOutcome::CANCEL);
    }

    match existing {
        Some(lock) if lock.owner != player && !is_admin => {
            host.tell(player, &format!("§c{}님이 잠근 상자입니다.", lock.owner));
            Ok(EventOutcome::CANCEL)
        }
        _ => Ok(EventOutcome::PASS),
    }
}

pub fn on_break<M: Messenger>(
    host: &M,
    store: &RecordStore,
    config: &Config,
    event: &BlockEvent,
) -> RealmResult<EventOutcome> {
    let Some(lock) = lock_at(store, &event.location)? else {
        return Ok(EventOutcome::PASS);
    };
    let player = event.player.as_str();
    if lock.owner != player && !config.world.is_admin(player) {
        host.tell(player, &format!("§c{}님이 잠근 상자는 부술 수 없습니다.", lock.owner));
        return Ok(EventOutcome::CANCEL);
    }
    store.delete(NAMESPACE, &event.location.key())?;
    info!("lock: {} broke locked {} (owner {})", player, event.location.key(), lock.owner);
    Ok(EventOutcome::PASS)
}
