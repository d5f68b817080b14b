//! PvP tombs.
//!
//! A player killed by another player gets a marker entity at the death spot, in
//! whatever dimension that was. Markers are tracked in a [`WatchRegistry`]; a
//! periodic check reports markers that disappeared (destroyed by someone) and
//! removes markers whose lifetime ran out. When the owner disconnects their markers
//! are removed and the watches dropped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use super::errors::RealmResult;
use crate::config::TombConfig;
use crate::host::events::{EntityDieEvent, EntityRef};
use crate::host::{EntityId, Host, Location};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TombWatch {
    pub owner: String,
    pub killer: String,
    pub location: Location,
    pub created_at: DateTime<Utc>,
}

/// What a periodic check found.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub disappeared: Vec<TombWatch>,
    pub expired: Vec<TombWatch>,
}

/// Watched marker entities, keyed by entity id.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    watches: HashMap<EntityId, TombWatch>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&mut self, id: EntityId, watch: TombWatch) {
        self.watches.insert(id, watch);
    }

    pub fn unwatch(&mut self, id: &EntityId) -> Option<TombWatch> {
        self.watches.remove(id)
    }

    pub fn owned_by(&self, owner: &str) -> Vec<EntityId> {
        let mut ids: Vec<_> = self
            .watches
            .iter()
            .filter(|(_, w)| w.owner == owner)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Check every watch against the world.
    pub fn check<H: Host>(&mut self, host: &H, config: &TombConfig, now: DateTime<Utc>) -> CheckReport {
        let mut report = CheckReport::default();
        let mut ids: Vec<EntityId> = self.watches.keys().cloned().collect();
        ids.sort();
        for id in ids {
            if !host.entity_exists(&id) {
                if let Some(watch) = self.watches.remove(&id) {
                    info!("tomb: marker of {} at {} disappeared", watch.owner, watch.location);
                    if host.is_online(&watch.owner) {
                        host.tell(&watch.owner, &format!("§c{}에 있던 무덤이 파괴되었습니다.", watch.location));
                    }
                    report.disappeared.push(watch);
                }
                continue;
            }
            let expired = self
                .watches
                .get(&id)
                .is_some_and(|w| now - w.created_at >= config.lifetime());
            if expired {
                host.despawn_entity(&id);
                if let Some(watch) = self.watches.remove(&id) {
                    debug!("tomb: marker of {} expired", watch.owner);
                    if host.is_online(&watch.owner) {
                        host.tell(&watch.owner, "§7무덤이 시간이 지나 사라졌습니다.");
                    }
                    report.expired.push(watch);
                }
            }
        }
        report
    }

    /// Despawn and forget every marker owned by a player who left.
    pub fn release_owner<H: Host>(&mut self, host: &H, owner: &str) -> usize {
        let ids = self.owned_by(owner);
        for id in &ids {
            self.watches.remove(id);
            host.despawn_entity(id);
        }
        if !ids.is_empty() {
            debug!("tomb: released {} markers of {}", ids.len(), owner);
        }
        ids.len()
    }
}

/// Spawn a tomb when a player dies to another player. Returns the marker id.
pub fn on_death<H: Host>(
    host: &H,
    config: &TombConfig,
    registry: &mut WatchRegistry,
    event: &EntityDieEvent,
) -> RealmResult<Option<EntityId>> {
    let Some(victim) = event.victim.player_name() else {
        return Ok(None);
    };
    let killer = match &event.killer {
        Some(EntityRef::Player(k)) if k != victim => k.clone(),
        _ => return Ok(None),
    };
    let name_tag = format!("§c{}의 무덤", victim);
    let id = match host.spawn_marker(&config.marker_entity, &name_tag, event.location) {
        Ok(id) => id,
        Err(e) => {
            warn!("tomb: could not spawn marker for {}: {}", victim, e);
            return Err(e.into());
        }
    };
    registry.watch(
        id.clone(),
        TombWatch {
            owner: victim.to_string(),
            killer: killer.clone(),
            location: event.location,
            created_at: host.now(),
        },
    );
    info!("tomb: {} killed {} at {}", killer, victim, event.location);
    host.tell(
        victim,
        &format!("§e{}님에게 사망했습니다. 무덤 위치: {}", killer, event.location),
    );
    Ok(Some(id))
}
