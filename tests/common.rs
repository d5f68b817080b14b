//! Shared fixtures for the integration tests.

use chrono::{DateTime, TimeZone, Utc};

use realmkeeper::config::Config;
use realmkeeper::host::{Dimension, Location, SimulatedHost, WorldEvent};
use realmkeeper::realm::Realm;
use realmkeeper::storage::{MemoryBackend, RecordStore};

#[allow(dead_code)]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn spawn() -> Location {
    Location::new(Dimension::Overworld, 0, 64, 0)
}

#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.world.admins = vec!["Admin".to_string()];
    config
}

/// A realm over an in-memory store and a simulated host frozen at [`start_time`].
#[allow(dead_code)]
pub fn realm_with(config: Config, players: &[&str]) -> Realm<SimulatedHost> {
    let host = SimulatedHost::new(start_time());
    for p in players {
        host.join(p, spawn());
    }
    Realm::new(host, RecordStore::new(MemoryBackend::new()), config)
}

#[allow(dead_code)]
pub fn realm(players: &[&str]) -> Realm<SimulatedHost> {
    realm_with(test_config(), players)
}

/// Run realm ticks, moving the host clock forward one tick length each time.
#[allow(dead_code)]
pub async fn run_ticks(realm: &mut Realm<SimulatedHost>, ticks: u64) {
    let step = chrono::Duration::milliseconds(realm.config().world.tick_ms as i64);
    for _ in 0..ticks {
        realm.host().advance(step);
        realm.tick().await;
    }
}

/// Run enough ticks to cover `seconds` of world time.
#[allow(dead_code)]
pub async fn run_seconds(realm: &mut Realm<SimulatedHost>, seconds: u64) {
    let ticks = realm.config().world.ticks_per_second() * seconds;
    run_ticks(realm, ticks).await;
}

#[allow(dead_code)]
pub async fn say(realm: &mut Realm<SimulatedHost>, player: &str, message: &str) -> bool {
    realm.handle_event(WorldEvent::chat(player, message)).await.cancel
}
