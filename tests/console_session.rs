use realmkeeper::console::{apply, parse_line};
use realmkeeper::host::{Dimension, Location, SimulatedHost, WorldView};
use realmkeeper::realm::Realm;

mod common;
use common::{realm, run_seconds};

async fn feed(realm: &mut Realm<SimulatedHost>, lines: &[&str]) {
    for line in lines {
        let parsed = parse_line(line).unwrap().expect("non-empty line");
        apply(realm, parsed).await;
    }
}

#[tokio::test]
async fn a_scripted_console_session() {
    let mut realm = realm(&[]);
    feed(
        &mut realm,
        &[
            "/join Steve",
            "/join Alex 40 70 40 nether",
            "/give Steve minecraft:emerald 64",
            "Steve: !은행 개설",
            "Steve: !은행 입금 60",
            "Steve: !워프 Alex",
            "Alex: !워프 수락",
        ],
    )
    .await;
    run_seconds(&mut realm, 3).await;

    assert_eq!(
        realm.host().player_location("Steve"),
        Some(Location::new(Dimension::Nether, 40, 70, 40))
    );
    assert_eq!(realm.host().item_count("Steve", "minecraft:emerald"), 4);
}

#[tokio::test]
async fn chatting_brings_a_player_online() {
    let mut realm = realm(&[]);
    feed(&mut realm, &["Newcomer: hi all"]).await;
    assert!(realm.host().is_online("Newcomer"));

    feed(&mut realm, &["/leave Newcomer"]).await;
    assert!(!realm.host().is_online("Newcomer"));
}

#[tokio::test]
async fn console_answers_drive_forms() {
    let mut realm = realm(&["Steve"]);
    feed(
        &mut realm,
        &["/answer Steve yes", "/use Steve minecraft:paper"],
    )
    .await;
    assert_eq!(realm.store().len("bank_accounts").unwrap(), 1);
}
