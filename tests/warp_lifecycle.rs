use chrono::Duration;

use realmkeeper::host::{Dimension, Location, WorldEvent, WorldView};

mod common;
use common::{realm, run_seconds, say};

#[tokio::test]
async fn a_responder_holds_one_pending_request() {
    let mut realm = realm(&["Steve", "Notch", "Alex"]);

    assert!(say(&mut realm, "Steve", "!워프 Alex").await);
    say(&mut realm, "Notch", "!warp Alex").await;

    let pending = realm.warp().pending_for("Alex").expect("pending");
    assert_eq!(pending.requester, "Steve");
    assert!(realm
        .host()
        .last_message_for("Notch")
        .unwrap()
        .contains("이미 다른 워프 요청"));
}

#[tokio::test]
async fn warping_to_yourself_or_offline_players_is_refused() {
    let mut realm = realm(&["Steve"]);
    say(&mut realm, "Steve", "!워프 Steve").await;
    assert!(realm.warp().pending_for("Steve").is_none());
    say(&mut realm, "Steve", "!워프 Herobrine").await;
    assert!(realm
        .host()
        .last_message_for("Steve")
        .unwrap()
        .contains("접속 중이 아닙니다"));
    assert!(realm.warp().pending_for("Herobrine").is_none());
}

#[tokio::test]
async fn requests_expire_after_the_timeout() {
    let mut realm = realm(&["Steve", "Alex"]);
    say(&mut realm, "Steve", "!워프 Alex").await;

    run_seconds(&mut realm, 59).await;
    assert!(realm.warp().pending_for("Alex").is_some());
    run_seconds(&mut realm, 1).await;
    assert!(realm.warp().pending_for("Alex").is_none());
    assert!(realm.host().last_message_for("Steve").unwrap().contains("만료"));

    say(&mut realm, "Alex", "!워프 수락").await;
    assert!(realm
        .host()
        .last_message_for("Alex")
        .unwrap()
        .contains("받은 워프 요청이 없습니다"));
}

#[tokio::test]
async fn a_stale_expiry_timer_leaves_a_newer_request_alone() {
    let mut realm = realm(&["Steve", "Notch", "Alex"]);
    say(&mut realm, "Steve", "!워프 Alex").await;
    run_seconds(&mut realm, 10).await;
    say(&mut realm, "Alex", "!워프 거절").await;
    assert!(realm.host().last_message_for("Steve").unwrap().contains("거절"));

    run_seconds(&mut realm, 20).await;
    say(&mut realm, "Notch", "!워프 Alex").await;

    // Steve's timer fires at 60s; Notch's request was sent at 30s.
    run_seconds(&mut realm, 31).await;
    assert_eq!(realm.warp().pending_for("Alex").unwrap().requester, "Notch");

    run_seconds(&mut realm, 30).await;
    assert!(realm.warp().pending_for("Alex").is_none());
}

#[tokio::test]
async fn accepted_warp_teleports_after_the_delay_and_starts_the_cooldown() {
    let mut realm = realm(&["Steve", "Alex"]);
    let destination = Location::new(Dimension::Nether, 100, 70, -20);
    realm.host().move_player("Alex", destination);

    say(&mut realm, "Steve", "!워프 Alex").await;
    say(&mut realm, "Alex", "!워프 수락").await;
    assert!(realm.warp().pending_for("Alex").is_none());
    assert!(realm.warp().in_transit("Steve"));

    run_seconds(&mut realm, 2).await;
    assert_ne!(realm.host().player_location("Steve"), Some(destination));
    let now = realm.host().now();
    assert_eq!(
        realm.cooldowns().remaining("Steve", "warp", now),
        Duration::zero()
    );

    run_seconds(&mut realm, 1).await;
    assert_eq!(realm.host().player_location("Steve"), Some(destination));
    assert!(!realm.warp().in_transit("Steve"));
    let now = realm.host().now();
    assert_eq!(
        realm.cooldowns().remaining("Steve", "warp", now),
        Duration::seconds(300)
    );

    // back home and try again straight away
    say(&mut realm, "Steve", "!워프 Alex").await;
    assert!(realm.warp().pending_for("Alex").is_none());
    assert!(realm.host().last_message_for("Steve").unwrap().contains("300초"));

    realm.host().advance(Duration::seconds(120));
    say(&mut realm, "Steve", "!워프 Alex").await;
    assert!(realm.host().last_message_for("Steve").unwrap().contains("180초"));

    realm.host().advance(Duration::seconds(180));
    say(&mut realm, "Steve", "!워프 Alex").await;
    assert!(realm.warp().pending_for("Alex").is_some());
}

#[tokio::test]
async fn leaving_cancels_pending_and_in_flight_warps() {
    let mut realm = realm(&["Steve", "Alex", "Notch"]);
    say(&mut realm, "Steve", "!워프 Alex").await;
    say(&mut realm, "Alex", "!워프 수락").await;
    say(&mut realm, "Notch", "!워프 Steve").await;
    assert!(realm.warp().pending_for("Steve").is_some());

    realm.host().leave("Alex");
    realm
        .handle_event(WorldEvent::PlayerLeave {
            player: "Alex".into(),
        })
        .await;
    assert!(!realm.warp().in_transit("Steve"));
    assert!(realm.host().last_message_for("Steve").unwrap().contains("이동이 취소"));

    realm.host().leave("Steve");
    realm
        .handle_event(WorldEvent::PlayerLeave {
            player: "Steve".into(),
        })
        .await;
    assert!(realm.warp().pending_for("Steve").is_none());

    // nothing left to fire
    run_seconds(&mut realm, 5).await;
    assert_eq!(realm.host().player_location("Notch"), Some(common::spawn()));
}

#[tokio::test]
async fn failed_teleport_does_not_start_the_cooldown() {
    let mut realm = realm(&["Steve", "Alex"]);
    realm.host().fail_commands_starting_with("tp ");
    say(&mut realm, "Steve", "!워프 Alex").await;
    say(&mut realm, "Alex", "!워프 수락").await;
    run_seconds(&mut realm, 3).await;

    let now = realm.host().now();
    assert_eq!(realm.cooldowns().remaining("Steve", "warp", now), Duration::zero());
    assert!(realm
        .host()
        .last_message_for("Steve")
        .unwrap()
        .contains("작업을 처리하지 못했습니다"));
}

#[tokio::test]
async fn a_requester_waits_on_one_warp_at_a_time() {
    let mut realm = realm(&["Steve", "Alex", "Notch"]);
    let nether = Location::new(Dimension::Nether, 10, 70, 10);
    realm.host().move_player("Alex", nether);
    realm
        .host()
        .move_player("Notch", Location::new(Dimension::TheEnd, 50, 70, 50));

    say(&mut realm, "Steve", "!워프 Alex").await;
    say(&mut realm, "Steve", "!워프 Notch").await;
    assert!(realm.warp().pending_for("Notch").is_none());
    assert!(realm
        .host()
        .last_message_for("Steve")
        .unwrap()
        .contains("아직 대기 중"));

    say(&mut realm, "Alex", "!워프 수락").await;
    run_seconds(&mut realm, 2).await;
    // still counting down towards Alex
    say(&mut realm, "Steve", "!워프 Notch").await;
    assert!(realm.warp().pending_for("Notch").is_none());
    say(&mut realm, "Notch", "!워프 수락").await;
    assert!(realm
        .host()
        .last_message_for("Notch")
        .unwrap()
        .contains("받은 워프 요청이 없습니다"));

    run_seconds(&mut realm, 1).await;
    assert_eq!(realm.host().player_location("Steve"), Some(nether));
    assert!(realm
        .host()
        .last_message_for("Steve")
        .unwrap()
        .contains("Alex님에게 이동했습니다"));
}
