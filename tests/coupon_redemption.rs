use realmkeeper::host::WorldView;
use realmkeeper::realm::coupon;

mod common;
use common::{realm, say};

const DIAMOND: &str = "minecraft:diamond";

#[tokio::test]
async fn each_player_redeems_a_code_once() {
    let mut realm = realm(&["Admin", "Steve", "Alex"]);
    say(&mut realm, "Admin", "!쿠폰 생성 spring minecraft:diamond 3").await;
    assert!(realm.host().last_message_for("Admin").unwrap().contains("SPRING"));

    say(&mut realm, "Steve", "!쿠폰 Spring").await;
    assert_eq!(realm.host().item_count("Steve", DIAMOND), 3);
    assert!(coupon::has_redeemed(realm.store(), "Steve", "SPRING").unwrap());

    say(&mut realm, "Steve", "!쿠폰 SPRING").await;
    assert_eq!(realm.host().item_count("Steve", DIAMOND), 3);
    assert!(realm.host().last_message_for("Steve").unwrap().contains("이미 사용한 쿠폰"));

    say(&mut realm, "Alex", "!coupon spring").await;
    assert_eq!(realm.host().item_count("Alex", DIAMOND), 3);
}

#[tokio::test]
async fn only_admins_manage_coupons() {
    let mut realm = realm(&["Admin", "Steve"]);
    say(&mut realm, "Steve", "!쿠폰 생성 FREE minecraft:diamond 64").await;
    assert!(realm.host().last_message_for("Steve").unwrap().contains("권한이 없습니다"));
    assert!(coupon::list(realm.store()).unwrap().is_empty());

    say(&mut realm, "Admin", "!쿠폰 생성 minecraft:apple 2").await;
    let coupons = coupon::list(realm.store()).unwrap();
    assert_eq!(coupons.len(), 1);
    let (code, reward) = &coupons[0];
    assert_eq!(code.len(), 8);
    assert_eq!(reward.item, "minecraft:apple");
    assert_eq!(reward.created_by, "Admin");

    say(&mut realm, "Steve", &format!("!쿠폰 삭제 {}", code)).await;
    assert_eq!(coupon::list(realm.store()).unwrap().len(), 1);

    say(&mut realm, "Admin", &format!("!쿠폰 삭제 {}", code.to_lowercase())).await;
    assert!(coupon::list(realm.store()).unwrap().is_empty());

    say(&mut realm, "Steve", &format!("!쿠폰 {}", code)).await;
    assert!(realm.host().last_message_for("Steve").unwrap().contains("존재하지 않는 쿠폰"));
}

#[tokio::test]
async fn duplicate_codes_are_refused() {
    let mut realm = realm(&["Admin"]);
    say(&mut realm, "Admin", "!쿠폰 생성 GIFT minecraft:diamond 1").await;
    say(&mut realm, "Admin", "!쿠폰 생성 gift minecraft:emerald 9").await;
    assert!(realm.host().last_message_for("Admin").unwrap().contains("이미 있는 쿠폰"));
    let coupons = coupon::list(realm.store()).unwrap();
    assert_eq!(coupons.len(), 1);
    assert_eq!(coupons[0].1.item, DIAMOND);
}

#[tokio::test]
async fn a_failed_give_does_not_use_up_the_coupon() {
    let mut realm = realm(&["Admin", "Steve"]);
    say(&mut realm, "Admin", "!쿠폰 생성 GIFT minecraft:diamond 1").await;
    realm.host().fail_commands_starting_with("give ");

    say(&mut realm, "Steve", "!쿠폰 GIFT").await;
    assert!(!coupon::has_redeemed(realm.store(), "Steve", "GIFT").unwrap());

    realm.host().clear_command_failures();
    say(&mut realm, "Steve", "!쿠폰 GIFT").await;
    assert!(coupon::has_redeemed(realm.store(), "Steve", "GIFT").unwrap());
    assert_eq!(realm.host().item_count("Steve", DIAMOND), 1);
}
