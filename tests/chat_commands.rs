use chrono::Duration;

use realmkeeper::host::{ItemStack, WorldView};
use realmkeeper::realm::CooldownGate;

mod common;
use common::{realm, realm_with, say, start_time, test_config};

#[tokio::test]
async fn ordinary_chat_passes_through() {
    let mut realm = realm(&["Steve"]);
    assert!(!say(&mut realm, "Steve", "안녕하세요 여러분").await);
    assert!(!say(&mut realm, "Steve", "!notacommand").await);
    assert!(realm.host().messages_for("Steve").is_empty());
}

#[tokio::test]
async fn help_lists_every_feature() {
    let mut realm = realm(&["Steve"]);
    assert!(say(&mut realm, "Steve", "!도움말").await);
    let lines = realm.host().messages_for("Steve");
    for keyword in ["은행", "길드", "워프", "쿠폰"] {
        assert!(lines.iter().any(|l| l.contains(keyword)), "missing {}", keyword);
    }
}

#[tokio::test]
async fn malformed_commands_answer_with_usage() {
    let mut realm = realm(&["Steve"]);
    assert!(say(&mut realm, "Steve", "!은행 입금").await);
    let reply = realm.host().last_message_for("Steve").unwrap();
    assert!(reply.contains("사용법"), "{}", reply);

    assert!(say(&mut realm, "Steve", "!은행 입금 -5").await);
    assert!(realm.host().last_message_for("Steve").unwrap().contains("1 이상"));
}

#[tokio::test]
async fn the_prefix_is_configurable() {
    let mut config = test_config();
    config.commands.prefix = ".".to_string();
    let mut realm = realm_with(config, &["Steve"]);
    assert!(!say(&mut realm, "Steve", "!도움말").await);
    assert!(say(&mut realm, "Steve", ".help").await);
    assert!(realm
        .host()
        .messages_for("Steve")
        .iter()
        .any(|l| l.contains(".은행")));
}

#[tokio::test]
async fn disabled_features_refuse_commands() {
    let mut config = test_config();
    config.bank.enabled = false;
    let mut realm = realm_with(config, &["Steve"]);
    assert!(say(&mut realm, "Steve", "!은행 개설").await);
    assert!(realm
        .host()
        .last_message_for("Steve")
        .unwrap()
        .contains("사용할 수 없는 기능"));
    assert_eq!(realm.store().len("bank_accounts").unwrap(), 0);
}

#[tokio::test]
async fn admins_enchant_the_held_item() {
    let mut realm = realm(&["Admin", "Steve"]);
    realm
        .host()
        .hold("Admin", Some(ItemStack::new("minecraft:diamond_sword", 1)));
    realm
        .host()
        .hold("Steve", Some(ItemStack::new("minecraft:diamond_sword", 1)));

    say(&mut realm, "Steve", "!인챈트 vampiric 2").await;
    assert!(realm.host().held_item("Steve").unwrap().enchantments.is_empty());
    assert!(realm.host().last_message_for("Steve").unwrap().contains("권한"));

    say(&mut realm, "Admin", "!enchant VAMPIRIC 2").await;
    let sword = realm.host().held_item("Admin").unwrap();
    assert_eq!(sword.enchantments.len(), 1);
    assert_eq!(sword.enchantments[0].id, "vampiric");
    assert!(realm.host().last_message_for("Admin").unwrap().contains("흡혈 II"));

    say(&mut realm, "Admin", "!인챈트 auto_smelt 1").await;
    assert_eq!(realm.host().held_item("Admin").unwrap().enchantments.len(), 1);
    say(&mut realm, "Admin", "!인챈트 vampiric 9").await;
    assert_eq!(realm.host().held_item("Admin").unwrap().enchantments[0].level, 2);
}

#[test]
fn cooldown_remaining_never_grows_while_waiting() {
    let mut gate = CooldownGate::new();
    let t0 = start_time();
    gate.try_acquire("Steve", "warp", Duration::seconds(30), t0).unwrap();

    let mut last = gate.remaining("Steve", "warp", t0);
    for step in 1..=40 {
        let now = t0 + Duration::seconds(step);
        let left = gate.remaining("Steve", "warp", now);
        assert!(left <= last);
        assert!(left >= Duration::zero());
        last = left;
    }
    assert_eq!(last, Duration::zero());
    assert!(gate.try_acquire("Steve", "warp", Duration::seconds(30), t0 + Duration::seconds(40)).is_ok());
}

#[test]
fn a_refused_acquire_does_not_extend_the_cooldown() {
    let mut gate = CooldownGate::new();
    let t0 = start_time();
    gate.try_acquire("Steve", "warp", Duration::seconds(30), t0).unwrap();
    assert!(gate
        .try_acquire("Steve", "warp", Duration::seconds(300), t0 + Duration::seconds(10))
        .is_err());
    assert_eq!(
        gate.remaining("Steve", "warp", t0 + Duration::seconds(10)),
        Duration::seconds(20)
    );
    // other actors and actions are independent
    assert!(gate.check("Alex", "warp", t0).is_ok());
    assert!(gate.check("Steve", "bank", t0).is_ok());
}
