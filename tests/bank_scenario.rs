use chrono::Duration;

use realmkeeper::host::events::ItemUseEvent;
use realmkeeper::host::{CancelReason, Form, FormResponse, FormValue, ItemStack, WorldEvent, WorldView};
use realmkeeper::realm::bank::{self, BankAccount};

mod common;
use common::{realm, say};

const EMERALD: &str = "minecraft:emerald";

fn stored_balance(realm: &realmkeeper::realm::Realm<realmkeeper::host::SimulatedHost>, player: &str) -> i64 {
    let account: BankAccount = realm
        .store()
        .get(bank::NAMESPACE, player)
        .unwrap()
        .expect("account");
    account.balance
}

#[tokio::test]
async fn deposit_withdraw_down_to_the_minimum_balance() {
    let mut realm = realm(&["Steve"]);
    say(&mut realm, "Steve", "!은행 개설").await;
    assert_eq!(stored_balance(&realm, "Steve"), 0);

    realm.host().give_items("Steve", EMERALD, 100);
    say(&mut realm, "Steve", "!은행 입금 100").await;
    assert_eq!(stored_balance(&realm, "Steve"), 100);
    assert_eq!(realm.host().item_count("Steve", EMERALD), 0);

    say(&mut realm, "Steve", "!은행 출금 50").await;
    assert_eq!(stored_balance(&realm, "Steve"), 50);
    assert_eq!(realm.host().item_count("Steve", EMERALD), 50);

    say(&mut realm, "Steve", "!은행 출금 1,051").await;
    assert_eq!(stored_balance(&realm, "Steve"), 50);
    assert_eq!(realm.host().item_count("Steve", EMERALD), 50);
    let refusal = realm.host().last_message_for("Steve").unwrap();
    assert!(refusal.contains("출금 한도"), "{}", refusal);
    assert!(refusal.contains("1,050"), "{}", refusal);

    say(&mut realm, "Steve", "!은행 출금 1050").await;
    assert_eq!(stored_balance(&realm, "Steve"), -1000);
    assert_eq!(realm.host().item_count("Steve", EMERALD), 1100);

    say(&mut realm, "Steve", "!bank balance").await;
    assert!(realm.host().last_message_for("Steve").unwrap().contains("-1,000"));
}

#[tokio::test]
async fn deposit_needs_the_items_and_an_account() {
    let mut realm = realm(&["Steve"]);
    realm.host().give_items("Steve", EMERALD, 10);

    say(&mut realm, "Steve", "!은행 입금 5").await;
    assert!(realm.host().last_message_for("Steve").unwrap().contains("계좌가 없습니다"));

    say(&mut realm, "Steve", "!은행 개설").await;
    say(&mut realm, "Steve", "!은행 개설").await;
    assert!(realm.host().last_message_for("Steve").unwrap().contains("이미 계좌"));

    say(&mut realm, "Steve", "!은행 입금 11").await;
    assert!(realm.host().last_message_for("Steve").unwrap().contains("화폐가 부족"));
    assert_eq!(stored_balance(&realm, "Steve"), 0);
    assert_eq!(realm.host().item_count("Steve", EMERALD), 10);
}

#[tokio::test]
async fn failed_item_removal_leaves_the_balance_alone() {
    let mut realm = realm(&["Steve"]);
    say(&mut realm, "Steve", "!은행 개설").await;
    realm.host().give_items("Steve", EMERALD, 10);
    realm.host().fail_commands_starting_with("clear ");

    say(&mut realm, "Steve", "!은행 입금 10").await;
    assert_eq!(stored_balance(&realm, "Steve"), 0);
    assert_eq!(realm.host().item_count("Steve", EMERALD), 10);
}

#[tokio::test]
async fn loan_interest_accrues_lazily() {
    let mut realm = realm(&["Steve"]);
    say(&mut realm, "Steve", "!은행 개설").await;
    say(&mut realm, "Steve", "!은행 출금 1000").await;
    assert_eq!(stored_balance(&realm, "Steve"), -1000);

    realm.host().advance(Duration::days(1) + Duration::hours(1));
    // nothing is written until the account is touched
    assert_eq!(stored_balance(&realm, "Steve"), -1000);

    say(&mut realm, "Steve", "!은행 잔액").await;
    assert_eq!(stored_balance(&realm, "Steve"), -1020);
    assert!(realm.host().last_message_for("Steve").unwrap().contains("-1,020"));

    // the debt now sits below the floor, so nothing can be withdrawn
    say(&mut realm, "Steve", "!은행 출금 1").await;
    assert_eq!(stored_balance(&realm, "Steve"), -1020);
}

#[tokio::test]
async fn bank_card_opens_the_form_menu() {
    let mut realm = realm(&["Steve"]);
    let use_card = || {
        WorldEvent::ItemUse(ItemUseEvent {
            player: "Steve".into(),
            item: ItemStack::new("minecraft:paper", 1),
        })
    };

    realm.host().script_form("Steve", FormResponse::Message(true));
    realm.handle_event(use_card()).await;
    assert_eq!(stored_balance(&realm, "Steve"), 0);

    realm.host().give_items("Steve", EMERALD, 40);
    realm.host().script_form("Steve", FormResponse::Cancelled(CancelReason::UserBusy));
    realm.host().script_form("Steve", FormResponse::Action(0));
    realm
        .host()
        .script_form("Steve", FormResponse::Modal(vec![FormValue::Text("30".into())]));
    realm.handle_event(use_card()).await;

    assert_eq!(stored_balance(&realm, "Steve"), 30);
    assert_eq!(realm.host().item_count("Steve", EMERALD), 10);
    let forms = realm.host().shown_forms();
    assert_eq!(forms.len(), 4);
    assert!(matches!(forms[1].1, Form::Action { .. }));
    assert!(matches!(forms[3].1, Form::Modal { .. }));

    // closing the menu changes nothing
    realm.handle_event(use_card()).await;
    assert_eq!(stored_balance(&realm, "Steve"), 30);
}

#[tokio::test]
async fn bad_amounts_in_the_form_are_rejected() {
    let mut realm = realm(&["Steve"]);
    say(&mut realm, "Steve", "!은행 개설").await;
    realm.host().script_form("Steve", FormResponse::Action(1));
    realm
        .host()
        .script_form("Steve", FormResponse::Modal(vec![FormValue::Text("lots".into())]));
    say(&mut realm, "Steve", "!은행").await;
    assert_eq!(stored_balance(&realm, "Steve"), 0);
    assert!(realm.host().last_message_for("Steve").unwrap().contains("숫자"));
}
