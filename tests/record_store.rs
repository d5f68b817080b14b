use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use realmkeeper::realm::bank::{self, BankAccount};
use realmkeeper::storage::{JsonFileBackend, PropertyBackend, RecordStore, Table};

#[test]
fn records_survive_reopening_the_file_backend() {
    let dir = TempDir::new().unwrap();
    let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    {
        let store = RecordStore::new(JsonFileBackend::open(dir.path()).unwrap());
        bank::open_account(&store, "Steve", created).unwrap();
        store
            .update(bank::NAMESPACE, |accounts: &mut Table<BankAccount>| {
                accounts.get_mut("Steve").unwrap().balance = -250;
                Ok::<_, realmkeeper::storage::StoreError>(())
            })
            .unwrap();
    }

    let store = RecordStore::new(JsonFileBackend::open(dir.path()).unwrap());
    let account: BankAccount = store.get(bank::NAMESPACE, "Steve").unwrap().unwrap();
    assert_eq!(account.balance, -250);
    assert_eq!(account.created_at, created);
    assert_eq!(account.last_interest_time, created);
    assert_eq!(store.namespaces().unwrap(), vec![bank::NAMESPACE]);
}

#[test]
fn timestamps_are_stored_as_epoch_millis() {
    let dir = TempDir::new().unwrap();
    let backend = JsonFileBackend::open(dir.path()).unwrap();
    let store = RecordStore::new(backend);
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    bank::open_account(&store, "Alex", created).unwrap();

    let raw = store
        .backend()
        .get_property("realm:bank_accounts")
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["Alex"]["createdAt"], serde_json::json!(created.timestamp_millis()));
    assert_eq!(value["Alex"]["balance"], serde_json::json!(0));
}

#[test]
fn each_key_holds_one_record() {
    let dir = TempDir::new().unwrap();
    let store = RecordStore::new(JsonFileBackend::open(dir.path()).unwrap());
    store.upsert("guilds", "Knights", &1u32).unwrap();
    store.upsert("guilds", "Knights", &2u32).unwrap();
    store.upsert("guilds", "Rangers", &3u32).unwrap();
    assert_eq!(store.len("guilds").unwrap(), 2);
    assert_eq!(store.get::<u32>("guilds", "Knights").unwrap(), Some(2));
}

#[test]
fn corrupted_file_slot_loads_empty_and_keeps_the_raw_text() {
    let dir = TempDir::new().unwrap();
    let backend = JsonFileBackend::open(dir.path()).unwrap();
    backend.set_property("realm:coupons", "[[[ truncated").unwrap();
    let store = RecordStore::new(backend);

    assert_eq!(store.len("coupons").unwrap(), 0);
    let quarantined: Vec<String> = store
        .backend()
        .property_keys()
        .unwrap()
        .into_iter()
        .filter(|k| k.starts_with("realm:coupons.corrupt."))
        .collect();
    assert_eq!(quarantined.len(), 1);
    assert_eq!(
        store.backend().get_property(&quarantined[0]).unwrap().as_deref(),
        Some("[[[ truncated")
    );

    // the namespace is usable again after the next write
    store.upsert("coupons", "SPRING", &serde_json::json!({"amount": 1})).unwrap();
    assert_eq!(store.len("coupons").unwrap(), 1);
}

#[cfg(feature = "sled-backend")]
#[test]
fn sled_backend_round_trip() {
    use realmkeeper::storage::SledBackend;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("world.sled");
    {
        let store = RecordStore::new(SledBackend::open(&path).unwrap());
        store.upsert("locked_containers", "overworld:1,2,3", &"Steve").unwrap();
    }
    let store = RecordStore::new(SledBackend::open(&path).unwrap());
    assert_eq!(
        store.get::<String>("locked_containers", "overworld:1,2,3").unwrap().as_deref(),
        Some("Steve")
    );
    assert!(store.delete("locked_containers", "overworld:1,2,3").unwrap());
    assert_eq!(store.len("locked_containers").unwrap(), 0);
}
