//! Reward coupons.
//!
//! Admins create codes that hand out an item stack. Each player may redeem a given
//! code once; different players redeem independently. Codes live in `coupons`
//! (code -> coupon) and redemptions in `coupon_usage` (player -> codes).

use chrono::{DateTime, Utc};
use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::errors::{RealmError, RealmResult};
use crate::config::CouponConfig;
use crate::host::{quoted, run_checked, CommandContext, Host};
use crate::storage::{RecordStore, Table};
use crate::validation::normalize_coupon_code;

pub const NAMESPACE: &str = "coupons";
pub const USAGE_NAMESPACE: &str = "coupon_usage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub item: String,
    pub amount: u32,
    pub created_by: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

fn random_code(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

fn valid_item_id(item: &str) -> bool {
    !item.is_empty()
        && item
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '.'))
}

/// Create a coupon. Without a code a random unused one is generated.
pub fn create(
    store: &RecordStore,
    config: &CouponConfig,
    admin: &str,
    code: Option<&str>,
    item: &str,
    amount: u32,
    now: DateTime<Utc>,
) -> RealmResult<String> {
    if amount == 0 {
        return Err(RealmError::validation("수량은 1 이상이어야 합니다."));
    }
    if !valid_item_id(item) {
        return Err(RealmError::validation(format!("잘못된 아이템 ID입니다: {}", item)));
    }
    let requested = code.map(normalize_coupon_code).transpose()?;
    let code = store.update(NAMESPACE, |coupons: &mut Table<Coupon>| {
        let code = match requested {
            Some(code) => {
                if coupons.contains_key(&code) {
                    return Err(RealmError::precondition(format!("이미 있는 쿠폰 코드입니다: {}", code)));
                }
                code
            }
            None => loop {
                let candidate = random_code(config.random_code_length);
                if !coupons.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        coupons.insert(
            code.clone(),
            Coupon {
                item: item.to_string(),
                amount,
                created_by: admin.to_string(),
                created_at: now,
            },
        );
        Ok(code)
    })?;
    info!(target: "audit", "coupon created: {} -> {} x{} by {}", code, item, amount, admin);
    Ok(code)
}

pub fn delete(store: &RecordStore, admin: &str, code: &str) -> RealmResult<String> {
    let code = normalize_coupon_code(code)?;
    if !store.delete(NAMESPACE, &code)? {
        return Err(RealmError::precondition(format!("존재하지 않는 쿠폰입니다: {}", code)));
    }
    info!(target: "audit", "coupon deleted: {} by {}", code, admin);
    Ok(code)
}

pub fn list(store: &RecordStore) -> RealmResult<Vec<(String, Coupon)>> {
    Ok(store.load::<Coupon>(NAMESPACE)?.into_iter().collect())
}

pub fn has_redeemed(store: &RecordStore, player: &str, code: &str) -> RealmResult<bool> {
    let used: Option<Vec<String>> = store.get(USAGE_NAMESPACE, player)?;
    Ok(used.is_some_and(|codes| codes.iter().any(|c| c == code)))
}

/// Hand out the coupon reward, then record the redemption.
pub async fn redeem<H: Host>(host: &H, store: &RecordStore, player: &str, code: &str) -> RealmResult<Coupon> {
    let code = normalize_coupon_code(code)?;
    let coupon: Coupon = store
        .get(NAMESPACE, &code)?
        .ok_or_else(|| RealmError::precondition(format!("존재하지 않는 쿠폰입니다: {}", code)))?;
    if has_redeemed(store, player, &code)? {
        return Err(RealmError::precondition("이미 사용한 쿠폰입니다."));
    }

    let give = format!("give {} {} {}", quoted(player), coupon.item, coupon.amount);
    run_checked(host, &CommandContext::Player(player.to_string()), &give).await?;

    store.update(USAGE_NAMESPACE, |usage: &mut Table<Vec<String>>| {
        let codes = usage.entry(player.to_string()).or_default();
        if !codes.contains(&code) {
            codes.push(code.clone());
        }
        Ok::<_, RealmError>(())
    })?;
    info!("coupon: {} redeemed {}", player, code);
    host.tell(
        player,
        &format!("§a쿠폰 사용 완료! {} x{} 을(를) 받았습니다.", coupon.item, coupon.amount),
    );
    Ok(coupon)
}
