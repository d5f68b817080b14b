//! Currency bank.
//!
//! Accounts live in the `bank_accounts` namespace keyed by player name. Balances are
//! whole currency items and may go negative down to `bank.minimum_balance`.
//! Interest is settled lazily on every access: each full period since
//! `lastInterestTime` applies `interest_rate_bp` to positive balances and
//! `loan_rate_bp` to negative ones.
//!
//! Item movement always happens first. The account is re-loaded and written only
//! after the host reports the command succeeded.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::errors::{RealmError, RealmResult};
use crate::config::{BankConfig, Config};
use crate::host::ui::show_form_retrying;
use crate::host::{
    quoted, run_checked, CommandContext, Form, FormField, FormResponse, FormValue, Host,
};
use crate::storage::{RecordStore, Table};
use crate::validation::parse_amount;

pub const NAMESPACE: &str = "bank_accounts";

const MAX_SETTLED_PERIODS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub balance: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_interest_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl BankAccount {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            balance: 0,
            last_interest_time: now,
            created_at: now,
        }
    }

    /// Settle every full interest period up to `now`. Returns the balance change.
    pub fn accrue_interest(&mut self, config: &BankConfig, now: DateTime<Utc>) -> i64 {
        let period = config.interest_period();
        if period.num_seconds() <= 0 || now <= self.last_interest_time {
            return 0;
        }
        let periods = (now - self.last_interest_time).num_seconds() / period.num_seconds();
        if periods == 0 {
            return 0;
        }
        let before = self.balance;
        for _ in 0..periods.min(MAX_SETTLED_PERIODS) {
            let rate = if self.balance >= 0 {
                config.interest_rate_bp
            } else {
                config.loan_rate_bp
            };
            let delta = self.balance.saturating_mul(rate) / 10_000;
            self.balance = self.balance.saturating_add(delta);
        }
        self.last_interest_time += chrono::Duration::seconds(period.num_seconds() * periods);
        self.balance - before
    }
}

/// `12345` -> `12,345`
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if amount < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

fn no_account() -> RealmError {
    RealmError::precondition("계좌가 없습니다. !은행 개설 로 계좌를 먼저 만드세요.")
}

pub fn open_account(store: &RecordStore, player: &str, now: DateTime<Utc>) -> RealmResult<BankAccount> {
    store.update(NAMESPACE, |accounts: &mut Table<BankAccount>| {
        if accounts.contains_key(player) {
            return Err(RealmError::precondition("이미 계좌가 있습니다."));
        }
        let account = BankAccount::new(now);
        accounts.insert(player.to_string(), account.clone());
        Ok(account)
    })
}

/// Current balance after settling interest. Settled interest is persisted.
pub fn balance(store: &RecordStore, config: &BankConfig, player: &str, now: DateTime<Utc>) -> RealmResult<i64> {
    let mut account: BankAccount = store.get(NAMESPACE, player)?.ok_or_else(no_account)?;
    let settled_until = account.last_interest_time;
    account.accrue_interest(config, now);
    if account.last_interest_time != settled_until {
        store.update(NAMESPACE, |accounts: &mut Table<BankAccount>| {
            if let Some(stored) = accounts.get_mut(player) {
                stored.accrue_interest(config, now);
            }
            Ok::<_, RealmError>(())
        })?;
    }
    Ok(account.balance)
}

/// Take `amount` currency items from the player and credit the account.
pub async fn deposit<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &BankConfig,
    player: &str,
    amount: i64,
) -> RealmResult<i64> {
    if amount <= 0 {
        return Err(RealmError::validation("금액은 1 이상이어야 합니다."));
    }
    if store.get::<BankAccount>(NAMESPACE, player)?.is_none() {
        return Err(no_account());
    }
    let held = host.item_count(player, &config.currency_item) as i64;
    if held < amount {
        return Err(RealmError::precondition(format!(
            "화폐가 부족합니다. (보유 {} / 필요 {})",
            format_amount(held),
            format_amount(amount)
        )));
    }

    let clear = format!(
        "clear {} {} 0 {}",
        quoted(player),
        config.currency_item,
        amount
    );
    run_checked(host, &CommandContext::Player(player.to_string()), &clear).await?;

    let now = host.now();
    let credited = store.update(NAMESPACE, |accounts: &mut Table<BankAccount>| {
        let account = accounts.get_mut(player).ok_or_else(no_account)?;
        account.accrue_interest(config, now);
        account.balance = account.balance.saturating_add(amount);
        Ok::<_, RealmError>(account.balance)
    });
    match credited {
        Ok(balance) => {
            info!("bank: {} deposited {} (balance {})", player, amount, balance);
            Ok(balance)
        }
        Err(e) => {
            refund(host, config, player, amount).await;
            Err(e)
        }
    }
}

/// Give `amount` currency items and debit the account, down to the minimum balance.
pub async fn withdraw<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &BankConfig,
    player: &str,
    amount: i64,
) -> RealmResult<i64> {
    if amount <= 0 {
        return Err(RealmError::validation("금액은 1 이상이어야 합니다."));
    }
    let now = host.now();
    let mut account: BankAccount = store.get(NAMESPACE, player)?.ok_or_else(no_account)?;
    account.accrue_interest(config, now);
    check_withdrawable(&account, config, amount)?;

    let give = format!("give {} {} {}", quoted(player), config.currency_item, amount);
    run_checked(host, &CommandContext::Player(player.to_string()), &give).await?;

    let now = host.now();
    let debited = store.update(NAMESPACE, |accounts: &mut Table<BankAccount>| {
        let account = accounts.get_mut(player).ok_or_else(no_account)?;
        account.accrue_interest(config, now);
        check_withdrawable(account, config, amount)?;
        account.balance -= amount;
        Ok::<_, RealmError>(account.balance)
    });
    match debited {
        Ok(balance) => {
            info!("bank: {} withdrew {} (balance {})", player, amount, balance);
            Ok(balance)
        }
        Err(e) => {
            let take_back = format!(
                "clear {} {} 0 {}",
                quoted(player),
                config.currency_item,
                amount
            );
            if let Err(he) =
                run_checked(host, &CommandContext::Player(player.to_string()), &take_back).await
            {
                warn!("bank: could not take back {} from {}: {}", amount, player, he);
            }
            Err(e)
        }
    }
}

fn check_withdrawable(account: &BankAccount, config: &BankConfig, amount: i64) -> RealmResult<()> {
    let limit = account.balance - config.minimum_balance;
    if amount > limit {
        return Err(RealmError::precondition(format!(
            "출금 한도를 초과했습니다. (최대 {} 출금 가능, 최소 잔액 {})",
            format_amount(limit.max(0)),
            format_amount(config.minimum_balance)
        )));
    }
    Ok(())
}

async fn refund<H: Host>(host: &H, config: &BankConfig, player: &str, amount: i64) {
    let give = format!("give {} {} {}", quoted(player), config.currency_item, amount);
    if let Err(e) = run_checked(host, &CommandContext::Player(player.to_string()), &give).await {
        warn!("bank: refund of {} to {} failed: {}", amount, player, e);
    }
}

fn amount_form(title: &str) -> Form {
    Form::Modal {
        title: title.to_string(),
        fields: vec![FormField::TextField {
            label: "금액".to_string(),
            placeholder: "예: 100".to_string(),
            default: None,
        }],
    }
}

fn amount_from(values: &[FormValue]) -> RealmResult<i64> {
    match values.first() {
        Some(FormValue::Text(s)) => Ok(parse_amount(s)?),
        Some(FormValue::Number(n)) if *n > 0 => Ok(*n),
        Some(FormValue::Number(_)) => Err(RealmError::validation("금액은 1 이상이어야 합니다.")),
        _ => Err(RealmError::validation("금액을 입력해주세요.")),
    }
}

/// Form-driven bank menu, opened by `!은행` or by using the bank card item.
pub async fn open_menu<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &Config,
    player: &str,
) -> RealmResult<()> {
    let bank = &config.bank;
    let attempts = bank.form_retry_attempts;
    let delay = bank.form_retry_delay();

    if store.get::<BankAccount>(NAMESPACE, player)?.is_none() {
        let offer = Form::Message {
            title: "은행".to_string(),
            body: "계좌가 없습니다. 새 계좌를 개설하시겠습니까?".to_string(),
            confirm: "개설".to_string(),
            cancel: "닫기".to_string(),
        };
        if let FormResponse::Message(true) =
            show_form_retrying(host, player, &offer, attempts, delay).await?
        {
            open_account(store, player, host.now())?;
            host.tell(player, "§a계좌가 개설되었습니다.");
        }
        return Ok(());
    }

    let current = balance(store, bank, player, host.now())?;
    let menu = Form::Action {
        title: "은행".to_string(),
        body: format!("현재 잔액: {}", format_amount(current)),
        buttons: vec!["입금".to_string(), "출금".to_string(), "닫기".to_string()],
    };
    let choice = show_form_retrying(host, player, &menu, attempts, delay).await?;
    let depositing = match choice {
        FormResponse::Action(0) => true,
        FormResponse::Action(1) => false,
        _ => return Ok(()),
    };

    let title = if depositing { "입금" } else { "출금" };
    let values = match show_form_retrying(host, player, &amount_form(title), attempts, delay).await? {
        FormResponse::Modal(values) => values,
        _ => return Ok(()),
    };
    let amount = amount_from(&values)?;
    let balance = if depositing {
        deposit(host, store, bank, player, amount).await?
    } else {
        withdraw(host, store, bank, player, amount).await?
    };
    host.tell(
        player,
        &format!(
            "§a{} {} 완료. 잔액: {}",
            title,
            format_amount(amount),
            format_amount(balance)
        ),
    );
    Ok(())
}
