//! Chat command parser.
//!
//! Commands start with the configured prefix followed by a keyword, in Korean or
//! English (`!은행` / `!bank`). Arguments are split on whitespace; a guild
//! description takes the rest of the line. Chat that does not start with a known
//! keyword is ordinary chat and parses to `Ok(None)`.

use thiserror::Error;

use crate::validation::{parse_amount, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankCommand {
    Menu,
    Open,
    Balance,
    Deposit(i64),
    Withdraw(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildCommand {
    Create { name: String, description: String },
    Join { name: String },
    Accept { player: String },
    Reject { player: String },
    Leave,
    Kick { player: String },
    Disband,
    Info { name: Option<String> },
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarpCommand {
    Request { target: String },
    Accept,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponCommand {
    Redeem { code: String },
    /// `code == None` asks for a generated code.
    Create {
        code: Option<String>,
        item: String,
        amount: u32,
    },
    Delete { code: String },
    List,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Bank(BankCommand),
    Guild(GuildCommand),
    Warp(WarpCommand),
    Coupon(CouponCommand),
    Enchant { id: String, level: u8 },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("사용법: {0}")]
    Usage(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

fn usage(prefix: &str, text: &str) -> CommandParseError {
    CommandParseError::Usage(format!("{}{}", prefix, text))
}

/// Multi-line help shown for `!도움말`.
pub fn help_text(prefix: &str) -> String {
    [
        "§e=== 명령어 목록 ===",
        "§f{p}은행 §7- 은행 메뉴 (개설/잔액/입금/출금)",
        "§f{p}길드 §7- 생성/가입/수락/거절/탈퇴/추방/해산/정보/목록",
        "§f{p}워프 <플레이어> §7- 워프 요청 (수락/거절)",
        "§f{p}쿠폰 <코드> §7- 쿠폰 사용",
        "§f{p}도움말 §7- 이 목록",
    ]
    .iter()
    .map(|l| l.replace("{p}", prefix))
    .collect::<Vec<_>>()
    .join("\n")
}

/// Parse one chat line.
pub fn parse(message: &str, prefix: &str) -> Result<Option<ChatCommand>, CommandParseError> {
    let Some(body) = message.trim().strip_prefix(prefix) else {
        return Ok(None);
    };
    let mut words = body.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let command = match keyword.to_lowercase().as_str() {
        "도움말" | "help" => ChatCommand::Help,
        "은행" | "bank" => ChatCommand::Bank(parse_bank(&args, prefix)?),
        "길드" | "guild" => ChatCommand::Guild(parse_guild(body, &args, prefix)?),
        "워프" | "warp" => ChatCommand::Warp(parse_warp(&args, prefix)?),
        "쿠폰" | "coupon" => ChatCommand::Coupon(parse_coupon(&args, prefix)?),
        "인챈트" | "enchant" => parse_enchant(&args, prefix)?,
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn sub(args: &[&str]) -> Option<String> {
    args.first().map(|s| s.to_lowercase())
}

fn parse_bank(args: &[&str], prefix: &str) -> Result<BankCommand, CommandParseError> {
    let Some(sub) = sub(args) else {
        return Ok(BankCommand::Menu);
    };
    let amount = || -> Result<i64, CommandParseError> {
        match args.get(1) {
            Some(raw) => Ok(parse_amount(raw)?),
            None => Err(usage(prefix, "은행 입금|출금 <금액>")),
        }
    };
    match sub.as_str() {
        "개설" | "open" => Ok(BankCommand::Open),
        "잔액" | "balance" => Ok(BankCommand::Balance),
        "입금" | "deposit" => Ok(BankCommand::Deposit(amount()?)),
        "출금" | "withdraw" => Ok(BankCommand::Withdraw(amount()?)),
        _ => Err(usage(prefix, "은행 [개설|잔액|입금 <금액>|출금 <금액>]")),
    }
}

fn parse_guild(body: &str, args: &[&str], prefix: &str) -> Result<GuildCommand, CommandParseError> {
    let Some(sub) = sub(args) else {
        return Ok(GuildCommand::Info { name: None });
    };
    let arg = |text: &str| -> Result<String, CommandParseError> {
        args.get(1)
            .map(|s| s.to_string())
            .ok_or_else(|| usage(prefix, text))
    };
    match sub.as_str() {
        "생성" | "create" => {
            let name = arg("길드 생성 <이름> [설명]")?;
            Ok(GuildCommand::Create {
                name,
                description: rest_after(body, 3),
            })
        }
        "가입" | "join" => Ok(GuildCommand::Join {
            name: arg("길드 가입 <이름>")?,
        }),
        "수락" | "accept" => Ok(GuildCommand::Accept {
            player: arg("길드 수락 <플레이어>")?,
        }),
        "거절" | "reject" => Ok(GuildCommand::Reject {
            player: arg("길드 거절 <플레이어>")?,
        }),
        "탈퇴" | "leave" => Ok(GuildCommand::Leave),
        "추방" | "kick" => Ok(GuildCommand::Kick {
            player: arg("길드 추방 <플레이어>")?,
        }),
        "해산" | "disband" => Ok(GuildCommand::Disband),
        "정보" | "info" => Ok(GuildCommand::Info {
            name: args.get(1).map(|s| s.to_string()),
        }),
        "목록" | "list" => Ok(GuildCommand::List),
        _ => Err(usage(
            prefix,
            "길드 [생성|가입|수락|거절|탈퇴|추방|해산|정보|목록]",
        )),
    }
}

/// Everything after the first `skip` words, whitespace preserved inside.
fn rest_after(body: &str, skip: usize) -> String {
    let mut rest = body.trim_start();
    for _ in 0..skip {
        match rest.find(char::is_whitespace) {
            Some(idx) => rest = rest[idx..].trim_start(),
            None => return String::new(),
        }
    }
    rest.trim().to_string()
}

fn parse_warp(args: &[&str], prefix: &str) -> Result<WarpCommand, CommandParseError> {
    match sub(args).as_deref() {
        Some("수락") | Some("accept") => Ok(WarpCommand::Accept),
        Some("거절") | Some("reject") => Ok(WarpCommand::Reject),
        Some(_) => Ok(WarpCommand::Request {
            target: args[0].to_string(),
        }),
        None => Err(usage(prefix, "워프 <플레이어> | 워프 수락 | 워프 거절")),
    }
}

fn parse_coupon(args: &[&str], prefix: &str) -> Result<CouponCommand, CommandParseError> {
    let Some(sub) = sub(args) else {
        return Err(usage(prefix, "쿠폰 <코드>"));
    };
    match sub.as_str() {
        "생성" | "create" => {
            let create_usage = "쿠폰 생성 [코드] <아이템> <수량>";
            let (code, item, amount) = match &args[1..] {
                [item, amount] => (None, *item, *amount),
                [code, item, amount] => (Some(code.to_string()), *item, *amount),
                _ => return Err(usage(prefix, create_usage)),
            };
            let amount = parse_amount(amount)?;
            let amount = u32::try_from(amount).map_err(|_| usage(prefix, create_usage))?;
            Ok(CouponCommand::Create {
                code,
                item: item.to_string(),
                amount,
            })
        }
        "삭제" | "delete" => match args.get(1) {
            Some(code) => Ok(CouponCommand::Delete {
                code: code.to_string(),
            }),
            None => Err(usage(prefix, "쿠폰 삭제 <코드>")),
        },
        "목록" | "list" => Ok(CouponCommand::List),
        _ => Ok(CouponCommand::Redeem {
            code: args[0].to_string(),
        }),
    }
}

fn parse_enchant(args: &[&str], prefix: &str) -> Result<ChatCommand, CommandParseError> {
    match args {
        [id, level] => {
            let level = level
                .parse::<u8>()
                .map_err(|_| usage(prefix, "인챈트 <id> <레벨>"))?;
            Ok(ChatCommand::Enchant {
                id: id.to_lowercase(),
                level,
            })
        }
        _ => Err(usage(prefix, "인챈트 <id> <레벨>")),
    }
}
