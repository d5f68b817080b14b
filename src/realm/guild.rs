//! Guilds.
//!
//! Stored in the `guilds` namespace keyed by guild name. The leader is always the
//! first member. Every member carries the tag `<tag_prefix><teamNumber>`, which the
//! host uses for team colouring; the team number is the lowest positive number no
//! other guild holds.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::errors::{RealmError, RealmResult};
use crate::config::GuildConfig;
use crate::host::{quoted, run_checked, CommandContext, Host};
use crate::logutil::escape_log;
use crate::storage::{RecordStore, Table};
use crate::validation::{sanitize_description, validate_guild_name};

pub const NAMESPACE: &str = "guilds";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guild {
    pub leader: String,
    #[serde(default)]
    pub description: String,
    pub members: Vec<String>,
    #[serde(default)]
    pub join_requests: Vec<String>,
    pub team_number: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Guild {
    pub fn has_member(&self, player: &str) -> bool {
        self.members.iter().any(|m| m == player)
    }
}

fn team_tag(config: &GuildConfig, team_number: u32) -> String {
    format!("{}{}", config.tag_prefix, team_number)
}

fn lowest_free_team(guilds: &Table<Guild>) -> u32 {
    let taken: BTreeSet<u32> = guilds.values().map(|g| g.team_number).collect();
    (1..).find(|n| !taken.contains(n)).unwrap_or(1)
}

fn find_member<'a>(guilds: &'a Table<Guild>, player: &str) -> Option<(&'a String, &'a Guild)> {
    guilds.iter().find(|(_, g)| g.has_member(player))
}

fn find_name(guilds: &Table<Guild>, name: &str) -> Option<String> {
    guilds.keys().find(|k| k.eq_ignore_ascii_case(name)).cloned()
}

/// Name of the guild `player` belongs to.
pub fn guild_of(store: &RecordStore, player: &str) -> RealmResult<Option<String>> {
    let guilds = store.load::<Guild>(NAMESPACE)?;
    Ok(find_member(&guilds, player).map(|(name, _)| name.clone()))
}

/// True when both players are members of the same guild.
pub fn same_guild(store: &RecordStore, a: &str, b: &str) -> RealmResult<bool> {
    let guilds = store.load::<Guild>(NAMESPACE)?;
    Ok(guilds.values().any(|g| g.has_member(a) && g.has_member(b)))
}

/// Guild led by `leader`, or a precondition error.
fn led_by(guilds: &Table<Guild>, leader: &str) -> RealmResult<(String, Guild)> {
    match find_member(guilds, leader) {
        Some((name, guild)) if guild.leader == leader => Ok((name.clone(), guild.clone())),
        Some(_) => Err(RealmError::PermissionDenied("길드장만 할 수 있습니다.".into())),
        None => Err(RealmError::precondition("가입한 길드가 없습니다.")),
    }
}

async fn set_tag<H: Host>(host: &H, player: &str, tag: &str, add: bool) -> RealmResult<()> {
    let op = if add { "add" } else { "remove" };
    let command = format!("tag {} {} {}", quoted(player), op, tag);
    run_checked(host, &CommandContext::Player(player.to_string()), &command).await?;
    Ok(())
}

/// Tag removal for players that may be offline. The record is already committed,
/// so a failure is logged and reported back as false.
async fn drop_tag<H: Host>(host: &H, player: &str, tag: &str) -> bool {
    match set_tag(host, player, tag, false).await {
        Ok(()) => true,
        Err(e) => {
            warn!("guild: could not remove tag {} from {}: {}", tag, player, e);
            false
        }
    }
}

fn stale_tag_notice(players: &[String], tag: &str) -> String {
    format!(
        "§c{}님의 팀 태그({})를 제거하지 못했습니다. 관리자에게 문의하세요.",
        players.join(", "),
        tag
    )
}

pub async fn create<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &GuildConfig,
    player: &str,
    name: &str,
    description: &str,
) -> RealmResult<String> {
    let name = validate_guild_name(name, config.name_max_chars)?;
    let description = sanitize_description(description, config.description_max_chars);

    let guilds = store.load::<Guild>(NAMESPACE)?;
    if find_member(&guilds, player).is_some() {
        return Err(RealmError::precondition("이미 길드에 가입되어 있습니다."));
    }
    if find_name(&guilds, &name).is_some() {
        return Err(RealmError::precondition(format!("'{}' 길드가 이미 있습니다.", name)));
    }
    let team_number = lowest_free_team(&guilds);
    let tag = team_tag(config, team_number);
    set_tag(host, player, &tag, true).await?;

    let now = host.now();
    let created = store.update(NAMESPACE, |guilds: &mut Table<Guild>| {
        if find_member(guilds, player).is_some() || find_name(guilds, &name).is_some() {
            return Err(RealmError::precondition("길드를 만들 수 없습니다. 다시 시도하세요."));
        }
        // team numbers may have moved while the tag command ran
        if guilds.values().any(|g| g.team_number == team_number) {
            return Err(RealmError::precondition("길드를 만들 수 없습니다. 다시 시도하세요."));
        }
        guilds.insert(
            name.clone(),
            Guild {
                leader: player.to_string(),
                description: description.clone(),
                members: vec![player.to_string()],
                join_requests: Vec::new(),
                team_number,
                created_at: now,
            },
        );
        Ok(())
    });
    if let Err(e) = created {
        drop_tag(host, player, &tag).await;
        return Err(e);
    }
    info!(
        "guild: {} created '{}' (team {}) desc='{}'",
        player,
        name,
        team_number,
        escape_log(&description)
    );
    host.broadcast(&format!("§e{}님이 '{}' 길드를 창설했습니다.", player, name));
    Ok(name)
}

pub fn request_join<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &GuildConfig,
    player: &str,
    name: &str,
) -> RealmResult<String> {
    let (name, leader) = store.update(NAMESPACE, |guilds: &mut Table<Guild>| {
        if find_member(guilds, player).is_some() {
            return Err(RealmError::precondition("이미 길드에 가입되어 있습니다."));
        }
        let key = find_name(guilds, name)
            .ok_or_else(|| RealmError::precondition(format!("'{}' 길드를 찾을 수 없습니다.", name)))?;
        let guild = guilds
            .get_mut(&key)
            .ok_or_else(|| RealmError::precondition("길드를 찾을 수 없습니다."))?;
        if guild.join_requests.iter().any(|r| r == player) {
            return Err(RealmError::precondition("이미 가입 신청을 했습니다."));
        }
        if guild.members.len() >= config.max_members {
            return Err(RealmError::precondition("길드 인원이 가득 찼습니다."));
        }
        guild.join_requests.push(player.to_string());
        Ok((key, guild.leader.clone()))
    })?;
    if host.is_online(&leader) {
        host.tell(
            &leader,
            &format!("§e{}님이 길드 가입을 신청했습니다. (!길드 수락 {})", player, player),
        );
    }
    Ok(name)
}

pub async fn accept<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &GuildConfig,
    leader: &str,
    target: &str,
) -> RealmResult<()> {
    let guilds = store.load::<Guild>(NAMESPACE)?;
    let (name, guild) = led_by(&guilds, leader)?;
    if !guild.join_requests.iter().any(|r| r == target) {
        return Err(RealmError::precondition(format!("{}님의 가입 신청이 없습니다.", target)));
    }
    if find_member(&guilds, target).is_some() {
        store.update(NAMESPACE, |guilds: &mut Table<Guild>| {
            for g in guilds.values_mut() {
                g.join_requests.retain(|r| r != target);
            }
            Ok::<_, RealmError>(())
        })?;
        return Err(RealmError::precondition(format!(
            "{}님은 이미 다른 길드에 가입되어 있습니다.",
            target
        )));
    }
    if guild.members.len() >= config.max_members {
        return Err(RealmError::precondition("길드 인원이 가득 찼습니다."));
    }
    let tag = team_tag(config, guild.team_number);
    set_tag(host, target, &tag, true).await?;

    let committed = store.update(NAMESPACE, |guilds: &mut Table<Guild>| {
        if find_member(guilds, target).is_some() {
            return Err(RealmError::precondition("이미 길드에 가입되어 있습니다."));
        }
        let guild = guilds
            .get_mut(&name)
            .ok_or_else(|| RealmError::precondition("길드를 찾을 수 없습니다."))?;
        if guild.members.len() >= config.max_members {
            return Err(RealmError::precondition("길드 인원이 가득 찼습니다."));
        }
        guild.members.push(target.to_string());
        for g in guilds.values_mut() {
            g.join_requests.retain(|r| r != target);
        }
        Ok(())
    });
    if let Err(e) = committed {
        drop_tag(host, target, &tag).await;
        return Err(e);
    }
    info!("guild: {} joined '{}'", target, name);
    host.tell(leader, &format!("§a{}님의 가입을 수락했습니다.", target));
    if host.is_online(target) {
        host.tell(target, &format!("§a'{}' 길드에 가입되었습니다.", name));
    }
    Ok(())
}

pub fn reject<H: Host>(host: &H, store: &RecordStore, leader: &str, target: &str) -> RealmResult<()> {
    let name = store.update(NAMESPACE, |guilds: &mut Table<Guild>| {
        let (name, _) = led_by(guilds, leader)?;
        let guild = guilds
            .get_mut(&name)
            .ok_or_else(|| RealmError::precondition("길드를 찾을 수 없습니다."))?;
        let before = guild.join_requests.len();
        guild.join_requests.retain(|r| r != target);
        if guild.join_requests.len() == before {
            return Err(RealmError::precondition(format!("{}님의 가입 신청이 없습니다.", target)));
        }
        Ok(name)
    })?;
    host.tell(leader, &format!("§e{}님의 가입 신청을 거절했습니다.", target));
    if host.is_online(target) {
        host.tell(target, &format!("§c'{}' 길드 가입이 거절되었습니다.", name));
    }
    Ok(())
}

pub async fn leave<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &GuildConfig,
    player: &str,
) -> RealmResult<()> {
    let (name, team_number) = store.update(NAMESPACE, |guilds: &mut Table<Guild>| {
        let (name, guild) = match find_member(guilds, player) {
            Some((n, g)) => (n.clone(), g.clone()),
            None => return Err(RealmError::precondition("가입한 길드가 없습니다.")),
        };
        if guild.leader == player {
            return Err(RealmError::precondition(
                "길드장은 탈퇴할 수 없습니다. 길드를 해산하세요.",
            ));
        }
        if let Some(g) = guilds.get_mut(&name) {
            g.members.retain(|m| m != player);
        }
        Ok((name, guild.team_number))
    })?;
    let tag = team_tag(config, team_number);
    let removed = drop_tag(host, player, &tag).await;
    info!("guild: {} left '{}'", player, name);
    host.tell(player, &format!("§e'{}' 길드에서 탈퇴했습니다.", name));
    if !removed {
        host.tell(player, &stale_tag_notice(&[player.to_string()], &tag));
    }
    Ok(())
}

pub async fn kick<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &GuildConfig,
    leader: &str,
    target: &str,
) -> RealmResult<()> {
    if leader == target {
        return Err(RealmError::validation("자기 자신은 추방할 수 없습니다."));
    }
    let (name, team_number) = store.update(NAMESPACE, |guilds: &mut Table<Guild>| {
        let (name, guild) = led_by(guilds, leader)?;
        if !guild.has_member(target) {
            return Err(RealmError::precondition(format!("{}님은 길드원이 아닙니다.", target)));
        }
        if let Some(g) = guilds.get_mut(&name) {
            g.members.retain(|m| m != target);
        }
        Ok((name, guild.team_number))
    })?;
    let tag = team_tag(config, team_number);
    let removed = drop_tag(host, target, &tag).await;
    info!("guild: {} kicked {} from '{}'", leader, target, name);
    host.tell(leader, &format!("§e{}님을 추방했습니다.", target));
    if !removed {
        host.tell(leader, &stale_tag_notice(&[target.to_string()], &tag));
    }
    if host.is_online(target) {
        host.tell(target, &format!("§c'{}' 길드에서 추방되었습니다.", name));
    }
    Ok(())
}

pub async fn disband<H: Host>(
    host: &H,
    store: &RecordStore,
    config: &GuildConfig,
    leader: &str,
) -> RealmResult<String> {
    let (name, guild) = store.update(NAMESPACE, |guilds: &mut Table<Guild>| {
        let (name, guild) = led_by(guilds, leader)?;
        guilds.remove(&name);
        Ok::<_, RealmError>((name, guild))
    })?;
    let tag = team_tag(config, guild.team_number);
    let mut stale = Vec::new();
    for member in &guild.members {
        if !drop_tag(host, member, &tag).await {
            stale.push(member.clone());
        }
    }
    info!("guild: '{}' disbanded by {}", name, leader);
    host.broadcast(&format!("§e'{}' 길드가 해산되었습니다.", name));
    if !stale.is_empty() {
        host.tell(leader, &stale_tag_notice(&stale, &tag));
    }
    Ok(name)
}

/// Chat lines describing a guild; `name == None` means the player's own guild.
pub fn info(store: &RecordStore, player: &str, name: Option<&str>) -> RealmResult<Vec<String>> {
    let guilds = store.load::<Guild>(NAMESPACE)?;
    let (name, guild) = match name {
        Some(n) => {
            let key = find_name(&guilds, n)
                .ok_or_else(|| RealmError::precondition(format!("'{}' 길드를 찾을 수 없습니다.", n)))?;
            let guild = guilds
                .get(&key)
                .cloned()
                .ok_or_else(|| RealmError::precondition("길드를 찾을 수 없습니다."))?;
            (key, guild)
        }
        None => match find_member(&guilds, player) {
            Some((n, g)) => (n.clone(), g.clone()),
            None => return Err(RealmError::precondition("가입한 길드가 없습니다.")),
        },
    };
    let mut lines = vec![
        format!("§e=== {} (팀 {}) ===", name, guild.team_number),
        format!("§f길드장: {}", guild.leader),
        format!("§f길드원 ({}): {}", guild.members.len(), guild.members.join(", ")),
    ];
    if !guild.description.is_empty() {
        lines.push(format!("§7{}", guild.description));
    }
    if guild.leader == player && !guild.join_requests.is_empty() {
        lines.push(format!("§6가입 신청: {}", guild.join_requests.join(", ")));
    }
    Ok(lines)
}

/// `(name, member count)` for every guild, by name.
pub fn list(store: &RecordStore) -> RealmResult<Vec<(String, usize)>> {
    let guilds = store.load::<Guild>(NAMESPACE)?;
    Ok(guilds
        .iter()
        .map(|(name, g)| (name.clone(), g.members.len()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild(team_number: u32) -> Guild {
        Guild {
            leader: "l".into(),
            description: String::new(),
            members: vec!["l".into()],
            join_requests: vec![],
            team_number,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn team_numbers_fill_gaps() {
        let mut guilds = Table::new();
        assert_eq!(lowest_free_team(&guilds), 1);
        guilds.insert("a".to_string(), guild(1));
        guilds.insert("b".to_string(), guild(3));
        assert_eq!(lowest_free_team(&guilds), 2);
        guilds.insert("c".to_string(), guild(2));
        assert_eq!(lowest_free_team(&guilds), 4);
    }

    #[test]
    fn guild_names_match_case_insensitively() {
        let mut guilds = Table::new();
        guilds.insert("Knights".to_string(), guild(1));
        assert_eq!(find_name(&guilds, "knights"), Some("Knights".to_string()));
        assert_eq!(find_name(&guilds, "rogues"), None);
    }

    #[test]
    fn stored_fields_are_camel_case() {
        let json = serde_json::to_value(guild(4)).unwrap();
        assert_eq!(json["teamNumber"], serde_json::json!(4));
        assert!(json["joinRequests"].is_array());
    }
}
