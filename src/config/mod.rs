//! # Configuration Management Module
//!
//! All realm settings live in one TOML file, split into sections per feature.
//! Every section carries serde defaults, so a file only needs to name what it changes.
//!
//! - [`WorldConfig`] - world name, data directory, storage backend, tick length, admins
//! - [`CommandsConfig`] - chat command prefix
//! - [`LoggingConfig`] - log level, log file and audit log file
//! - [`BankConfig`], [`WarpConfig`], [`GuildConfig`], [`CouponConfig`],
//!   [`LocksConfig`], [`TombConfig`], [`EnchantConfig`] - per-feature settings
//! - [`SnapshotConfig`] - periodic world snapshots
//!
//! ## Usage
//!
//! ```rust,no_run
//! use realmkeeper::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("config.toml").await?;
//!     let config = Config::load("config.toml").await?;
//!     println!("World: {}", config.world.name);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [world]
//! name = "Survival"
//! data_dir = "./data"
//! backend = "sled"
//! tick_ms = 50
//! admins = ["Steve"]
//!
//! [bank]
//! minimum_balance = -1000
//! ```

use anyhow::{anyhow, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Which [`crate::storage::PropertyBackend`] holds the world's properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sled,
    Json,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub name: String,
    pub data_dir: String,
    pub backend: BackendKind,
    /// Length of one scheduler tick in milliseconds.
    pub tick_ms: u64,
    /// Players allowed to run admin commands and bypass container locks.
    pub admins: Vec<String>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "realmkeeper world".to_string(),
            data_dir: "./data".to_string(),
            backend: BackendKind::Sled,
            tick_ms: 50,
            admins: Vec::new(),
        }
    }
}

impl WorldConfig {
    pub fn is_admin(&self, player: &str) -> bool {
        self.admins.iter().any(|a| a.eq_ignore_ascii_case(player))
    }

    /// Whole ticks needed to cover `span`, rounded up.
    pub fn ticks_for(&self, span: Duration) -> u64 {
        let ms = span.num_milliseconds().max(0) as u64;
        let tick = self.tick_ms.max(1);
        ms.div_ceil(tick)
    }

    pub fn ticks_per_second(&self) -> u64 {
        (1000 / self.tick_ms.max(1)).max(1)
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub prefix: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    /// Admin actions (`target: "audit"`) are appended here as well.
    pub audit_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("realmkeeper.log".to_string()),
            audit_file: Some("realmkeeper-audit.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    pub enabled: bool,
    pub currency_item: String,
    /// Using this item opens the bank menu.
    pub card_item: String,
    /// Lowest balance a withdrawal may leave behind.
    pub minimum_balance: i64,
    /// Interest on positive balances per period, in basis points.
    pub interest_rate_bp: i64,
    /// Interest charged on negative balances per period, in basis points.
    pub loan_rate_bp: i64,
    pub interest_period_secs: u64,
    pub form_retry_attempts: u32,
    pub form_retry_delay_ms: u64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            currency_item: "minecraft:emerald".to_string(),
            card_item: "minecraft:paper".to_string(),
            minimum_balance: -1000,
            interest_rate_bp: 100,
            loan_rate_bp: 200,
            interest_period_secs: 86_400,
            form_retry_attempts: 10,
            form_retry_delay_ms: 250,
        }
    }
}

impl BankConfig {
    pub fn interest_period(&self) -> Duration {
        Duration::seconds(self.interest_period_secs as i64)
    }

    pub fn form_retry_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.form_retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    pub enabled: bool,
    /// Pending requests expire after this many seconds.
    pub request_timeout_secs: u64,
    /// Grace period between accept and teleport.
    pub teleport_delay_secs: u64,
    /// Applied to the requester when the teleport completes.
    pub cooldown_secs: u64,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout_secs: 60,
            teleport_delay_secs: 3,
            cooldown_secs: 300,
        }
    }
}

impl WarpConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::seconds(self.request_timeout_secs as i64)
    }

    pub fn teleport_delay(&self) -> Duration {
        Duration::seconds(self.teleport_delay_secs as i64)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::seconds(self.cooldown_secs as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildConfig {
    pub enabled: bool,
    pub max_members: usize,
    pub name_max_chars: usize,
    pub description_max_chars: usize,
    /// Members carry the tag `<tag_prefix><team number>`.
    pub tag_prefix: String,
    /// When false, players of the same guild cannot hurt each other.
    pub friendly_fire: bool,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_members: 20,
            name_max_chars: 16,
            description_max_chars: 100,
            tag_prefix: "guild_team_".to_string(),
            friendly_fire: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CouponConfig {
    pub enabled: bool,
    /// Length of generated codes when an admin omits one.
    pub random_code_length: usize,
}

impl Default for CouponConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            random_code_length: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocksConfig {
    pub enabled: bool,
    pub key_item: String,
    pub lockable_blocks: Vec<String>,
}

impl Default for LocksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_item: "minecraft:tripwire_hook".to_string(),
            lockable_blocks: [
                "minecraft:chest",
                "minecraft:trapped_chest",
                "minecraft:barrel",
                "minecraft:shulker_box",
                "minecraft:undyed_shulker_box",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl LocksConfig {
    pub fn is_lockable(&self, block_type: &str) -> bool {
        self.lockable_blocks.iter().any(|b| b == block_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TombConfig {
    pub enabled: bool,
    pub marker_entity: String,
    pub check_interval_ticks: u64,
    /// Markers still standing after this long are removed.
    pub lifetime_secs: u64,
}

impl Default for TombConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            marker_entity: "minecraft:armor_stand".to_string(),
            check_interval_ticks: 20,
            lifetime_secs: 600,
        }
    }
}

impl TombConfig {
    pub fn lifetime(&self) -> Duration {
        Duration::seconds(self.lifetime_secs as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnchantConfig {
    pub enabled: bool,
    /// Only admins may apply enchantments through chat.
    pub admin_only: bool,
}

impl Default for EnchantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_only: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub enabled: bool,
    /// Relative paths resolve against `world.data_dir`.
    pub dir: String,
    pub interval_minutes: u64,
    pub keep_last: usize,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: "snapshots".to_string(),
            interval_minutes: 60,
            keep_last: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub bank: BankConfig,
    #[serde(default)]
    pub warp: WarpConfig,
    #[serde(default)]
    pub guild: GuildConfig,
    #[serde(default)]
    pub coupon: CouponConfig,
    #[serde(default)]
    pub locks: LocksConfig,
    #[serde(default)]
    pub tomb: TombConfig,
    #[serde(default)]
    pub enchant: EnchantConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

impl Config {
    /// Load and validate configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config
            .validate()
            .map_err(|e| anyhow!("Invalid config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject settings the realm cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.world.tick_ms == 0 {
            return Err(anyhow!("world.tick_ms must be greater than 0"));
        }
        if self.commands.prefix.trim().is_empty() {
            return Err(anyhow!("commands.prefix must not be empty"));
        }
        if self.bank.minimum_balance > 0 {
            return Err(anyhow!("bank.minimum_balance must be 0 or negative"));
        }
        if self.bank.interest_period_secs == 0 {
            return Err(anyhow!("bank.interest_period_secs must be greater than 0"));
        }
        if self.bank.interest_rate_bp < 0 || self.bank.loan_rate_bp < 0 {
            return Err(anyhow!("bank interest rates must not be negative"));
        }
        if self.warp.request_timeout_secs == 0 {
            return Err(anyhow!("warp.request_timeout_secs must be greater than 0"));
        }
        if self.guild.max_members < 1 {
            return Err(anyhow!("guild.max_members must be at least 1"));
        }
        if self.guild.name_max_chars < 2 {
            return Err(anyhow!("guild.name_max_chars must be at least 2"));
        }
        if self.coupon.random_code_length < 3 || self.coupon.random_code_length > 32 {
            return Err(anyhow!("coupon.random_code_length must be between 3 and 32"));
        }
        if self.locks.enabled && self.locks.lockable_blocks.is_empty() {
            return Err(anyhow!("locks.lockable_blocks must not be empty when locks are enabled"));
        }
        if self.tomb.check_interval_ticks == 0 {
            return Err(anyhow!("tomb.check_interval_ticks must be greater than 0"));
        }
        if self.snapshot.enabled && (self.snapshot.keep_last == 0 || self.snapshot.interval_minutes == 0) {
            return Err(anyhow!("snapshot.keep_last and snapshot.interval_minutes must be greater than 0"));
        }
        Ok(())
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        let dir = PathBuf::from(&self.snapshot.dir);
        if dir.is_absolute() {
            dir
        } else {
            self.world.data_path().join(dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bank.minimum_balance, -1000);
        assert_eq!(config.commands.prefix, "!");
        assert_eq!(config.world.tick_ms, 50);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [world]
            name = "Test"
            admins = ["Steve"]

            [warp]
            cooldown_secs = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.world.name, "Test");
        assert_eq!(config.world.backend, BackendKind::Sled);
        assert!(config.world.is_admin("steve"));
        assert_eq!(config.warp.cooldown_secs, 10);
        assert_eq!(config.warp.request_timeout_secs, 60);
        assert_eq!(config.bank.currency_item, "minecraft:emerald");
    }

    #[test]
    fn test_validate_rejects_zero_tick() {
        let mut config = Config::default();
        config.world.tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_positive_minimum_balance() {
        let mut config = Config::default();
        config.bank.minimum_balance = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_lockable_list() {
        let mut config = Config::default();
        config.locks.lockable_blocks.clear();
        assert!(config.validate().is_err());
        config.locks.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ticks_round_up() {
        let world = WorldConfig::default();
        assert_eq!(world.ticks_for(Duration::seconds(3)), 60);
        assert_eq!(world.ticks_for(Duration::milliseconds(51)), 2);
        assert_eq!(world.ticks_for(Duration::zero()), 0);
        assert_eq!(world.ticks_per_second(), 20);
    }

    #[test]
    fn test_snapshot_dir_is_relative_to_data_dir() {
        let config = Config::default();
        assert_eq!(config.snapshot_dir(), PathBuf::from("./data").join("snapshots"));
    }

    #[tokio::test]
    async fn test_default_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();
        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.world.name, Config::default().world.name);
        assert_eq!(loaded.locks.lockable_blocks.len(), 5);
    }
}
