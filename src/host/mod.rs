//! # Host collaborators
//!
//! The game server scripting host is consumed through a handful of narrow traits.
//! Nothing in [`crate::realm`] talks to the engine any other way.
//!
//! - [`CommandExecutor`] - string game commands, returns a success count
//! - [`UiPresenter`] - modal / action / message forms
//! - [`Messenger`] - chat to one player or everyone
//! - [`WorldView`] - clock, presence, positions, inventories, marker entities
//!
//! [`Host`] is implemented for anything that provides all four.
//! [`simulated::SimulatedHost`] is an in-process implementation used by the console
//! binary and the test suite.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod events;
pub mod scheduler;
pub mod simulated;
pub mod ui;

pub use events::{EventOutcome, WorldEvent};
pub use scheduler::{TaskHandle, TickScheduler};
pub use simulated::SimulatedHost;
pub use ui::{CancelReason, Form, FormField, FormResponse, FormValue};

/// Failures reported by host calls.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    #[error("command reported no success: {0}")]
    CommandFailed(String),

    #[error("player is not online: {0}")]
    PlayerOffline(String),

    #[error("form could not be shown: {0}")]
    FormRejected(String),

    #[error("entity could not be spawned: {0}")]
    SpawnFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    #[default]
    Overworld,
    Nether,
    TheEnd,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Overworld => "overworld",
            Dimension::Nether => "nether",
            Dimension::TheEnd => "the_end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim_start_matches("minecraft:").to_ascii_lowercase().as_str() {
            "overworld" => Some(Dimension::Overworld),
            "nether" => Some(Dimension::Nether),
            "the_end" | "end" => Some(Dimension::TheEnd),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position in a dimension. Player positions are floored to block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub dimension: Dimension,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Location {
    pub fn new(dimension: Dimension, x: i32, y: i32, z: i32) -> Self {
        Self { dimension, x, y, z }
    }

    /// Stable spatial key, e.g. `overworld:10,64,-3`.
    pub fn key(&self) -> String {
        format!("{}:{},{},{}", self.dimension, self.x, self.y, self.z)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} ({})", self.x, self.y, self.z, self.dimension)
    }
}

/// Structured custom enchantment attribute carried by an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEnchantment {
    pub id: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub type_id: String,
    pub amount: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_tag: Option<String>,
    #[serde(default)]
    pub enchantments: Vec<CustomEnchantment>,
}

impl ItemStack {
    pub fn new(type_id: impl Into<String>, amount: u32) -> Self {
        Self {
            type_id: type_id.into(),
            amount,
            name_tag: None,
            enchantments: Vec::new(),
        }
    }
}

/// Opaque entity identifier handed out by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a command runs: as a player, or at a dimension's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandContext {
    Player(String),
    Dimension(Dimension),
}

/// Quote a player name for use inside a command string.
pub fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', ""))
}

#[allow(async_fn_in_trait)]
pub trait CommandExecutor {
    /// Run a game command and return the host's success count.
    async fn run_command(&self, context: &CommandContext, command: &str) -> Result<u32, HostError>;
}

#[allow(async_fn_in_trait)]
pub trait UiPresenter {
    async fn show_form(&self, player: &str, form: &Form) -> Result<FormResponse, HostError>;
}

pub trait Messenger {
    fn tell(&self, player: &str, message: &str);
    fn broadcast(&self, message: &str);
}

pub trait WorldView {
    fn now(&self) -> DateTime<Utc>;
    fn is_online(&self, player: &str) -> bool;
    fn player_location(&self, player: &str) -> Option<Location>;
    fn item_count(&self, player: &str, type_id: &str) -> u32;
    fn held_item(&self, player: &str) -> Option<ItemStack>;
    fn set_held_item(&self, player: &str, item: ItemStack) -> Result<(), HostError>;
    fn entity_exists(&self, id: &EntityId) -> bool;
    fn spawn_marker(&self, type_id: &str, name_tag: &str, at: Location) -> Result<EntityId, HostError>;
    /// Returns true when the entity existed.
    fn despawn_entity(&self, id: &EntityId) -> bool;
}

pub trait Host: CommandExecutor + UiPresenter + Messenger + WorldView {}

impl<T: CommandExecutor + UiPresenter + Messenger + WorldView> Host for T {}

/// Run a command and treat a zero success count as a failure.
pub async fn run_checked<H: CommandExecutor + ?Sized>(
    host: &H,
    context: &CommandContext,
    command: &str,
) -> Result<u32, HostError> {
    let count = host.run_command(context, command).await?;
    if count == 0 {
        return Err(HostError::CommandFailed(command.to_string()));
    }
    Ok(count)
}
