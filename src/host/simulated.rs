//! In-process host used by the console binary and the test suite.
//!
//! Keeps just enough world state to answer [`WorldView`] queries and interprets the
//! handful of commands the realm issues (`give`, `clear`, `tp`, `tag`). Anything else
//! succeeds without side effects. Form responses are scripted per player; with no
//! scripted response a form comes back as closed by the user.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use log::debug;
use uuid::Uuid;

use super::{
    CancelReason, CommandContext, CommandExecutor, EntityId, Form, FormResponse, HostError,
    ItemStack, Location, Messenger, UiPresenter, WorldView,
};

#[derive(Debug, Clone)]
struct PlayerState {
    online: bool,
    location: Location,
    inventory: HashMap<String, u32>,
    held: Option<ItemStack>,
    tags: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct Marker {
    #[allow(dead_code)]
    type_id: String,
    name_tag: String,
    location: Location,
}

/// One delivered chat line. `to == None` means broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub to: Option<String>,
    pub text: String,
}

#[derive(Debug)]
struct SimState {
    now: DateTime<Utc>,
    players: HashMap<String, PlayerState>,
    markers: HashMap<EntityId, Marker>,
    chat: Vec<ChatLine>,
    commands: Vec<(CommandContext, String)>,
    scripted_forms: HashMap<String, VecDeque<FormResponse>>,
    shown_forms: Vec<(String, Form)>,
    failing_prefixes: Vec<String>,
}

#[derive(Debug)]
pub struct SimulatedHost {
    state: Mutex<SimState>,
    echo: bool,
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl SimulatedHost {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(SimState {
                now: start,
                players: HashMap::new(),
                markers: HashMap::new(),
                chat: Vec::new(),
                commands: Vec::new(),
                scripted_forms: HashMap::new(),
                shown_forms: Vec::new(),
                failing_prefixes: Vec::new(),
            }),
            echo: false,
        }
    }

    /// Print every chat line to stdout as it is delivered.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn advance(&self, by: Duration) {
        let mut state = self.state();
        state.now += by;
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        self.state().now = now;
    }

    /// Bring a player online at `at`. Known players keep their inventory.
    pub fn join(&self, player: &str, at: Location) {
        let mut state = self.state();
        let entry = state
            .players
            .entry(player.to_string())
            .or_insert_with(|| PlayerState {
                online: true,
                location: at,
                inventory: HashMap::new(),
                held: None,
                tags: BTreeSet::new(),
            });
        entry.online = true;
        entry.location = at;
    }

    pub fn leave(&self, player: &str) {
        if let Some(p) = self.state().players.get_mut(player) {
            p.online = false;
        }
    }

    pub fn move_player(&self, player: &str, to: Location) {
        if let Some(p) = self.state().players.get_mut(player) {
            p.location = to;
        }
    }

    pub fn give_items(&self, player: &str, type_id: &str, amount: u32) {
        if let Some(p) = self.state().players.get_mut(player) {
            *p.inventory.entry(type_id.to_string()).or_insert(0) += amount;
        }
    }

    pub fn hold(&self, player: &str, item: Option<ItemStack>) {
        if let Some(p) = self.state().players.get_mut(player) {
            p.held = item;
        }
    }

    pub fn tags(&self, player: &str) -> Vec<String> {
        self.state()
            .players
            .get(player)
            .map(|p| p.tags.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Queue the next form response for `player`.
    pub fn script_form(&self, player: &str, response: FormResponse) {
        self.state()
            .scripted_forms
            .entry(player.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn shown_forms(&self) -> Vec<(String, Form)> {
        self.state().shown_forms.clone()
    }

    /// Commands starting with `prefix` report zero successes from now on.
    pub fn fail_commands_starting_with(&self, prefix: &str) {
        self.state().failing_prefixes.push(prefix.to_string());
    }

    pub fn clear_command_failures(&self) {
        self.state().failing_prefixes.clear();
    }

    pub fn commands(&self) -> Vec<String> {
        self.state().commands.iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn chat_log(&self) -> Vec<ChatLine> {
        self.state().chat.clone()
    }

    /// Lines sent privately to `player`.
    pub fn messages_for(&self, player: &str) -> Vec<String> {
        self.state()
            .chat
            .iter()
            .filter(|l| l.to.as_deref() == Some(player))
            .map(|l| l.text.clone())
            .collect()
    }

    pub fn last_message_for(&self, player: &str) -> Option<String> {
        self.messages_for(player).pop()
    }

    pub fn clear_chat(&self) {
        self.state().chat.clear();
    }

    pub fn marker_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.state().markers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn marker_name(&self, id: &EntityId) -> Option<String> {
        self.state().markers.get(id).map(|m| m.name_tag.clone())
    }

    pub fn marker_location(&self, id: &EntityId) -> Option<Location> {
        self.state().markers.get(id).map(|m| m.location)
    }

    pub fn player_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .state()
            .players
            .iter()
            .filter(|(_, p)| p.online)
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    fn execute(state: &mut SimState, context: &CommandContext, command: &str) -> u32 {
        if state
            .failing_prefixes
            .iter()
            .any(|p| command.starts_with(p.as_str()))
        {
            return 0;
        }
        let args = tokenize(command);
        let Some(verb) = args.first() else { return 0 };
        let target = args.get(1).cloned().unwrap_or_default();
        let player = match state.players.get_mut(&target) {
            Some(p) if p.online => Some(p),
            _ => None,
        };
        match verb.as_str() {
            "give" => {
                let Some(p) = player else { return 0 };
                let Some(item) = args.get(2) else { return 0 };
                let amount = args.get(3).and_then(|a| a.parse().ok()).unwrap_or(1u32);
                *p.inventory.entry(item.clone()).or_insert(0) += amount;
                1
            }
            "clear" => {
                let Some(p) = player else { return 0 };
                let Some(item) = args.get(2) else { return 0 };
                let have = p.inventory.get(item).copied().unwrap_or(0);
                let want = args.get(4).and_then(|a| a.parse().ok()).unwrap_or(have);
                if have == 0 || have < want {
                    return 0;
                }
                p.inventory.insert(item.clone(), have - want);
                1
            }
            "tp" => {
                let Some(p) = player else { return 0 };
                let coords: Vec<i32> = args[2..]
                    .iter()
                    .take(3)
                    .filter_map(|a| a.parse().ok())
                    .collect();
                if coords.len() != 3 {
                    return 0;
                }
                let dimension = match context {
                    CommandContext::Dimension(d) => *d,
                    CommandContext::Player(_) => p.location.dimension,
                };
                p.location = Location::new(dimension, coords[0], coords[1], coords[2]);
                1
            }
            "tag" => {
                let Some(p) = player else { return 0 };
                match (args.get(2).map(String::as_str), args.get(3)) {
                    (Some("add"), Some(tag)) => u32::from(p.tags.insert(tag.clone())),
                    (Some("remove"), Some(tag)) => u32::from(p.tags.remove(tag)),
                    _ => 0,
                }
            }
            _ => 1,
        }
    }
}

/// Whitespace split that keeps double-quoted names together.
fn tokenize(command: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in command.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

impl CommandExecutor for SimulatedHost {
    async fn run_command(&self, context: &CommandContext, command: &str) -> Result<u32, HostError> {
        let mut state = self.state();
        state.commands.push((context.clone(), command.to_string()));
        let count = Self::execute(&mut state, context, command);
        debug!("sim command '{}' -> {}", command, count);
        Ok(count)
    }
}

impl UiPresenter for SimulatedHost {
    async fn show_form(&self, player: &str, form: &Form) -> Result<FormResponse, HostError> {
        let mut state = self.state();
        if !state.players.get(player).is_some_and(|p| p.online) {
            return Err(HostError::PlayerOffline(player.to_string()));
        }
        state.shown_forms.push((player.to_string(), form.clone()));
        let response = state
            .scripted_forms
            .get_mut(player)
            .and_then(VecDeque::pop_front)
            .unwrap_or(FormResponse::Cancelled(CancelReason::UserClosed));
        if self.echo {
            println!("[form → {}] {} => {:?}", player, form.title(), response);
        }
        Ok(response)
    }
}

impl Messenger for SimulatedHost {
    fn tell(&self, player: &str, message: &str) {
        if self.echo {
            println!("[→ {}] {}", player, message);
        }
        self.state().chat.push(ChatLine {
            to: Some(player.to_string()),
            text: message.to_string(),
        });
    }

    fn broadcast(&self, message: &str) {
        if self.echo {
            println!("[all] {}", message);
        }
        self.state().chat.push(ChatLine {
            to: None,
            text: message.to_string(),
        });
    }
}

impl WorldView for SimulatedHost {
    fn now(&self) -> DateTime<Utc> {
        self.state().now
    }

    fn is_online(&self, player: &str) -> bool {
        self.state().players.get(player).is_some_and(|p| p.online)
    }

    fn player_location(&self, player: &str) -> Option<Location> {
        self.state()
            .players
            .get(player)
            .filter(|p| p.online)
            .map(|p| p.location)
    }

    fn item_count(&self, player: &str, type_id: &str) -> u32 {
        self.state()
            .players
            .get(player)
            .and_then(|p| p.inventory.get(type_id).copied())
            .unwrap_or(0)
    }

    fn held_item(&self, player: &str) -> Option<ItemStack> {
        self.state().players.get(player).and_then(|p| p.held.clone())
    }

    fn set_held_item(&self, player: &str, item: ItemStack) -> Result<(), HostError> {
        let mut state = self.state();
        match state.players.get_mut(player) {
            Some(p) if p.online => {
                p.held = Some(item);
                Ok(())
            }
            _ => Err(HostError::PlayerOffline(player.to_string())),
        }
    }

    fn entity_exists(&self, id: &EntityId) -> bool {
        self.state().markers.contains_key(id)
    }

    fn spawn_marker(&self, type_id: &str, name_tag: &str, at: Location) -> Result<EntityId, HostError> {
        let id = EntityId(Uuid::new_v4().to_string());
        self.state().markers.insert(
            id.clone(),
            Marker {
                type_id: type_id.to_string(),
                name_tag: name_tag.to_string(),
                location: at,
            },
        );
        Ok(id)
    }

    fn despawn_entity(&self, id: &EntityId) -> bool {
        self.state().markers.remove(id).is_some()
    }
}
