//! # Realm
//!
//! The gameplay state service. A [`Realm`] owns the durable [`RecordStore`], the
//! in-memory feature state (warp requests, cooldowns, tomb watches) and the tick
//! scheduler, and reacts to [`WorldEvent`]s delivered by the host.
//!
//! Events and ticks are processed one at a time by a single task. A handler may
//! await host calls (commands, forms); handlers that do so re-load their records
//! right before writing.
//!
//! Each handler is its own failure domain: an error is turned into a chat line for
//! the acting player (and a log line for host or store failures) and never reaches
//! the other handlers.

use log::{debug, info, warn};

use crate::config::Config;
use crate::host::events::{BlockEvent, EntityHurtEvent};
use crate::host::{EventOutcome, Host, TaskHandle, TickScheduler, WorldEvent};
use crate::logutil::escape_log;
use crate::storage::RecordStore;

pub mod bank;
pub mod commands;
pub mod cooldown;
pub mod coupon;
pub mod enchant;
pub mod errors;
pub mod guild;
pub mod lock;
pub mod request;
pub mod tomb;
pub mod warp;

pub use commands::{ChatCommand, CommandParseError};
pub use cooldown::{CooldownError, CooldownGate};
pub use errors::{RealmError, RealmResult};
pub use request::{RequestBook, RequestError, RequestId, RequestState};
pub use tomb::WatchRegistry;
pub use warp::WarpDesk;

use commands::{BankCommand, CouponCommand, GuildCommand, WarpCommand};

/// Work scheduled on the tick scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealmTask {
    ExpireWarpRequest { responder: String, id: RequestId },
    CompleteWarp { requester: String },
    CheckTombs,
    SweepCooldowns,
}

pub struct Realm<H: Host> {
    host: H,
    store: RecordStore,
    config: Config,
    scheduler: TickScheduler<RealmTask>,
    cooldowns: CooldownGate,
    warp: WarpDesk,
    tombs: WatchRegistry,
    periodic: Vec<TaskHandle>,
}

impl<H: Host> Realm<H> {
    pub fn new(host: H, store: RecordStore, config: Config) -> Self {
        let mut scheduler = TickScheduler::new();
        let mut periodic = Vec::new();
        if config.tomb.enabled {
            periodic.push(scheduler.run_periodic(RealmTask::CheckTombs, config.tomb.check_interval_ticks));
        }
        periodic.push(scheduler.run_periodic(
            RealmTask::SweepCooldowns,
            config.world.ticks_per_second() * 60,
        ));
        Self {
            host,
            store,
            config,
            scheduler,
            cooldowns: CooldownGate::new(),
            warp: WarpDesk::new(),
            tombs: WatchRegistry::new(),
            periodic,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cooldowns(&mut self) -> &mut CooldownGate {
        &mut self.cooldowns
    }

    pub fn warp(&self) -> &WarpDesk {
        &self.warp
    }

    pub fn tombs(&self) -> &WatchRegistry {
        &self.tombs
    }

    pub fn current_tick(&self) -> u64 {
        self.scheduler.current_tick()
    }

    /// Cancel the periodic housekeeping tasks.
    pub fn shutdown(&mut self) {
        for handle in self.periodic.drain(..) {
            self.scheduler.cancel(handle);
        }
    }

    /// Advance one tick and run whatever became due.
    pub async fn tick(&mut self) {
        for (_, task) in self.scheduler.advance() {
            self.run_task(task).await;
        }
    }

    async fn run_task(&mut self, task: RealmTask) {
        match task {
            RealmTask::ExpireWarpRequest { responder, id } => {
                self.warp.expire(&self.host, &responder, id);
            }
            RealmTask::CompleteWarp { requester } => {
                let result = self
                    .warp
                    .complete(&self.host, &self.config, &mut self.cooldowns, &requester)
                    .await;
                if let Err(e) = result {
                    self.report(&requester, &e);
                }
            }
            RealmTask::CheckTombs => {
                let report = self.tombs.check(&self.host, &self.config.tomb, self.host.now());
                if !report.disappeared.is_empty() || !report.expired.is_empty() {
                    debug!(
                        "tomb check: {} disappeared, {} expired",
                        report.disappeared.len(),
                        report.expired.len()
                    );
                }
            }
            RealmTask::SweepCooldowns => {
                let swept = self.cooldowns.sweep(self.host.now());
                if swept > 0 {
                    debug!("swept {} expired cooldowns", swept);
                }
            }
        }
    }

    fn report(&self, player: &str, err: &RealmError) {
        if err.is_internal() {
            warn!("{}: {}", player, err);
        } else {
            debug!("{}: {}", player, err);
        }
        if self.host.is_online(player) {
            self.host.tell(player, &err.player_message());
        }
    }

    /// Deliver one host event. The returned outcome tells the host whether to
    /// suppress its default behaviour.
    pub async fn handle_event(&mut self, event: WorldEvent) -> EventOutcome {
        debug!("event {}", event.kind());
        match event {
            WorldEvent::Chat(chat) => self.handle_chat(&chat.player, &chat.message).await,
            WorldEvent::ItemUse(use_event) => {
                if self.config.bank.enabled && use_event.item.type_id == self.config.bank.card_item {
                    if let Err(e) =
                        bank::open_menu(&self.host, &self.store, &self.config, &use_event.player).await
                    {
                        self.report(&use_event.player, &e);
                    }
                }
                EventOutcome::PASS
            }
            WorldEvent::BlockInteract(block) => self.guard_block(&block, false),
            WorldEvent::BlockBreak(block) => self.guard_block(&block, true),
            WorldEvent::BlockPlace(_) => EventOutcome::PASS,
            WorldEvent::EntityHurt(hurt) => self.handle_hurt(&hurt),
            WorldEvent::EntityDie(death) => {
                if self.config.tomb.enabled {
                    if let Err(e) = tomb::on_death(&self.host, &self.config.tomb, &mut self.tombs, &death) {
                        if let Some(victim) = death.victim.player_name() {
                            self.report(victim, &e);
                        }
                    }
                }
                EventOutcome::PASS
            }
            WorldEvent::PlayerJoin { player } => {
                info!("{} joined", player);
                EventOutcome::PASS
            }
            WorldEvent::PlayerLeave { player } => {
                self.disconnect(&player);
                EventOutcome::PASS
            }
            WorldEvent::PlayerSpawn { player, initial } => {
                debug!("{} spawned (initial: {})", player, initial);
                EventOutcome::PASS
            }
        }
    }

    fn disconnect(&mut self, player: &str) {
        let requests = self.warp.disconnect(&self.host, &mut self.scheduler, player);
        let markers = self.tombs.release_owner(&self.host, player);
        info!(
            "{} left ({} warp entries, {} tomb markers released)",
            player, requests, markers
        );
    }

    fn guard_block(&mut self, block: &BlockEvent, breaking: bool) -> EventOutcome {
        if !self.config.locks.enabled {
            return EventOutcome::PASS;
        }
        let result = if breaking {
            lock::on_break(&self.host, &self.store, &self.config, block)
        } else {
            lock::on_interact(&self.host, &self.store, &self.config, block, self.host.now())
        };
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report(&block.player, &e);
                EventOutcome::CANCEL
            }
        }
    }

    fn handle_hurt(&mut self, hurt: &EntityHurtEvent) -> EventOutcome {
        if !self.config.guild.enabled || self.config.guild.friendly_fire {
            return EventOutcome::PASS;
        }
        let (Some(victim), Some(attacker)) = (
            hurt.victim.player_name(),
            hurt.attacker.as_ref().and_then(|a| a.player_name()),
        ) else {
            return EventOutcome::PASS;
        };
        if victim == attacker {
            return EventOutcome::PASS;
        }
        match guild::same_guild(&self.store, victim, attacker) {
            Ok(true) => {
                self.host.tell(attacker, "§c같은 길드원은 공격할 수 없습니다.");
                EventOutcome::CANCEL
            }
            Ok(false) => EventOutcome::PASS,
            Err(e) => {
                warn!("friendly fire check failed: {}", e);
                EventOutcome::PASS
            }
        }
    }

    async fn handle_chat(&mut self, player: &str, message: &str) -> EventOutcome {
        match commands::parse(message, &self.config.commands.prefix) {
            Ok(None) => {
                debug!("chat <{}> {}", player, escape_log(message));
                EventOutcome::PASS
            }
            Ok(Some(command)) => {
                debug!("command <{}> {}", player, escape_log(message));
                if let Err(e) = self.dispatch(player, command).await {
                    self.report(player, &e);
                }
                EventOutcome::CANCEL
            }
            Err(e) => {
                self.host.tell(player, &format!("§c{}", e));
                EventOutcome::CANCEL
            }
        }
    }

    fn require(&self, enabled: bool) -> RealmResult<()> {
        if enabled {
            Ok(())
        } else {
            Err(RealmError::precondition("이 서버에서는 사용할 수 없는 기능입니다."))
        }
    }

    fn require_admin(&self, player: &str) -> RealmResult<()> {
        if self.config.world.is_admin(player) {
            Ok(())
        } else {
            Err(RealmError::PermissionDenied(format!("{} is not an admin", player)))
        }
    }

    async fn dispatch(&mut self, player: &str, command: ChatCommand) -> RealmResult<()> {
        match command {
            ChatCommand::Help => {
                for line in commands::help_text(&self.config.commands.prefix).lines() {
                    self.host.tell(player, line);
                }
                Ok(())
            }
            ChatCommand::Bank(cmd) => {
                self.require(self.config.bank.enabled)?;
                self.dispatch_bank(player, cmd).await
            }
            ChatCommand::Guild(cmd) => {
                self.require(self.config.guild.enabled)?;
                self.dispatch_guild(player, cmd).await
            }
            ChatCommand::Warp(cmd) => {
                self.require(self.config.warp.enabled)?;
                match cmd {
                    WarpCommand::Request { target } => self.warp.request(
                        &self.host,
                        &self.config,
                        &mut self.cooldowns,
                        &mut self.scheduler,
                        player,
                        &target,
                    ),
                    WarpCommand::Accept => {
                        self.warp
                            .respond(&self.host, &self.config, &mut self.scheduler, player, true)
                    }
                    WarpCommand::Reject => {
                        self.warp
                            .respond(&self.host, &self.config, &mut self.scheduler, player, false)
                    }
                }
            }
            ChatCommand::Coupon(cmd) => {
                self.require(self.config.coupon.enabled)?;
                self.dispatch_coupon(player, cmd).await
            }
            ChatCommand::Enchant { id, level } => {
                self.require(self.config.enchant.enabled)?;
                if self.config.enchant.admin_only {
                    self.require_admin(player)?;
                }
                let item = enchant::enchant_held(&self.host, player, &id, level)?;
                self.host.tell(player, "§a인챈트를 적용했습니다.");
                for line in enchant::lore_lines(&item) {
                    self.host.tell(player, &line);
                }
                Ok(())
            }
        }
    }

    async fn dispatch_bank(&mut self, player: &str, cmd: BankCommand) -> RealmResult<()> {
        let bank = &self.config.bank;
        match cmd {
            BankCommand::Menu => bank::open_menu(&self.host, &self.store, &self.config, player).await,
            BankCommand::Open => {
                bank::open_account(&self.store, player, self.host.now())?;
                self.host.tell(player, "§a계좌가 개설되었습니다.");
                Ok(())
            }
            BankCommand::Balance => {
                let balance = bank::balance(&self.store, bank, player, self.host.now())?;
                self.host
                    .tell(player, &format!("§a잔액: {}", bank::format_amount(balance)));
                Ok(())
            }
            BankCommand::Deposit(amount) => {
                let balance = bank::deposit(&self.host, &self.store, bank, player, amount).await?;
                self.host.tell(
                    player,
                    &format!(
                        "§a{} 입금 완료. 잔액: {}",
                        bank::format_amount(amount),
                        bank::format_amount(balance)
                    ),
                );
                Ok(())
            }
            BankCommand::Withdraw(amount) => {
                let balance = bank::withdraw(&self.host, &self.store, bank, player, amount).await?;
                self.host.tell(
                    player,
                    &format!(
                        "§a{} 출금 완료. 잔액: {}",
                        bank::format_amount(amount),
                        bank::format_amount(balance)
                    ),
                );
                Ok(())
            }
        }
    }

    async fn dispatch_guild(&mut self, player: &str, cmd: GuildCommand) -> RealmResult<()> {
        let config = &self.config.guild;
        match cmd {
            GuildCommand::Create { name, description } => {
                guild::create(&self.host, &self.store, config, player, &name, &description).await?;
                Ok(())
            }
            GuildCommand::Join { name } => {
                let name = guild::request_join(&self.host, &self.store, config, player, &name)?;
                self.host
                    .tell(player, &format!("§a'{}' 길드에 가입을 신청했습니다.", name));
                Ok(())
            }
            GuildCommand::Accept { player: target } => {
                guild::accept(&self.host, &self.store, config, player, &target).await
            }
            GuildCommand::Reject { player: target } => {
                guild::reject(&self.host, &self.store, player, &target)
            }
            GuildCommand::Leave => guild::leave(&self.host, &self.store, config, player).await,
            GuildCommand::Kick { player: target } => {
                guild::kick(&self.host, &self.store, config, player, &target).await
            }
            GuildCommand::Disband => {
                guild::disband(&self.host, &self.store, config, player).await?;
                Ok(())
            }
            GuildCommand::Info { name } => {
                for line in guild::info(&self.store, player, name.as_deref())? {
                    self.host.tell(player, &line);
                }
                Ok(())
            }
            GuildCommand::List => {
                let guilds = guild::list(&self.store)?;
                if guilds.is_empty() {
                    self.host.tell(player, "§7등록된 길드가 없습니다.");
                }
                for (name, members) in guilds {
                    self.host.tell(player, &format!("§f{} §7({}명)", name, members));
                }
                Ok(())
            }
        }
    }

    async fn dispatch_coupon(&mut self, player: &str, cmd: CouponCommand) -> RealmResult<()> {
        match cmd {
            CouponCommand::Redeem { code } => {
                coupon::redeem(&self.host, &self.store, player, &code).await?;
                Ok(())
            }
            CouponCommand::Create { code, item, amount } => {
                self.require_admin(player)?;
                let code = coupon::create(
                    &self.store,
                    &self.config.coupon,
                    player,
                    code.as_deref(),
                    &item,
                    amount,
                    self.host.now(),
                )?;
                self.host.tell(
                    player,
                    &format!("§a쿠폰 {} 생성: {} x{}", code, item, amount),
                );
                Ok(())
            }
            CouponCommand::Delete { code } => {
                self.require_admin(player)?;
                let code = coupon::delete(&self.store, player, &code)?;
                self.host.tell(player, &format!("§e쿠폰 {} 삭제됨", code));
                Ok(())
            }
            CouponCommand::List => {
                self.require_admin(player)?;
                let coupons = coupon::list(&self.store)?;
                if coupons.is_empty() {
                    self.host.tell(player, "§7등록된 쿠폰이 없습니다.");
                }
                for (code, c) in coupons {
                    self.host
                        .tell(player, &format!("§f{} §7- {} x{} ({})", code, c.item, c.amount, c.created_by));
                }
                Ok(())
            }
        }
    }
}
