//! # Realmkeeper - Gameplay State Service for Scripted Game Worlds
//!
//! Realmkeeper owns the gameplay state of a scripted game server: bank accounts,
//! guilds, reward coupons, container locks, PvP tombs, custom enchantments and
//! player-to-player warps. The game server's scripting host feeds it world events;
//! realmkeeper answers through a handful of narrow host traits (commands, forms,
//! chat, world queries).
//!
//! ## Features
//!
//! - **Durable Record Store**: one persisted slot per namespace, corruption-tolerant loads,
//!   single-save multi-record updates, sled / JSON file / in-memory backends.
//! - **Negotiated Requests**: at most one pending request per responder, accept / reject /
//!   expire, stale expiry timers are harmless.
//! - **Cooldown Gate**: per-actor, per-action cooldowns with explicit clocks.
//! - **Tick Scheduler**: deferred and periodic tasks as plain data.
//! - **Snapshots**: tar.gz world snapshots with SHA-256 verification.
//! - **Chat Commands**: Korean and English keywords behind a configurable prefix.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use realmkeeper::config::Config;
//! use realmkeeper::host::{SimulatedHost, WorldEvent};
//! use realmkeeper::realm::Realm;
//! use realmkeeper::storage::{MemoryBackend, RecordStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = RecordStore::new(MemoryBackend::new());
//!     let mut realm = Realm::new(SimulatedHost::default(), store, config);
//!
//!     realm.handle_event(WorldEvent::chat("Steve", "!은행 개설")).await;
//!     realm.tick().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`realm`] - the event-driven gameplay features and their core state machines
//! - [`host`] - host collaborator traits, events, forms, tick scheduler, simulated host
//! - [`storage`] - record store, persistence backends and snapshots
//! - [`config`] - configuration management and validation
//! - [`console`] - stdin console driving the simulated host
//! - [`validation`] - player input validation
//! - [`logutil`] - log line escaping
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   Game Host     │ ← events in; commands, forms, chat out
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │     Realm       │ ← feature handlers, requests, cooldowns, scheduler
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Record Store   │ ← durable namespaced records
//! └─────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod host;
pub mod logutil;
pub mod realm;
pub mod storage;
pub mod validation;
