//! Player-to-player warp requests.
//!
//! `!워프 <player>` asks the target for permission. The target answers with
//! `!워프 수락` / `!워프 거절`, or the request expires after
//! `warp.request_timeout_secs`. An accepted request teleports the requester to the
//! target's position once `warp.teleport_delay_secs` have passed, and only then
//! starts the requester's cooldown.

use std::collections::HashMap;

use log::{debug, info};

use super::cooldown::CooldownGate;
use super::errors::{RealmError, RealmResult};
use super::request::{PendingRequest, RequestBook, RequestError, RequestId, RequestState};
use super::RealmTask;
use crate::config::Config;
use crate::host::{quoted, run_checked, CommandContext, Host, TaskHandle, TickScheduler};

pub const COOLDOWN_ACTION: &str = "warp";

#[derive(Debug, Clone)]
struct Transit {
    responder: String,
    handle: TaskHandle,
}

/// Pending warp requests and accepted teleports waiting for their delay.
#[derive(Debug, Default)]
pub struct WarpDesk {
    requests: RequestBook,
    in_transit: HashMap<String, Transit>,
}

impl WarpDesk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_for(&self, responder: &str) -> Option<&PendingRequest> {
        self.requests.pending_for(responder)
    }

    pub fn in_transit(&self, requester: &str) -> bool {
        self.in_transit.contains_key(requester)
    }

    pub fn request<H: Host>(
        &mut self,
        host: &H,
        config: &Config,
        cooldowns: &mut CooldownGate,
        scheduler: &mut TickScheduler<RealmTask>,
        requester: &str,
        target: &str,
    ) -> RealmResult<()> {
        if requester == target {
            return Err(RealmError::validation("자기 자신에게는 워프할 수 없습니다."));
        }
        if !host.is_online(target) {
            return Err(RealmError::precondition(format!(
                "{}님은 접속 중이 아닙니다.",
                target
            )));
        }
        let now = host.now();
        let remaining = cooldowns.remaining(requester, COOLDOWN_ACTION, now);
        if remaining > chrono::Duration::zero() {
            return Err(RealmError::OnCooldown { remaining });
        }
        if self.in_transit(requester) {
            return Err(RealmError::precondition("이미 워프 이동 중입니다."));
        }
        if let Some(outstanding) = self.requests.sent_by(requester).first() {
            return Err(RealmError::precondition(format!(
                "{}님에게 보낸 워프 요청이 아직 대기 중입니다.",
                outstanding.responder
            )));
        }
        let id = self
            .requests
            .send(requester, target, now)
            .map_err(|e| match e {
                RequestError::AlreadyPending { responder } => RealmError::precondition(format!(
                    "{}님은 이미 다른 워프 요청을 받고 있습니다.",
                    responder
                )),
                other => RealmError::precondition(other.to_string()),
            })?;
        scheduler.run_deferred(
            RealmTask::ExpireWarpRequest {
                responder: target.to_string(),
                id,
            },
            config.world.ticks_for(config.warp.request_timeout()),
        );
        info!("warp: {} -> {} requested (#{})", requester, target, id);
        host.tell(
            requester,
            &format!("§a{}님에게 워프 요청을 보냈습니다.", target),
        );
        host.tell(
            target,
            &format!(
                "§e{}님이 워프를 요청했습니다. {}초 안에 !워프 수락 또는 !워프 거절",
                requester, config.warp.request_timeout_secs
            ),
        );
        Ok(())
    }

    pub fn respond<H: Host>(
        &mut self,
        host: &H,
        config: &Config,
        scheduler: &mut TickScheduler<RealmTask>,
        responder: &str,
        accept: bool,
    ) -> RealmResult<()> {
        // an accept never replaces a teleport that is already counting down
        if accept {
            if let Some(pending) = self.requests.pending_for(responder) {
                if self.in_transit(&pending.requester) {
                    return Err(RealmError::precondition(format!(
                        "{}님은 이미 다른 곳으로 이동 중입니다.",
                        pending.requester
                    )));
                }
            }
        }
        let resolution = self
            .requests
            .respond(responder, accept)
            .map_err(|_| RealmError::precondition("받은 워프 요청이 없습니다."))?;
        let requester = resolution.request.requester;
        if resolution.state == RequestState::Rejected {
            info!("warp: {} rejected {}", responder, requester);
            host.tell(responder, &format!("§e{}님의 워프 요청을 거절했습니다.", requester));
            host.tell(&requester, &format!("§c{}님이 워프 요청을 거절했습니다.", responder));
            return Ok(());
        }

        let handle = scheduler.run_deferred(
            RealmTask::CompleteWarp {
                requester: requester.clone(),
            },
            config.world.ticks_for(config.warp.teleport_delay()),
        );
        self.in_transit.insert(
            requester.clone(),
            Transit {
                responder: responder.to_string(),
                handle,
            },
        );
        info!("warp: {} accepted {}", responder, requester);
        host.tell(responder, &format!("§a{}님의 워프 요청을 수락했습니다.", requester));
        host.tell(
            &requester,
            &format!(
                "§a{}님이 수락했습니다. {}초 후 이동합니다.",
                responder, config.warp.teleport_delay_secs
            ),
        );
        Ok(())
    }

    /// Timer callback. Does nothing unless request `id` is still pending.
    pub fn expire<H: Host>(&mut self, host: &H, responder: &str, id: RequestId) -> bool {
        let Some(resolution) = self.requests.expire(responder, id) else {
            debug!("warp: expiry #{} for {} already resolved", id, responder);
            return false;
        };
        let requester = &resolution.request.requester;
        info!("warp: request {} -> {} expired", requester, responder);
        host.tell(requester, &format!("§c{}님에게 보낸 워프 요청이 만료되었습니다.", responder));
        host.tell(responder, &format!("§7{}님의 워프 요청이 만료되었습니다.", requester));
        true
    }

    /// Timer callback for an accepted request.
    pub async fn complete<H: Host>(
        &mut self,
        host: &H,
        config: &Config,
        cooldowns: &mut CooldownGate,
        requester: &str,
    ) -> RealmResult<()> {
        let Some(transit) = self.in_transit.remove(requester) else {
            return Ok(());
        };
        let destination = match host.player_location(&transit.responder) {
            Some(loc) if host.is_online(requester) => loc,
            _ => {
                return Err(RealmError::precondition(
                    "워프 대상이 사라져 이동하지 못했습니다.",
                ))
            }
        };
        let command = format!(
            "tp {} {} {} {}",
            quoted(requester),
            destination.x,
            destination.y,
            destination.z
        );
        run_checked(host, &CommandContext::Dimension(destination.dimension), &command).await?;

        let now = host.now();
        cooldowns.clear(requester, COOLDOWN_ACTION);
        if let Err(e) = cooldowns.try_acquire(requester, COOLDOWN_ACTION, config.warp.cooldown(), now) {
            debug!("warp: cooldown for {} not started: {}", requester, e);
        }
        info!("warp: {} teleported to {} at {}", requester, transit.responder, destination);
        host.tell(requester, &format!("§a{}님에게 이동했습니다.", transit.responder));
        Ok(())
    }

    /// Drop requests and pending teleports involving a player who left.
    pub fn disconnect<H: Host>(
        &mut self,
        host: &H,
        scheduler: &mut TickScheduler<RealmTask>,
        player: &str,
    ) -> usize {
        let mut dropped = 0;
        for req in self.requests.cancel_involving(player) {
            let other = if req.requester == player {
                &req.responder
            } else {
                &req.requester
            };
            if host.is_online(other) {
                host.tell(other, &format!("§7{}님이 나가서 워프 요청이 취소되었습니다.", player));
            }
            dropped += 1;
        }
        let stale: Vec<String> = self
            .in_transit
            .iter()
            .filter(|(requester, t)| requester.as_str() == player || t.responder == player)
            .map(|(r, _)| r.clone())
            .collect();
        for requester in stale {
            if let Some(transit) = self.in_transit.remove(&requester) {
                scheduler.cancel(transit.handle);
                if requester != player && host.is_online(&requester) {
                    host.tell(&requester, "§c워프 대상이 나가서 이동이 취소되었습니다.");
                }
                dropped += 1;
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Dimension, Location, SimulatedHost, WorldView};
    use chrono::Utc;

    #[test]
    fn accepting_never_replaces_a_running_teleport() {
        let host = SimulatedHost::new(Utc::now());
        for p in ["steve", "alex", "notch"] {
            host.join(p, Location::new(Dimension::Overworld, 0, 64, 0));
        }
        let config = Config::default();
        let mut scheduler = TickScheduler::new();
        let mut desk = WarpDesk::new();
        let now = host.now();
        desk.requests.send("steve", "alex", now).unwrap();
        desk.requests.send("steve", "notch", now).unwrap();

        desk.respond(&host, &config, &mut scheduler, "alex", true).unwrap();
        assert!(desk
            .respond(&host, &config, &mut scheduler, "notch", true)
            .is_err());
        assert_eq!(desk.pending_for("notch").unwrap().requester, "steve");
        assert_eq!(desk.in_transit["steve"].responder, "alex");
        assert_eq!(scheduler.pending(), 1);

        // rejecting still works
        desk.respond(&host, &config, &mut scheduler, "notch", false).unwrap();
        assert!(desk.pending_for("notch").is_none());
    }
}
