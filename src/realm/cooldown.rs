//! Per-actor, per-action cooldowns.
//!
//! Held in memory only; a restart clears every cooldown. Callers pass `now`
//! explicitly so the gate never reads a clock of its own.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CooldownError {
    #[error("on cooldown for another {}ms", .remaining.num_milliseconds())]
    OnCooldown { remaining: Duration },
}

#[derive(Debug, Default)]
pub struct CooldownGate {
    /// (actor, action) -> expires_at
    entries: HashMap<(String, String), DateTime<Utc>>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the cooldown unless one is still running. A running cooldown is left as is.
    pub fn try_acquire(
        &mut self,
        actor: &str,
        action: &str,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), CooldownError> {
        let key = (actor.to_string(), action.to_string());
        if let Some(expires_at) = self.entries.get(&key) {
            if now < *expires_at {
                return Err(CooldownError::OnCooldown {
                    remaining: *expires_at - now,
                });
            }
        }
        self.entries.insert(key, now + duration);
        Ok(())
    }

    /// Fails like [`CooldownGate::try_acquire`] without starting anything.
    pub fn check(&mut self, actor: &str, action: &str, now: DateTime<Utc>) -> Result<(), CooldownError> {
        let remaining = self.remaining(actor, action, now);
        if remaining > Duration::zero() {
            return Err(CooldownError::OnCooldown { remaining });
        }
        Ok(())
    }

    /// Time left, zero when absent or expired. Expired entries are dropped here.
    pub fn remaining(&mut self, actor: &str, action: &str, now: DateTime<Utc>) -> Duration {
        let key = (actor.to_string(), action.to_string());
        match self.entries.get(&key) {
            Some(expires_at) if now < *expires_at => *expires_at - now,
            Some(_) => {
                self.entries.remove(&key);
                Duration::zero()
            }
            None => Duration::zero(),
        }
    }

    pub fn clear(&mut self, actor: &str, action: &str) -> bool {
        self.entries
            .remove(&(actor.to_string(), action.to_string()))
            .is_some()
    }

    pub fn clear_actor(&mut self, actor: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(a, _), _| a != actor);
        before - self.entries.len()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| now < *expires_at);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_never_exceeds_duration_and_hits_zero() {
        let mut gate = CooldownGate::new();
        let t = Utc::now();
        let d = Duration::seconds(30);
        gate.try_acquire("alex", "warp", d, t).unwrap();
        for s in 0..=30 {
            let r = gate.remaining("alex", "warp", t + Duration::seconds(s));
            assert!(r <= d);
            assert_eq!(r, d - Duration::seconds(s));
        }
        assert_eq!(gate.remaining("alex", "warp", t + Duration::seconds(31)), Duration::zero());
        assert!(gate.is_empty());
    }

    #[test]
    fn blocked_attempt_does_not_extend() {
        let mut gate = CooldownGate::new();
        let t = Utc::now();
        gate.try_acquire("alex", "warp", Duration::seconds(10), t).unwrap();
        let err = gate
            .try_acquire("alex", "warp", Duration::seconds(10), t + Duration::seconds(4))
            .unwrap_err();
        assert_eq!(
            err,
            CooldownError::OnCooldown {
                remaining: Duration::seconds(6)
            }
        );
        assert!(gate
            .try_acquire("alex", "warp", Duration::seconds(10), t + Duration::seconds(10))
            .is_ok());
    }

    #[test]
    fn actions_and_actors_are_independent() {
        let mut gate = CooldownGate::new();
        let t = Utc::now();
        gate.try_acquire("alex", "warp", Duration::seconds(10), t).unwrap();
        assert!(gate.try_acquire("alex", "coupon", Duration::seconds(10), t).is_ok());
        assert!(gate.try_acquire("bo", "warp", Duration::seconds(10), t).is_ok());
        assert_eq!(gate.clear_actor("alex"), 2);
        assert!(gate.check("alex", "warp", t).is_ok());
        assert!(gate.clear("bo", "warp"));
        assert!(!gate.clear("bo", "warp"));
    }

    #[test]
    fn sweep_drops_expired_only() {
        let mut gate = CooldownGate::new();
        let t = Utc::now();
        gate.try_acquire("a", "x", Duration::seconds(1), t).unwrap();
        gate.try_acquire("b", "x", Duration::seconds(60), t).unwrap();
        assert_eq!(gate.sweep(t + Duration::seconds(2)), 1);
        assert_eq!(gate.len(), 1);
    }
}
