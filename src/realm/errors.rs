use chrono::Duration;
use thiserror::Error;

use crate::host::HostError;
use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Failures a feature handler reports back to the acting player.
#[derive(Debug, Error)]
pub enum RealmError {
    /// Bad user input; nothing was touched.
    #[error("{0}")]
    Validation(String),

    /// The world is not in a state that allows the action.
    #[error("{0}")]
    Precondition(String),

    #[error("cooldown active, {} seconds remaining", remaining_secs(.remaining))]
    OnCooldown { remaining: Duration },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("host call failed: {0}")]
    Host(#[from] HostError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ValidationError> for RealmError {
    fn from(e: ValidationError) -> Self {
        RealmError::Validation(e.to_string())
    }
}

/// Seconds left, rounded up so "0 seconds" is never shown while still blocked.
pub fn remaining_secs(remaining: &Duration) -> i64 {
    let ms = remaining.num_milliseconds().max(0);
    (ms + 999) / 1000
}

impl RealmError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RealmError::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        RealmError::Precondition(msg.into())
    }

    /// Host and store failures are logged; the player sees a generic line.
    pub fn is_internal(&self) -> bool {
        matches!(self, RealmError::Host(_) | RealmError::Store(_))
    }

    /// Colored chat line for the acting player.
    pub fn player_message(&self) -> String {
        match self {
            RealmError::Validation(msg) | RealmError::Precondition(msg) => format!("§c{}", msg),
            RealmError::OnCooldown { remaining } => {
                format!("§c쿨타임 중입니다. {}초 후에 다시 시도하세요.", remaining_secs(remaining))
            }
            RealmError::PermissionDenied(_) => "§c권한이 없습니다.".to_string(),
            RealmError::Host(_) => "§c작업을 처리하지 못했습니다. 잠시 후 다시 시도하세요.".to_string(),
            RealmError::Store(_) => "§c데이터를 저장하지 못했습니다. 관리자에게 문의하세요.".to_string(),
        }
    }
}

pub type RealmResult<T> = Result<T, RealmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_message_rounds_up() {
        let err = RealmError::OnCooldown {
            remaining: Duration::milliseconds(1_200),
        };
        assert!(err.player_message().contains("2초"));
        assert!(!err.is_internal());
    }

    #[test]
    fn host_failures_are_generic_for_players() {
        let err = RealmError::from(HostError::CommandFailed("give".into()));
        assert!(err.is_internal());
        assert!(!err.player_message().contains("give"));
    }
}
