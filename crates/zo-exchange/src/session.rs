//! Trading session record and lifecycle.
//!
//! Lifecycle: `None -> Creating -> Live -> Expiring -> None`. From
//! `Live`, when the remaining life drops below the renewal threshold
//! the session moves to `Expiring` and a replacement is created; the
//! new session atomically replaces the old on success. Any venue
//! response indicating expiry invalidates the state back to `None`.

use chrono::{DateTime, Duration, Utc};
use zo_wire::SessionKeypair;

/// Session lifetime requested at creation: one hour.
pub const SESSION_LIFETIME_SECS: u64 = 3600;

/// Renew opportunistically when less than this remains: five minutes.
pub const RENEW_BEFORE_SECS: i64 = 300;

/// A live trading session: venue-issued id plus the ephemeral keypair
/// that signs every action sent under it.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: u64,
    pub keypair: SessionKeypair,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the remaining life has fallen below the renewal
    /// threshold.
    pub fn needs_renewal(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(RENEW_BEFORE_SECS) >= self.expires_at
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    /// No session; next action must create one.
    #[default]
    None,
    /// Creation in flight.
    Creating,
    /// Valid session.
    Live(Session),
    /// Near expiry; replacement creation in flight, old session still
    /// usable until replaced.
    Expiring(Session),
}

impl SessionState {
    /// The session usable for signing right now, if any.
    pub fn usable(&self) -> Option<&Session> {
        match self {
            Self::Live(s) | Self::Expiring(s) => Some(s),
            Self::None | Self::Creating => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(expires_at: DateTime<Utc>) -> Session {
        Session {
            id: 1,
            keypair: SessionKeypair::generate(),
            expires_at,
        }
    }

    #[test]
    fn test_needs_renewal_threshold() {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        // 10 minutes of life left: fine
        assert!(!session(now + Duration::minutes(10)).needs_renewal(now));
        // exactly 5 minutes left: renew
        assert!(session(now + Duration::minutes(5)).needs_renewal(now));
        // already expired: renew
        assert!(session(now - Duration::minutes(1)).needs_renewal(now));
    }

    #[test]
    fn test_usable_states() {
        let now = Utc::now();
        assert!(SessionState::None.usable().is_none());
        assert!(SessionState::Creating.usable().is_none());
        assert!(SessionState::Live(session(now)).usable().is_some());
        assert!(SessionState::Expiring(session(now)).usable().is_some());
        assert!(!SessionState::Expiring(session(now)).is_live());
    }
}
