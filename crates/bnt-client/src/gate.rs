use super::*;
use bnt_core::RECONNECT_CEILING;
use bnt_core::RECONNECT_FLOOR;
use std::time::Duration;

/// What the realtime link should do after an auth-state observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Establish the connection with the current token.
    Connect,
    /// Leave the existing connection alone.
    Keep,
    /// Tear down and dial again: tokens are never swapped in place.
    Reconnect,
    /// Tear down and stay down.
    Teardown,
    /// Stay disconnected.
    Idle,
}

/// Decides when the persistent realtime connection may exist.
///
/// The connection is established only when a token is present at mount
/// time; any token change afterwards is a full reconnect cycle.
#[derive(Debug)]
pub struct Gate {
    token: Option<String>,
}

impl Gate {
    /// Mount-time decision: connect only if a session is already present.
    pub fn mount(snapshot: Option<&Snapshot>) -> (Self, Directive) {
        let token = snapshot.map(|s| s.token.clone());
        let directive = match token.is_some() {
            true => Directive::Connect,
            false => Directive::Idle,
        };
        (Self { token }, directive)
    }
    /// Reacts to a re-read of auth state after a wake signal.
    pub fn observe(&mut self, token: Option<&str>) -> Directive {
        let directive = match (self.token.as_deref(), token) {
            (None, None) => Directive::Idle,
            (None, Some(_)) => Directive::Connect,
            (Some(_), None) => Directive::Teardown,
            (Some(old), Some(new)) if old == new => Directive::Keep,
            (Some(_), Some(_)) => Directive::Reconnect,
        };
        self.token = token.map(str::to_string);
        if directive != Directive::Keep && directive != Directive::Idle {
            log::info!("[gate] auth state moved, link directive {:?}", directive);
        }
        directive
    }
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Capped exponential delays for the indefinite reconnect loop.
#[derive(Debug, Default)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self::default()
    }
    /// Delay before the next dial attempt, doubling up to the ceiling.
    pub fn next(&mut self) -> Duration {
        let exponent = self.attempt.min(16);
        self.attempt = self.attempt.saturating_add(1);
        RECONNECT_FLOOR
            .saturating_mul(1u32 << exponent)
            .min(RECONNECT_CEILING)
    }
    /// Back to the floor after a successful handshake.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bnt_dto::Profile;

    fn snapshot(token: &str) -> Snapshot {
        Snapshot {
            token: token.to_string(),
            profile: Profile {
                id: "id".to_string(),
                email: "jane@x.com".to_string(),
                handle: "jane".to_string(),
                verified: true,
                avatar: None,
            },
        }
    }

    #[test]
    fn mount_without_session_idles() {
        let (gate, directive) = Gate::mount(None);
        assert_eq!(directive, Directive::Idle);
        assert!(gate.token().is_none());
    }
    #[test]
    fn mount_with_session_connects() {
        let (gate, directive) = Gate::mount(Some(&snapshot("tok-1")));
        assert_eq!(directive, Directive::Connect);
        assert_eq!(gate.token(), Some("tok-1"));
    }
    #[test]
    fn unchanged_token_keeps_link() {
        let (mut gate, _) = Gate::mount(Some(&snapshot("tok-1")));
        assert_eq!(gate.observe(Some("tok-1")), Directive::Keep);
    }
    #[test]
    fn token_change_is_full_reconnect() {
        let (mut gate, _) = Gate::mount(Some(&snapshot("tok-1")));
        assert_eq!(gate.observe(Some("tok-2")), Directive::Reconnect);
        assert_eq!(gate.token(), Some("tok-2"));
    }
    #[test]
    fn logout_tears_down() {
        let (mut gate, _) = Gate::mount(Some(&snapshot("tok-1")));
        assert_eq!(gate.observe(None), Directive::Teardown);
        assert_eq!(gate.observe(None), Directive::Idle);
    }
    #[test]
    fn login_after_idle_connects() {
        let (mut gate, _) = Gate::mount(None);
        assert_eq!(gate.observe(Some("tok-1")), Directive::Connect);
    }
    #[test]
    fn backoff_doubles_to_ceiling() {
        let mut backoff = Backoff::new();
        let mut last = Duration::ZERO;
        for _ in 0..16 {
            let delay = backoff.next();
            assert!(delay >= last);
            assert!(delay <= RECONNECT_CEILING);
            last = delay;
        }
        assert_eq!(last, RECONNECT_CEILING);
        backoff.reset();
        assert_eq!(backoff.next(), RECONNECT_FLOOR);
    }
}
