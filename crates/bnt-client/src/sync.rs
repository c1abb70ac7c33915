use super::*;
use bnt_dto::Profile;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Storage key for the bearer token.
#[rustfmt::skip]
pub const TOKEN_KEY:   &str = "banter.token";
/// Storage key for the cached profile JSON.
#[rustfmt::skip]
pub const PROFILE_KEY: &str = "banter.profile";
/// Storage key for the pending-verification email marker.
#[rustfmt::skip]
pub const PENDING_KEY: &str = "banter.pending";

/// Token plus cached profile, as one tab sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub token: String,
    pub profile: Profile,
}

/// One tab's view onto the shared session storage.
///
/// Storage is the single source of truth. Commits write token first, then
/// profile; the reverse window (profile without token) is treated as a
/// half-written record and cleared on read. Wake signals carry no state.
pub struct Synchronizer<S> {
    store: Arc<S>,
    wakes: broadcast::Sender<()>,
}

impl<S> Synchronizer<S>
where
    S: SessionStore,
{
    pub fn new(store: Arc<S>) -> Self {
        let (wakes, _) = broadcast::channel(16);
        Self { store, wakes }
    }

    /// Persist a session: token first, then profile, then wake observers.
    pub fn commit(&self, token: &str, profile: &Profile) {
        let encoded = match serde_json::to_string(profile) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::error!("[sync] profile refused to encode: {}", e);
                return;
            }
        };
        self.store.set(TOKEN_KEY, token);
        self.store.set(PROFILE_KEY, &encoded);
        self.store.remove(PENDING_KEY);
        self.wake();
        log::debug!("[sync] committed session for {}", profile.handle);
    }

    /// Current session, or None. A corrupt or half-written record clears
    /// both keys so no tab ever acts on it.
    pub fn read(&self) -> Option<Snapshot> {
        let token = self.store.get(TOKEN_KEY);
        let raw = self.store.get(PROFILE_KEY);
        match (token, raw) {
            (Some(token), Some(raw)) => match serde_json::from_str::<Profile>(&raw) {
                Ok(profile) => Some(Snapshot { token, profile }),
                Err(e) => {
                    log::warn!("[sync] corrupt profile in storage, clearing: {}", e);
                    self.scrub();
                    None
                }
            },
            // commit writes token first; a token alone is the tolerated
            // login-to-profile-fetch window
            (Some(_), None) => None,
            (None, Some(_)) => {
                log::warn!("[sync] orphan profile in storage, clearing");
                self.scrub();
                None
            }
            (None, None) => None,
        }
    }

    /// Forget the session and wake observers.
    pub fn clear(&self) {
        self.scrub();
        self.wake();
    }

    /// Remember which email is awaiting its verification code.
    pub fn mark_pending(&self, email: &str) {
        self.store.set(PENDING_KEY, email);
    }
    pub fn pending(&self) -> Option<String> {
        self.store.get(PENDING_KEY)
    }
    pub fn clear_pending(&self) {
        self.store.remove(PENDING_KEY);
    }

    /// In-process wake signal for same-tab observers.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.wakes.subscribe()
    }

    /// The platform's cross-tab changed-key notifications.
    pub fn changes(&self) -> broadcast::Receiver<String> {
        self.store.changes()
    }

    /// Authenticated and verified: what protected views gate on.
    pub fn authenticated(&self) -> bool {
        self.read().map(|s| s.profile.verified).unwrap_or(false)
    }

    fn scrub(&self) {
        self.store.remove(TOKEN_KEY);
        self.store.remove(PROFILE_KEY);
    }

    fn wake(&self) {
        // no receivers is fine
        let _ = self.wakes.send(());
    }
}
