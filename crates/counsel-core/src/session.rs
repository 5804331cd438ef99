//! Session store: the single source of truth for "is the user signed in,
//! and who are they".
//!
//! Every mutation writes through to durable storage before (login) or
//! together with (logout) the in-memory change, so a reload observes the
//! same state. Transitions are published on the [`EventBus`].

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use counsel_types::{
    Result,
    event::ClientEvent,
    session::{Credential, Session, DEFAULT_TOKEN_TYPE},
    user::{UserProfile, UserUpdate},
};

use crate::event_bus::EventBus;
use crate::keys::{self, legacy};
use crate::persist::{discard, read_json, read_timed, write_json, write_timed};
use crate::ports::StoragePort;

pub struct SessionStore {
    storage: Rc<dyn StoragePort>,
    events: EventBus,
    state: RefCell<Session>,
}

impl SessionStore {
    /// A logged-out store. Call [`restore`](Self::restore) to pick up a
    /// previously persisted session.
    pub fn new(storage: Rc<dyn StoragePort>, events: EventBus) -> Self {
        Self {
            storage,
            events,
            state: RefCell::new(Session::Anonymous),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().user().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .borrow()
            .credential()
            .and_then(|c| c.refresh_token.clone())
    }

    /// `Authorization` header value when signed in
    pub fn authorization(&self) -> Option<String> {
        self.state.borrow().credential().map(Credential::authorization)
    }

    // ─── Mutations ───────────────────────────────────────────

    /// Sign in. Storage is written first; if that fails nothing changes in
    /// memory and the partial write is rolled back.
    pub fn login(&self, user: UserProfile, credential: Credential) -> Result<()> {
        if let Err(e) = self.persist(&user, &credential) {
            log::error!("Failed to persist session: {}", e);
            if let Err(e) = self.clear_storage() {
                log::warn!("Failed to roll back partial session: {}", e);
            }
            return Err(e);
        }

        let user_id = user.id;
        *self.state.borrow_mut() = Session::Authenticated { credential, user };
        log::info!("Signed in as user {}", user_id);
        self.events.emit(ClientEvent::LoggedIn { user_id });
        Ok(())
    }

    /// Sign out. Idempotent: a second call changes nothing and emits nothing.
    pub fn logout(&self) {
        self.teardown(ClientEvent::LoggedOut);
    }

    /// Forced sign-out after the server rejected the credential.
    pub fn expire(&self) {
        self.teardown(ClientEvent::SessionExpired);
    }

    /// Tear the session down if its credential has run out.
    pub fn check_expiry(&self, now: DateTime<Utc>) -> bool {
        let expired = self
            .state
            .borrow()
            .credential()
            .map_or(false, |c| c.is_expired(now));
        if expired {
            log::info!("Access token expired");
            self.expire();
        }
        expired
    }

    /// Merge `update` into the current user. `Ok(false)` when logged out.
    pub fn update_user(&self, update: &UserUpdate) -> Result<bool> {
        let Some(mut user) = self.current_user() else {
            return Ok(false);
        };
        user.merge(update);
        self.commit_user(user)
    }

    /// Replace the cached profile wholesale (after a profile fetch or token
    /// validation). `Ok(false)` when logged out.
    pub fn replace_user(&self, fresh: UserProfile) -> Result<bool> {
        self.commit_user(fresh)
    }

    /// Swap in a refreshed credential, keeping the refresh token when the
    /// new one carries none. `Ok(false)` when logged out; on a failed write
    /// the old credential stays in force.
    pub fn refresh(&self, mut credential: Credential) -> Result<bool> {
        let Some(previous) = self.state.borrow().credential().cloned() else {
            return Ok(false);
        };
        if credential.refresh_token.is_none() {
            credential.refresh_token = previous.refresh_token.clone();
        }
        if let Err(e) = self.persist_credential(&credential) {
            log::error!("Failed to persist refreshed token: {}", e);
            if let Err(e) = self.persist_credential(&previous) {
                log::warn!("Failed to restore previous token: {}", e);
            }
            return Err(e);
        }

        if let Session::Authenticated { credential: current, .. } = &mut *self.state.borrow_mut() {
            *current = credential;
        }
        log::info!("Access token refreshed");
        self.events.emit(ClientEvent::TokenRefreshed);
        Ok(true)
    }

    /// Re-hydrate from durable storage. A missing, malformed or expired
    /// token leaves the store logged out and purges the leftovers.
    pub fn restore(&self, now: DateTime<Utc>) -> bool {
        let flag = self.storage.get(legacy::IS_LOGGED_IN).ok().flatten();
        // Legacy keys only count when no current-format token was ever written.
        let restored = if flag.as_deref() == Some("false") {
            None
        } else if self.storage.exists(keys::AUTH_TOKEN).unwrap_or(false) {
            self.read_current(now)
        } else {
            self.read_legacy()
        };
        let authenticated = restored.is_some();

        match restored {
            Some((user, credential)) => {
                log::info!("Restored session for user {}", user.id);
                *self.state.borrow_mut() = Session::Authenticated { credential, user };
            }
            None => {
                *self.state.borrow_mut() = Session::Anonymous;
                if let Err(e) = self.clear_storage() {
                    log::warn!("Failed to purge stale session: {}", e);
                }
            }
        }

        self.events.emit(ClientEvent::Restored { authenticated });
        authenticated
    }

    // ─── Internals ───────────────────────────────────────────

    fn teardown(&self, event: ClientEvent) {
        let was_authenticated = std::mem::take(&mut *self.state.borrow_mut()).is_authenticated();
        if let Err(e) = self.clear_storage() {
            log::error!("Session storage not fully cleared: {}", e);
        }
        if was_authenticated {
            log::info!("Session ended: {:?}", event);
            self.events.emit(event);
        }
    }

    fn persist(&self, user: &UserProfile, credential: &Credential) -> Result<()> {
        self.persist_credential(credential)?;
        self.persist_user(user)?;
        self.storage.set(legacy::IS_LOGGED_IN, "true")
    }

    fn persist_credential(&self, credential: &Credential) -> Result<()> {
        write_timed(
            &*self.storage,
            keys::AUTH_TOKEN,
            &credential.access_token,
            credential.expires_at,
        )?;
        match credential.refresh_token {
            Some(ref refresh) => write_timed(&*self.storage, keys::REFRESH_TOKEN, refresh, None)?,
            None => discard(&*self.storage, keys::REFRESH_TOKEN),
        }
        self.storage.set(keys::TOKEN_TYPE, &credential.token_type)?;
        self.storage.set(legacy::TOKEN, &credential.access_token)
    }

    fn persist_user(&self, user: &UserProfile) -> Result<()> {
        write_timed(&*self.storage, keys::USER_INFO, user, None)?;
        write_json(&*self.storage, legacy::USER, user)
    }

    /// Storage first, memory only once the write went through.
    fn commit_user(&self, user: UserProfile) -> Result<bool> {
        let Some(previous) = self.current_user() else {
            return Ok(false);
        };
        if let Err(e) = self.persist_user(&user) {
            log::error!("Failed to persist user profile: {}", e);
            if let Err(e) = self.persist_user(&previous) {
                log::warn!("Failed to restore previous profile: {}", e);
            }
            return Err(e);
        }

        if let Session::Authenticated { user: current, .. } = &mut *self.state.borrow_mut() {
            *current = user;
        }
        self.events.emit(ClientEvent::ProfileUpdated);
        Ok(true)
    }

    /// The login flag is lowered first, so a store whose removals fail still
    /// restores as logged out.
    fn clear_storage(&self) -> Result<()> {
        let mut result = self.storage.set(legacy::IS_LOGGED_IN, "false");
        for key in [
            keys::AUTH_TOKEN,
            keys::USER_INFO,
            keys::REFRESH_TOKEN,
            keys::TOKEN_TYPE,
            legacy::TOKEN,
            legacy::USER,
        ] {
            let removed = self.storage.remove(key);
            result = result.and(removed);
        }
        result
    }

    fn read_current(&self, now: DateTime<Utc>) -> Option<(UserProfile, Credential)> {
        let token = read_timed::<String>(&*self.storage, keys::AUTH_TOKEN, now)?;
        if token.value.trim().is_empty() {
            return None;
        }
        let user = read_timed::<UserProfile>(&*self.storage, keys::USER_INFO, now)?;
        let refresh_token = read_timed::<String>(&*self.storage, keys::REFRESH_TOKEN, now)
            .map(|t| t.value);
        let token_type = self
            .storage
            .get(keys::TOKEN_TYPE)
            .ok()
            .flatten()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());

        Some((
            user.value,
            Credential {
                access_token: token.value,
                token_type,
                expires_at: token.expires_at,
                refresh_token,
            },
        ))
    }

    fn read_legacy(&self) -> Option<(UserProfile, Credential)> {
        let flag = self.storage.get(legacy::IS_LOGGED_IN).ok()??;
        if flag != "true" {
            return None;
        }
        let token = self.storage.get(legacy::TOKEN).ok()??;
        if token.trim().is_empty() {
            return None;
        }
        let user = read_json::<UserProfile>(&*self.storage, legacy::USER)?;
        log::info!("Restoring session from legacy keys");
        Some((user, Credential::bearer(token)))
    }
}
