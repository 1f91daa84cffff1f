use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::auth::{
    generate_access_token, hash_password, verify_password, IdentityAdmin, IdentityProvider,
    AUTH_EVENT_CAPACITY,
};
use crate::directory::Directory;
use crate::error::{AuthError, LookupError, StoreError};
use crate::models::{
    AuthEvent, Club, IdentityUser, NewAccount, Profile, Session, UserMetadata, UserRecord,
};

#[derive(Debug, Clone)]
struct Account {
    identity: IdentityUser,
    password_hash: String,
}

/// In-memory identity provider for testing and local development.
///
/// Behaves like a browser-side provider client: the last successful sign-in
/// becomes the persisted session returned by [`IdentityProvider::get_session`].
#[derive(Clone, Debug)]
pub struct MemoryIdentity {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    tokens: Arc<Mutex<HashMap<String, String>>>,
    current: Arc<Mutex<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
    unavailable: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl Default for MemoryIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentity {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            accounts: Arc::default(),
            tokens: Arc::default(),
            current: Arc::default(),
            events,
            unavailable: Arc::default(),
            fail_deletes: Arc::default(),
        }
    }

    /// Add an identity with a fixed id.
    pub fn insert_identity(&self, identity: IdentityUser, password: &str) -> Result<(), AuthError> {
        let password_hash = hash_password(password)?;
        self.accounts.lock().unwrap().insert(
            identity.id.clone(),
            Account {
                identity,
                password_hash,
            },
        );
        Ok(())
    }

    /// Rotate the token of an existing session and emit [`AuthEvent::TokenRefreshed`].
    pub fn refresh_token(&self, access_token: &str) -> Result<Session, AuthError> {
        self.check_available()?;
        let user_id = self
            .tokens
            .lock()
            .unwrap()
            .remove(access_token)
            .ok_or(AuthError::SessionExpired)?;
        let identity = self
            .identity(&user_id)
            .ok_or(AuthError::SessionExpired)?;
        let session = self.issue(identity);
        let _ = self.events.send(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    /// Make every provider call fail with [`AuthError::Provider`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn identity_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    fn identity(&self, user_id: &str) -> Option<IdentityUser> {
        self.accounts
            .lock()
            .unwrap()
            .get(user_id)
            .map(|a| a.identity.clone())
    }

    fn issue(&self, identity: IdentityUser) -> Session {
        let access_token = generate_access_token();
        self.tokens
            .lock()
            .unwrap()
            .insert(access_token.clone(), identity.id.clone());
        let session = Session {
            access_token,
            user: identity,
        };
        *self.current.lock().unwrap() = Some(session.clone());
        session
    }

    fn check_available(&self) -> Result<(), AuthError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::Provider("identity provider unreachable".into()));
        }
        Ok(())
    }
}

impl IdentityProvider for MemoryIdentity {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.check_available()?;
        let email = email.trim().to_lowercase();
        let account = self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.identity.email == email)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue(account.identity);
        let _ = self.events.send(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        self.check_available()?;
        self.tokens.lock().unwrap().remove(access_token);
        {
            let mut current = self.current.lock().unwrap();
            if current.as_ref().is_some_and(|s| s.access_token == access_token) {
                *current = None;
            }
        }
        let _ = self.events.send(AuthEvent::SignedOut);
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        self.check_available()?;
        Ok(self.current.lock().unwrap().clone())
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<IdentityUser>, AuthError> {
        self.check_available()?;
        let user_id = self.tokens.lock().unwrap().get(access_token).cloned();
        Ok(user_id.and_then(|id| self.identity(&id)))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

impl IdentityAdmin for MemoryIdentity {
    async fn sign_up(&self, account: &NewAccount) -> Result<IdentityUser, AuthError> {
        self.check_available()?;
        let password_hash = hash_password(&account.password)?;
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.values().any(|a| a.identity.email == account.email) {
            return Err(AuthError::AccountExists);
        }

        let identity = IdentityUser {
            id: Uuid::new_v4().to_string(),
            email: account.email.clone(),
            metadata: UserMetadata {
                role: Some(account.role),
                name: Some(account.name.clone()),
            },
        };
        accounts.insert(
            identity.id.clone(),
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        Ok(identity)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), AuthError> {
        self.check_available()?;
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AuthError::Provider("delete rejected".into()));
        }
        self.accounts.lock().unwrap().remove(user_id);
        self.tokens.lock().unwrap().retain(|_, id| id != user_id);
        Ok(())
    }
}

/// In-memory directory for testing and local development.
///
/// Lookups can be made to fail, or held at a gate until released, to exercise
/// degraded and superseded reconciliation passes.
#[derive(Clone, Debug)]
pub struct MemoryDirectory {
    profiles: Arc<Mutex<HashMap<String, Profile>>>,
    clubs: Arc<Mutex<Vec<Club>>>,
    records: Arc<Mutex<HashMap<String, UserRecord>>>,
    fail_profiles: Arc<AtomicBool>,
    fail_clubs: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    gate: Arc<watch::Sender<bool>>,
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            profiles: Arc::default(),
            clubs: Arc::default(),
            records: Arc::default(),
            fail_profiles: Arc::default(),
            fail_clubs: Arc::default(),
            fail_writes: Arc::default(),
            gate: Arc::new(gate),
        }
    }

    pub fn insert_club(&self, club: Club) {
        self.clubs.lock().unwrap().push(club);
    }

    pub fn remove_club(&self, club_id: &str) {
        self.clubs.lock().unwrap().retain(|c| c.id != club_id);
    }

    pub fn set_profile(&self, user_id: &str, profile: Profile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(user_id.to_string(), profile);
    }

    pub fn user_record(&self, user_id: &str) -> Option<UserRecord> {
        self.records.lock().unwrap().get(user_id).cloned()
    }

    pub fn fail_profile_lookups(&self, fail: bool) {
        self.fail_profiles.store(fail, Ordering::SeqCst);
    }

    pub fn fail_club_lookups(&self, fail: bool) {
        self.fail_clubs.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Block lookups until [`release_lookups`](Self::release_lookups) is called.
    pub fn hold_lookups(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_lookups(&self) {
        self.gate.send_replace(true);
    }

    async fn pass_gate(&self) {
        let mut gate = self.gate.subscribe();
        loop {
            let open = *gate.borrow_and_update();
            if open || gate.changed().await.is_err() {
                break;
            }
        }
    }
}

impl Directory for MemoryDirectory {
    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, LookupError> {
        self.pass_gate().await;
        if self.fail_profiles.load(Ordering::SeqCst) {
            return Err(LookupError::new("profiles", "connection reset"));
        }
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    async fn fetch_club_by_representative(&self, user_id: &str) -> Result<Option<Club>, LookupError> {
        self.pass_gate().await;
        if self.fail_clubs.load(Ordering::SeqCst) {
            return Err(LookupError::new("clubs", "connection reset"));
        }
        Ok(self
            .clubs
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.representative_id.as_deref() == Some(user_id))
            .cloned())
    }

    async fn insert_user_record(&self, record: &UserRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new("users", "connection reset"));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn upsert_profile(&self, user_id: &str, profile: &Profile) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::new("profiles", "connection reset"));
        }
        self.set_profile(user_id, profile.clone());
        Ok(())
    }
}
