use crate::error::{validation, InventoryError, InventoryResult};
use crate::model::{SessionState, UserId, UserIdentity};
use argon2::Argon2;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;
const HASH_LEN: usize = 32;

/// Email/password identity service the session gate signs in against.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Verifies the credentials and returns the signed-in identity.
    fn sign_in(&self, email: &str, password: &str) -> InventoryResult<UserIdentity>;

    /// Ends the provider-side session for `user`.
    fn sign_out(&self, user: &UserIdentity) -> InventoryResult<()>;
}

struct Account {
    uid: UserId,
    salt: [u8; 16],
    password_hash: [u8; HASH_LEN],
}

/// Account registry kept in process memory. Passwords are held as Argon2id hashes with a
/// random per-account salt.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: DashMap<String, Account>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account. Emails are compared case-insensitively.
    pub fn register(&self, email: &str, password: &str) -> InventoryResult<UserId> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(validation("a valid email address is required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        match self.accounts.entry(email.clone()) {
            Entry::Occupied(_) => Err(validation(format!("{email} is already registered"))),
            Entry::Vacant(vac) => {
                let uid = UserId::new();
                let salt = *Uuid::new_v4().as_bytes();
                vac.insert(Account {
                    uid,
                    salt,
                    password_hash: hash_password(password, &salt)?,
                });
                Ok(uid)
            }
        }
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn sign_in(&self, email: &str, password: &str) -> InventoryResult<UserIdentity> {
        let email = normalize_email(email);
        let rejected = || InventoryError::Auth("invalid email or password".into());
        let (uid, salt, expected) = self
            .accounts
            .get(&email)
            .map(|account| (account.uid, account.salt, account.password_hash))
            .ok_or_else(rejected)?;
        if hash_password(password, &salt)? != expected {
            return Err(rejected());
        }
        Ok(UserIdentity {
            uid,
            email,
            signed_in_at: OffsetDateTime::now_utc(),
        })
    }

    fn sign_out(&self, _user: &UserIdentity) -> InventoryResult<()> {
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str, salt: &[u8]) -> InventoryResult<[u8; HASH_LEN]> {
    let mut out = [0u8; HASH_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|err| InventoryError::Auth(format!("password hashing failed: {err}")))?;
    Ok(out)
}

type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

/// Signed-out / signed-in state machine with change notifications.
pub struct SessionGate {
    provider: Arc<dyn IdentityProvider>,
    state: RwLock<SessionState>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
}

impl SessionGate {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Arc<Self> {
        Arc::new(Self {
            provider,
            state: RwLock::new(SessionState::SignedOut),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.state.read().user().cloned()
    }

    /// Registers `callback` for state changes and calls it once with the current state.
    ///
    /// The callback stays registered until the returned subscription is dropped.
    pub fn on_auth_state_change(
        self: &Arc<Self>,
        callback: impl Fn(&SessionState) + Send + Sync + 'static,
    ) -> AuthSubscription {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(callback);
        self.listeners.lock().push((id, Arc::clone(&listener)));
        listener(&self.state());
        AuthSubscription {
            gate: Arc::downgrade(self),
            id,
        }
    }

    pub fn sign_in(&self, email: &str, password: &str) -> InventoryResult<UserIdentity> {
        let user = self.provider.sign_in(email, password).map_err(|err| {
            warn!(error = %err, "sign-in rejected");
            err
        })?;
        info!(uid = %user.uid.as_uuid(), "signed in");
        self.transition(SessionState::SignedIn(user.clone()));
        Ok(user)
    }

    /// Signs the current user out. A no-op when already signed out.
    pub fn sign_out(&self) -> InventoryResult<()> {
        let Some(user) = self.current_user() else {
            return Ok(());
        };
        self.provider.sign_out(&user)?;
        info!(uid = %user.uid.as_uuid(), "signed out");
        self.transition(SessionState::SignedOut);
        Ok(())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn transition(&self, next: SessionState) {
        *self.state.write() = next.clone();
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next);
        }
    }

    fn unsubscribe(&self, id: u64) {
        self.listeners.lock().retain(|(listener_id, _)| *listener_id != id);
    }
}

/// Keeps an auth-state callback registered; dropping it unsubscribes.
pub struct AuthSubscription {
    gate: Weak<SessionGate>,
    id: u64,
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.upgrade() {
            gate.unsubscribe(self.id);
        }
    }
}
