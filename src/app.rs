use crate::auth::{AuthSubscription, IdentityProvider, SessionGate};
use crate::config::InventoryConfig;
use crate::create_item_store;
use crate::debounce::Debouncer;
use crate::error::{InventoryError, InventoryResult};
use crate::model::{InventoryItem, SessionState, UserIdentity};
use crate::mutation::{MutationOutcome, QuantityMutator};
use crate::search::filter_with;
use crate::store::ItemStore;
use crate::sync::InventorySync;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::warn;

/// Top-level application state: session, item list and search term.
///
/// Item intents are refused while signed out. Signing in performs the first refresh;
/// signing out drops the cached list.
pub struct InventoryApp {
    config: InventoryConfig,
    gate: Arc<SessionGate>,
    sync: Arc<InventorySync>,
    mutator: QuantityMutator,
    search_term: Arc<RwLock<String>>,
    search_input: Debouncer<String>,
    subscription: Mutex<Option<AuthSubscription>>,
}

impl InventoryApp {
    pub fn new(config: InventoryConfig, store: Arc<dyn ItemStore>, gate: Arc<SessionGate>) -> Self {
        let sync = Arc::new(InventorySync::new(store));
        let mutator = QuantityMutator::from_config(Arc::clone(&sync), &config);

        let search_term = Arc::new(RwLock::new(String::new()));
        let debounced_term = Arc::clone(&search_term);
        let search_input = Debouncer::new(config.search_debounce(), move |value: String| {
            *debounced_term.write() = value;
        });

        let listener_sync = Arc::clone(&sync);
        let subscription = gate.on_auth_state_change(move |state| match state {
            SessionState::SignedIn(_) => {
                if let Err(err) = listener_sync.refresh() {
                    warn!(error = %err, "initial inventory sync failed");
                }
            }
            SessionState::SignedOut => listener_sync.clear(),
        });

        Self {
            config,
            gate,
            sync,
            mutator,
            search_term,
            search_input,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Builds the store named by `config` and a fresh session gate over `provider`.
    pub fn from_config(
        config: InventoryConfig,
        provider: Arc<dyn IdentityProvider>,
    ) -> InventoryResult<Self> {
        config.validate()?;
        let store = create_item_store(&config)?;
        Ok(Self::new(config, store, SessionGate::new(provider)))
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    pub fn session(&self) -> SessionState {
        self.gate.state()
    }

    pub fn sign_in(&self, email: &str, password: &str) -> InventoryResult<UserIdentity> {
        self.gate.sign_in(email, password)
    }

    pub fn sign_out(&self) -> InventoryResult<()> {
        self.search_input.cancel();
        self.gate.sign_out()
    }

    /// Signs out and detaches from the session gate.
    pub fn shutdown(&self) -> InventoryResult<()> {
        let result = self.sign_out();
        drop(self.subscription.lock().take());
        self.sync.clear();
        result
    }

    pub fn refresh(&self) -> InventoryResult<Arc<[InventoryItem]>> {
        self.require_signed_in()?;
        self.sync.refresh()
    }

    pub fn add_item(
        &self,
        name: &str,
        category: &str,
        image: Option<String>,
    ) -> InventoryResult<MutationOutcome> {
        self.require_signed_in()?;
        self.mutator.add_or_increment(name, category, image)
    }

    pub fn increase_quantity(&self, name: &str) -> InventoryResult<MutationOutcome> {
        self.require_signed_in()?;
        self.mutator.increment(name)
    }

    pub fn decrease_quantity(&self, name: &str) -> InventoryResult<MutationOutcome> {
        self.require_signed_in()?;
        self.mutator.decrement(name)
    }

    pub fn remove_item(&self, name: &str) -> InventoryResult<MutationOutcome> {
        self.require_signed_in()?;
        self.mutator.remove(name)
    }

    /// Full list as of the last refresh.
    pub fn items(&self) -> Arc<[InventoryItem]> {
        self.sync.snapshot()
    }

    /// Feeds a keystroke-level search value; it takes effect after the debounce period.
    pub fn set_search_input(&self, value: impl Into<String>) {
        self.search_input.schedule(value.into());
    }

    /// Applies a search term immediately, discarding any pending input.
    pub fn set_search_term(&self, value: impl Into<String>) {
        self.search_input.cancel();
        *self.search_term.write() = value.into();
    }

    pub fn search_term(&self) -> String {
        self.search_term.read().clone()
    }

    /// Items matching the current search term, in list order.
    pub fn visible_items(&self) -> Vec<InventoryItem> {
        filter_with(&self.items(), &self.search_term(), self.config.search_mode)
    }

    fn require_signed_in(&self) -> InventoryResult<()> {
        if self.gate.state().is_signed_in() {
            Ok(())
        } else {
            Err(InventoryError::SignedOut)
        }
    }
}
