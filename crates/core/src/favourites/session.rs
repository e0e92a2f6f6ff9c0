//! Binds a favourites store to the signed-in user.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{FavouritesStore, MutationState, PersistenceError, PersistenceProvider};
use crate::auth::{Identity, IdentityProvider, SessionError};
use crate::media::MediaType;

/// Keeps exactly one hydrated [`FavouritesStore`] for the current identity.
///
/// Signing in builds and hydrates a store; switching users tears the old one
/// down first; signing out tears it down and leaves mutations as no-ops.
/// Until [`FavouritesSession::sync`] catches up with an identity change, a
/// store that belongs to someone else is never handed out.
pub struct FavouritesSession {
    persistence: Arc<dyn PersistenceProvider>,
    identity: Arc<dyn IdentityProvider>,
    current: RwLock<Option<Arc<FavouritesStore>>>,
    sync_lock: Mutex<()>,
}

impl FavouritesSession {
    pub fn new(
        persistence: Arc<dyn PersistenceProvider>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            persistence,
            identity,
            current: RwLock::new(None),
            sync_lock: Mutex::new(()),
        }
    }

    /// The store for the signed-in user, once hydrated.
    ///
    /// `None` when signed out, before hydration, and whenever the installed
    /// store belongs to a user other than the current identity.
    pub fn store(&self) -> Option<Arc<FavouritesStore>> {
        let store = self.installed()?;
        let identity = self.identity.current_identity()?;
        (store.user_id() == identity.user_id).then_some(store)
    }

    /// Like [`FavouritesSession::store`], failing with
    /// [`SessionError::SignedOut`] when no store serves the current identity.
    pub fn signed_in_store(&self) -> Result<Arc<FavouritesStore>, SessionError> {
        self.store().ok_or(SessionError::SignedOut)
    }

    fn installed(&self) -> Option<Arc<FavouritesStore>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bring the store in line with the current identity.
    ///
    /// Returns the identity the store now belongs to. If the identity changes
    /// while hydrating, the fresh store is dropped and the new identity is
    /// synced instead.
    pub async fn sync(&self) -> Result<Option<Identity>, PersistenceError> {
        let _guard = self.sync_lock.lock().await;

        loop {
            let identity = self.identity.current_identity();
            let current_user = self.installed().map(|s| s.user_id().to_string());

            if identity.as_ref().map(|i| i.user_id.as_str()) == current_user.as_deref() {
                return Ok(identity);
            }

            self.teardown();

            let Some(identity) = identity else {
                return Ok(None);
            };

            let store = Arc::new(FavouritesStore::new(
                identity.user_id.clone(),
                Arc::clone(&self.persistence),
            ));
            if let Err(e) = store.hydrate().await {
                error!(
                    "Failed to hydrate favourites: user_id={}: {}",
                    identity.user_id, e
                );
                store.close();
                return Err(e);
            }

            let still_current = self
                .identity
                .current_identity()
                .is_some_and(|i| i.user_id == identity.user_id);
            if !still_current {
                debug!(
                    "Identity changed during hydration, discarding store: user_id={}",
                    identity.user_id
                );
                store.close();
                continue;
            }

            *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(store);
            info!("Favourites ready: user_id={}", identity.user_id);
            return Ok(Some(identity));
        }
    }

    /// Follow identity changes until the identity provider goes away.
    pub async fn run(self: Arc<Self>) {
        let mut changes = self.identity.subscribe();
        loop {
            if let Err(e) = self.sync().await {
                error!("Favourites sync failed: {}", e);
            }
            if changes.changed().await.is_err() {
                debug!("Identity provider closed, stopping favourites session");
                break;
            }
        }
    }

    /// Spawn [`FavouritesSession::run`] on the runtime.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).run())
    }

    /// Add to the current user's favourites. `Skipped` when signed out.
    pub async fn add(
        &self,
        media_type: MediaType,
        id: u32,
    ) -> Result<MutationState, PersistenceError> {
        match self.store() {
            Some(store) => store.add(media_type, id).await,
            None => Ok(MutationState::Skipped),
        }
    }

    pub async fn remove(
        &self,
        media_type: MediaType,
        id: u32,
    ) -> Result<MutationState, PersistenceError> {
        match self.store() {
            Some(store) => store.remove(media_type, id).await,
            None => Ok(MutationState::Skipped),
        }
    }

    pub fn contains(&self, media_type: MediaType, id: u32) -> bool {
        self.store()
            .is_some_and(|store| store.contains(media_type, id))
    }

    pub fn ids(&self, media_type: MediaType) -> Vec<u32> {
        self.store()
            .map(|store| store.ids(media_type))
            .unwrap_or_default()
    }

    fn teardown(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(store) = previous {
            store.close();
        }
    }
}
