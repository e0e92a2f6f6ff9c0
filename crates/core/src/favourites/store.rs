//! Optimistic favourites store for one user.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{FavouriteOp, FavouritesEvent, MutationState, PersistenceError, PersistenceProvider};
use crate::media::MediaType;
use crate::metrics::{FAVOURITE_HYDRATIONS, FAVOURITE_MUTATIONS};
use crate::pipeline::MemberOf;

const EVENT_CAPACITY: usize = 64;

type ItemKey = (MediaType, u32);

/// Latest mutation for one item.
#[derive(Debug, Clone, Copy)]
struct Entry {
    seq: u64,
    desired: bool,
    /// Membership the remote store is known to hold. `None` after a failed
    /// call, when the remote outcome is unknown.
    confirmed: Option<bool>,
    state: MutationState,
}

#[derive(Debug, Default)]
struct StoreState {
    closed: bool,
    hydrated: bool,
    membership: HashMap<MediaType, HashSet<u32>>,
    entries: HashMap<ItemKey, Entry>,
    next_seq: u64,
}

impl StoreState {
    fn is_member(&self, media_type: MediaType, id: u32) -> bool {
        self.membership
            .get(&media_type)
            .is_some_and(|ids| ids.contains(&id))
    }

    fn set_member(&mut self, media_type: MediaType, id: u32, member: bool) {
        let ids = self.membership.entry(media_type).or_default();
        if member {
            ids.insert(id);
        } else {
            ids.remove(&id);
        }
    }
}

/// Favourites of one user, kept in sync with a persistence backend.
///
/// `add` and `remove` change local membership before the remote call is
/// made. Remote calls for the same item run one at a time, and each one
/// reconciles the remote row towards the latest local intent, so a burst of
/// toggles ends in a single state on both sides. A failed call rolls the item
/// back, unless a newer mutation for it has been issued in the meantime.
pub struct FavouritesStore {
    user_id: String,
    provider: Arc<dyn PersistenceProvider>,
    state: Mutex<StoreState>,
    item_locks: Mutex<HashMap<ItemKey, Arc<tokio::sync::Mutex<()>>>>,
    events: broadcast::Sender<FavouritesEvent>,
}

impl std::fmt::Debug for FavouritesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavouritesStore")
            .field("user_id", &self.user_id)
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl FavouritesStore {
    /// Create an empty, unhydrated store.
    pub fn new(user_id: impl Into<String>, provider: Arc<dyn PersistenceProvider>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            user_id: user_id.into(),
            provider,
            state: Mutex::new(StoreState::default()),
            item_locks: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Receive membership changes, failures and lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<FavouritesEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Hydration
    // =========================================================================

    /// Load the user's favourites for every media type.
    ///
    /// Replaces local membership with the remote sets, except for items with
    /// a mutation still in flight, which keep their local intent. Returns the
    /// number of favourites loaded.
    pub async fn hydrate(&self) -> Result<usize, PersistenceError> {
        let mut loaded = HashMap::new();
        for media_type in MediaType::ALL {
            let ids = self
                .provider
                .list_favourites(&self.user_id, media_type)
                .await
                .map_err(|e| {
                    FAVOURITE_HYDRATIONS.with_label_values(&["error"]).inc();
                    PersistenceError::Hydration {
                        user_id: self.user_id.clone(),
                        media_type,
                        message: e.to_string(),
                    }
                })?;
            loaded.insert(media_type, ids.into_iter().collect::<HashSet<u32>>());
        }

        let total = {
            let mut state = self.lock_state();
            if state.closed {
                debug!(
                    "Discarding hydration for closed store: user_id={}",
                    self.user_id
                );
                return Ok(0);
            }

            let mut membership = loaded;
            let StoreState { entries, .. } = &mut *state;
            for ((media_type, id), entry) in entries.iter_mut() {
                let remote = membership
                    .get(media_type)
                    .is_some_and(|ids| ids.contains(id));
                if entry.state == MutationState::Pending {
                    let ids = membership.entry(*media_type).or_default();
                    if entry.desired {
                        ids.insert(*id);
                    } else {
                        ids.remove(id);
                    }
                } else {
                    entry.confirmed = Some(remote);
                }
            }

            state.membership = membership;
            state.hydrated = true;
            state.membership.values().map(HashSet::len).sum()
        };

        FAVOURITE_HYDRATIONS.with_label_values(&["ok"]).inc();
        info!(
            "Hydrated favourites: user_id={}, total={}",
            self.user_id, total
        );
        self.emit(FavouritesEvent::Hydrated {
            user_id: self.user_id.clone(),
            total,
        });
        Ok(total)
    }

    pub fn is_hydrated(&self) -> bool {
        self.lock_state().hydrated
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Mark an item as favourite.
    pub async fn add(
        &self,
        media_type: MediaType,
        id: u32,
    ) -> Result<MutationState, PersistenceError> {
        self.mutate(FavouriteOp::Add, media_type, id).await
    }

    /// Unmark an item as favourite.
    pub async fn remove(
        &self,
        media_type: MediaType,
        id: u32,
    ) -> Result<MutationState, PersistenceError> {
        self.mutate(FavouriteOp::Remove, media_type, id).await
    }

    async fn mutate(
        &self,
        op: FavouriteOp,
        media_type: MediaType,
        id: u32,
    ) -> Result<MutationState, PersistenceError> {
        let key = (media_type, id);
        let want = op.wants_member();

        // Apply locally and take a ticket
        let seq = {
            let mut state = self.lock_state();
            if state.closed {
                debug!("Store closed, ignoring {} {} {}", op, media_type, id);
                return Ok(self.finish(op, MutationState::Skipped));
            }
            let current = state.is_member(media_type, id);
            if current == want {
                return Ok(self.finish(op, MutationState::Skipped));
            }

            state.set_member(media_type, id, want);
            state.next_seq += 1;
            let seq = state.next_seq;
            let confirmed = state
                .entries
                .get(&key)
                .map_or(Some(current), |entry| entry.confirmed);
            state.entries.insert(
                key,
                Entry {
                    seq,
                    desired: want,
                    confirmed,
                    state: MutationState::Pending,
                },
            );
            seq
        };
        self.emit(FavouritesEvent::MembershipChanged {
            media_type,
            media_id: id,
            member: want,
        });

        let lock = self.item_lock(key);
        let result = {
            let _guard = lock.lock().await;
            self.reconcile(op, key, seq).await
        };
        self.release_item_lock(key, lock);
        result
    }

    /// Bring the remote row in line with the latest intent. Runs under the
    /// item lock.
    async fn reconcile(
        &self,
        op: FavouriteOp,
        key: ItemKey,
        seq: u64,
    ) -> Result<MutationState, PersistenceError> {
        let (media_type, id) = key;
        let want = op.wants_member();

        let confirmed = {
            let mut state = self.lock_state();
            if state.closed {
                return Ok(self.finish(op, MutationState::Skipped));
            }
            let Some(entry) = state.entries.get_mut(&key) else {
                return Ok(self.finish(op, MutationState::Skipped));
            };
            if entry.seq != seq {
                debug!(
                    "Superseded before sending: {} {} {} (seq {} < {})",
                    op, media_type, id, seq, entry.seq
                );
                return Ok(self.finish(op, MutationState::Superseded));
            }
            if entry.confirmed == Some(want) {
                entry.state = MutationState::Committed;
                return Ok(self.finish(op, MutationState::Committed));
            }
            entry.confirmed
        };

        let result = match op {
            FavouriteOp::Add => {
                self.provider
                    .insert_favourite(&self.user_id, id, media_type)
                    .await
            }
            FavouriteOp::Remove => {
                self.provider
                    .delete_favourite(&self.user_id, id, media_type)
                    .await
            }
        };

        let mut events = Vec::new();
        let outcome = {
            let mut state = self.lock_state();
            let closed = state.closed;
            let StoreState {
                entries,
                membership,
                ..
            } = &mut *state;

            match (entries.get_mut(&key), result) {
                (Some(entry), Ok(())) => {
                    entry.confirmed = Some(want);
                    if entry.seq == seq {
                        entry.state = MutationState::Committed;
                        Ok(MutationState::Committed)
                    } else {
                        Ok(MutationState::Superseded)
                    }
                }
                (Some(entry), Err(e)) => {
                    entry.confirmed = None;
                    if entry.seq != seq || closed {
                        debug!(
                            "Superseded mutation failed, newer intent will reconcile: {} {} {}: {}",
                            op, media_type, id, e
                        );
                        Ok(MutationState::Superseded)
                    } else {
                        let restored = confirmed.unwrap_or(!want);
                        entry.state = MutationState::RolledBack;
                        entry.desired = restored;
                        let ids = membership.entry(media_type).or_default();
                        if restored {
                            ids.insert(id);
                        } else {
                            ids.remove(&id);
                        }

                        warn!(
                            "Favourite {} failed, rolled back: user_id={}, {} {}: {}",
                            op, self.user_id, media_type, id, e
                        );
                        events.push(FavouritesEvent::MembershipChanged {
                            media_type,
                            media_id: id,
                            member: restored,
                        });
                        events.push(FavouritesEvent::MutationFailed {
                            media_type,
                            media_id: id,
                            operation: op,
                            message: e.to_string(),
                        });
                        Err(PersistenceError::Mutation {
                            operation: op,
                            media_type,
                            media_id: id,
                            message: e.to_string(),
                        })
                    }
                }
                // Closed while the call was in flight
                (None, Ok(())) => Ok(MutationState::Committed),
                (None, Err(e)) => Err(PersistenceError::Mutation {
                    operation: op,
                    media_type,
                    media_id: id,
                    message: e.to_string(),
                }),
            }
        };

        for event in events {
            self.emit(event);
        }

        match outcome {
            Ok(state) => Ok(self.finish(op, state)),
            Err(e) => {
                self.finish(op, MutationState::RolledBack);
                Err(e)
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn contains(&self, media_type: MediaType, id: u32) -> bool {
        self.lock_state().is_member(media_type, id)
    }

    /// Sorted snapshot of favourite ids for a media type.
    pub fn ids(&self, media_type: MediaType) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .lock_state()
            .membership
            .get(&media_type)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Total favourites across media types.
    pub fn len(&self) -> usize {
        self.lock_state()
            .membership
            .values()
            .map(HashSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// State of the most recent accepted mutation for an item.
    pub fn mutation_state(&self, media_type: MediaType, id: u32) -> Option<MutationState> {
        self.lock_state()
            .entries
            .get(&(media_type, id))
            .map(|entry| entry.state)
    }

    /// Filter predicate matching the current favourites of a media type.
    pub fn member_predicate(&self, media_type: MediaType) -> MemberOf {
        MemberOf(
            self.lock_state()
                .membership
                .get(&media_type)
                .cloned()
                .unwrap_or_default(),
        )
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Clear membership and refuse further mutations.
    pub fn close(&self) {
        {
            let mut state = self.lock_state();
            if state.closed {
                return;
            }
            state.closed = true;
            state.membership.clear();
            state.entries.clear();
        }
        info!("Closed favourites store: user_id={}", self.user_id);
        self.emit(FavouritesEvent::Cleared {
            user_id: self.user_id.clone(),
        });
    }

    pub fn is_closed(&self) -> bool {
        self.lock_state().closed
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn item_lock(&self, key: ItemKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .item_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Drop the lock for an item once nobody else is waiting on it.
    fn release_item_lock(&self, key: ItemKey, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .item_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&key);
        }
    }

    fn finish(&self, op: FavouriteOp, state: MutationState) -> MutationState {
        FAVOURITE_MUTATIONS
            .with_label_values(&[op.as_str(), state.as_str()])
            .inc();
        state
    }

    fn emit(&self, event: FavouritesEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
