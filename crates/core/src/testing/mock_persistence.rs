//! Mock favourites persistence for testing.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::favourites::{PersistenceError, PersistenceProvider};
use crate::media::MediaType;

/// A recorded persistence call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedPersistenceCall {
    List {
        user_id: String,
        media_type: MediaType,
    },
    Insert {
        user_id: String,
        media_id: u32,
        media_type: MediaType,
    },
    Delete {
        user_id: String,
        media_id: u32,
        media_type: MediaType,
    },
}

impl RecordedPersistenceCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, RecordedPersistenceCall::List { .. })
    }
}

type RowKey = (String, MediaType);

/// Mock implementation of the PersistenceProvider trait.
///
/// Provides controllable behavior for testing:
/// - In-memory favourites rows per user and media type
/// - Failure injection for lists, inserts, deletes or the next mutation
/// - Scripted latency for mutations, consumed one per call
/// - Track calls for assertions
#[derive(Debug, Default)]
pub struct MockPersistence {
    rows: Arc<RwLock<HashMap<RowKey, BTreeSet<u32>>>>,
    calls: Arc<RwLock<Vec<RecordedPersistenceCall>>>,
    fail_lists: Arc<RwLock<bool>>,
    fail_inserts: Arc<RwLock<bool>>,
    fail_deletes: Arc<RwLock<bool>>,
    /// If set, the next insert or delete fails with this message.
    next_mutation_error: Arc<RwLock<Option<String>>>,
    mutation_delays: Arc<RwLock<VecDeque<Duration>>>,
    list_delay: Arc<RwLock<Option<Duration>>>,
}

impl MockPersistence {
    /// Create a new empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Replace the remote favourites of a user.
    pub async fn set_favourites(&self, user_id: &str, media_type: MediaType, ids: Vec<u32>) {
        self.rows
            .write()
            .await
            .insert((user_id.to_string(), media_type), ids.into_iter().collect());
    }

    /// Remote favourite ids, sorted.
    pub async fn remote_ids(&self, user_id: &str, media_type: MediaType) -> Vec<u32> {
        self.rows
            .read()
            .await
            .get(&(user_id.to_string(), media_type))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Failure and Latency Injection
    // =========================================================================

    pub async fn fail_lists(&self, fail: bool) {
        *self.fail_lists.write().await = fail;
    }

    pub async fn fail_inserts(&self, fail: bool) {
        *self.fail_inserts.write().await = fail;
    }

    pub async fn fail_deletes(&self, fail: bool) {
        *self.fail_deletes.write().await = fail;
    }

    /// Make only the next insert or delete fail.
    pub async fn fail_next_mutation(&self, message: impl Into<String>) {
        *self.next_mutation_error.write().await = Some(message.into());
    }

    /// Delays for the next mutations, in call order. Calls beyond the list
    /// answer immediately.
    pub async fn set_mutation_delays(&self, delays: Vec<Duration>) {
        *self.mutation_delays.write().await = delays.into();
    }

    pub async fn set_list_delay(&self, delay: Duration) {
        *self.list_delay.write().await = Some(delay);
    }

    // =========================================================================
    // Call Recording
    // =========================================================================

    pub async fn recorded_calls(&self) -> Vec<RecordedPersistenceCall> {
        self.calls.read().await.clone()
    }

    /// Number of insert and delete calls.
    pub async fn mutation_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.is_mutation())
            .count()
    }

    pub async fn list_count(&self) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| !c.is_mutation())
            .count()
    }

    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    async fn record(&self, call: RecordedPersistenceCall) {
        self.calls.write().await.push(call);
    }

    /// Wait out the scripted delay, then report any injected failure.
    async fn before_mutation(&self, always_fail: bool, what: &str) -> Result<(), PersistenceError> {
        let delay = self.mutation_delays.write().await.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.next_mutation_error.write().await.take() {
            return Err(PersistenceError::Backend(message));
        }
        if always_fail {
            return Err(PersistenceError::Backend(format!("mock {} failure", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceProvider for MockPersistence {
    async fn list_favourites(
        &self,
        user_id: &str,
        media_type: MediaType,
    ) -> Result<Vec<u32>, PersistenceError> {
        self.record(RecordedPersistenceCall::List {
            user_id: user_id.to_string(),
            media_type,
        })
        .await;

        let delay = *self.list_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_lists.read().await {
            return Err(PersistenceError::Backend("mock list failure".to_string()));
        }
        Ok(self.remote_ids(user_id, media_type).await)
    }

    async fn insert_favourite(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<(), PersistenceError> {
        self.record(RecordedPersistenceCall::Insert {
            user_id: user_id.to_string(),
            media_id,
            media_type,
        })
        .await;

        let fail = *self.fail_inserts.read().await;
        self.before_mutation(fail, "insert").await?;
        self.rows
            .write()
            .await
            .entry((user_id.to_string(), media_type))
            .or_default()
            .insert(media_id);
        Ok(())
    }

    async fn delete_favourite(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<(), PersistenceError> {
        self.record(RecordedPersistenceCall::Delete {
            user_id: user_id.to_string(),
            media_id,
            media_type,
        })
        .await;

        let fail = *self.fail_deletes.read().await;
        self.before_mutation(fail, "delete").await?;
        if let Some(ids) = self
            .rows
            .write()
            .await
            .get_mut(&(user_id.to_string(), media_type))
        {
            ids.remove(&media_id);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
