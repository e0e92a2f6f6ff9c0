//! Favourites: per-user membership sets with optimistic remote sync.
//!
//! [`FavouritesStore`] keeps a local membership set for one user and mirrors
//! every change to a [`PersistenceProvider`]. Local state changes
//! immediately; remote writes for the same item are serialized and always
//! reconcile towards the most recent intent. [`FavouritesSession`] rebuilds
//! the store whenever the signed-in user changes.

mod rest;
mod session;
mod sqlite;
mod store;

pub use rest::{RestFavourites, RestFavouritesConfig};
pub use session::FavouritesSession;
pub use sqlite::SqliteFavourites;
pub use store::FavouritesStore;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaType;

/// Direction of a favourites mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavouriteOp {
    Add,
    Remove,
}

impl FavouriteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FavouriteOp::Add => "add",
            FavouriteOp::Remove => "remove",
        }
    }

    /// Membership this operation asks for.
    pub fn wants_member(&self) -> bool {
        matches!(self, FavouriteOp::Add)
    }

    fn for_membership(member: bool) -> Self {
        if member {
            FavouriteOp::Add
        } else {
            FavouriteOp::Remove
        }
    }
}

impl fmt::Display for FavouriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one user's favourites screen for a media type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FavouritesKey {
    pub user_id: String,
    pub media_type: MediaType,
}

impl FavouritesKey {
    pub fn new(user_id: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            user_id: user_id.into(),
            media_type,
        }
    }
}

impl fmt::Display for FavouritesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/favourites", self.user_id, self.media_type)
    }
}

/// Lifecycle of one favourites mutation.
///
/// ```text
/// Pending ──▶ Committed
///    │
///    ├──────▶ RolledBack
///    │
///    └──────▶ Superseded   (a newer mutation for the same item took over)
///
/// Skipped                  (no-op: already in the requested state, signed out, or store closed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Pending,
    Committed,
    RolledBack,
    Superseded,
    Skipped,
}

impl MutationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationState::Pending => "pending",
            MutationState::Committed => "committed",
            MutationState::RolledBack => "rolled_back",
            MutationState::Superseded => "superseded",
            MutationState::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MutationState::Pending)
    }
}

impl fmt::Display for MutationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from favourites persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// A remote mutation failed and the local change was rolled back.
    #[error("Failed to {operation} {media_type} {media_id}: {message}")]
    Mutation {
        operation: FavouriteOp,
        media_type: MediaType,
        media_id: u32,
        message: String,
    },

    /// Loading the favourites of a user failed.
    #[error("Failed to load {media_type} favourites for {user_id}: {message}")]
    Hydration {
        user_id: String,
        media_type: MediaType,
        message: String,
    },

    /// The backend itself failed (connection, query, response decoding).
    #[error("Persistence backend error: {0}")]
    Backend(String),

    #[error("Persistence backend not configured: {0}")]
    NotConfigured(String),
}

/// Change notifications published by a [`FavouritesStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FavouritesEvent {
    Hydrated {
        user_id: String,
        total: usize,
    },
    MembershipChanged {
        media_type: MediaType,
        media_id: u32,
        member: bool,
    },
    MutationFailed {
        media_type: MediaType,
        media_id: u32,
        operation: FavouriteOp,
        message: String,
    },
    Cleared {
        user_id: String,
    },
}

/// Remote store of favourites rows.
///
/// Implementations must make insert idempotent (inserting an existing row
/// succeeds) and delete of a missing row a success.
#[async_trait]
pub trait PersistenceProvider: Send + Sync {
    /// Ids of every favourite of `user_id` for `media_type`.
    async fn list_favourites(
        &self,
        user_id: &str,
        media_type: MediaType,
    ) -> Result<Vec<u32>, PersistenceError>;

    async fn insert_favourite(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<(), PersistenceError>;

    async fn delete_favourite(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<(), PersistenceError>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}
