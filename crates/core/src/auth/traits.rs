use thiserror::Error;
use tokio::sync::watch;

use super::types::Identity;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Sign-in required")]
    SignedOut,

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),
}

/// Source of the current user.
///
/// Identity changes are published on a watch channel so consumers can react
/// to sign-in, sign-out and user switches without polling.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_identity(&self) -> Option<Identity>;

    /// Receiver that observes every identity change.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;

    /// Name of this identity source.
    fn name(&self) -> &'static str;
}
