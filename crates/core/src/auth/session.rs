use tokio::sync::watch;
use tracing::info;

use super::traits::{IdentityProvider, SessionError};
use super::types::Identity;

/// Identity held in process, switched by explicit sign-in and sign-out.
#[derive(Debug)]
pub struct SessionIdentityProvider {
    sender: watch::Sender<Option<Identity>>,
}

impl Default for SessionIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdentityProvider {
    /// Create a provider with nobody signed in.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Create a provider with `identity` already signed in.
    pub fn signed_in(identity: Identity) -> Self {
        let (sender, _) = watch::channel(Some(identity));
        Self { sender }
    }

    /// Sign in as `identity`. Signing in as the current user is a no-op.
    pub fn sign_in(&self, identity: Identity) -> Result<(), SessionError> {
        if identity.user_id.trim().is_empty() {
            return Err(SessionError::InvalidUserId(identity.user_id));
        }

        let changed = self.sender.send_if_modified(|current| {
            if current.as_ref() == Some(&identity) {
                return false;
            }
            *current = Some(identity.clone());
            true
        });
        if changed {
            info!("Signed in: user_id={}", identity.user_id);
        }
        Ok(())
    }

    /// Sign out. Returns the identity that was signed in.
    pub fn sign_out(&self) -> Option<Identity> {
        let previous = self.sender.send_replace(None);
        if let Some(identity) = &previous {
            info!("Signed out: user_id={}", identity.user_id);
        }
        previous
    }
}

impl IdentityProvider for SessionIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.sender.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.sender.subscribe()
    }

    fn name(&self) -> &'static str {
        "session"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let provider = SessionIdentityProvider::new();
        assert!(provider.current_identity().is_none());

        provider.sign_in(Identity::new("alice")).unwrap();
        assert_eq!(provider.current_identity().unwrap().user_id, "alice");

        let previous = provider.sign_out();
        assert_eq!(previous.unwrap().user_id, "alice");
        assert!(provider.current_identity().is_none());
        assert!(provider.sign_out().is_none());
    }

    #[test]
    fn test_blank_user_rejected() {
        let provider = SessionIdentityProvider::new();
        let result = provider.sign_in(Identity::new("  "));
        assert!(matches!(result, Err(SessionError::InvalidUserId(_))));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let provider = SessionIdentityProvider::new();
        let mut rx = provider.subscribe();

        provider.sign_in(Identity::new("bob")).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().user_id, "bob");

        // Same user again does not notify
        provider.sign_in(Identity::new("bob")).unwrap();
        assert!(!rx.has_changed().unwrap());

        provider.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
