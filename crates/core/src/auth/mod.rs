mod session;
mod traits;
mod types;

pub use session::*;
pub use traits::*;
pub use types::*;

use crate::config::IdentityConfig;

/// Factory function to create the identity provider from config.
///
/// A configured `user_id` starts the session signed in.
pub fn create_identity_provider(config: &IdentityConfig) -> SessionIdentityProvider {
    match config.user_id.as_deref().map(str::trim) {
        Some(user_id) if !user_id.is_empty() => {
            SessionIdentityProvider::signed_in(Identity::new(user_id))
        }
        _ => SessionIdentityProvider::new(),
    }
}
