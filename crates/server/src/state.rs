use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use filmdeck_core::{
    Browser, Config, FavouritesKey, FavouritesSession, MediaType, PageAggregator,
    SanitizedConfig, SessionIdentityProvider,
};

/// One browsing screen per media type and listing kind. Search filters share
/// the search screen of their media type.
pub type ScreenKey = (MediaType, &'static str);

/// Shared application state
pub struct AppState {
    config: Config,
    aggregator: PageAggregator,
    screens: Mutex<HashMap<ScreenKey, Browser>>,
    favourite_screens: Mutex<HashMap<MediaType, Browser<FavouritesKey>>>,
    identity: Arc<SessionIdentityProvider>,
    favourites: Arc<FavouritesSession>,
}

impl AppState {
    pub fn new(
        config: Config,
        aggregator: PageAggregator,
        identity: Arc<SessionIdentityProvider>,
        favourites: Arc<FavouritesSession>,
    ) -> Self {
        Self {
            config,
            aggregator,
            screens: Mutex::new(HashMap::new()),
            favourite_screens: Mutex::new(HashMap::new()),
            identity,
            favourites,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn aggregator(&self) -> &PageAggregator {
        &self.aggregator
    }

    /// Browsing screens, created on first use.
    pub fn screens(&self) -> &Mutex<HashMap<ScreenKey, Browser>> {
        &self.screens
    }

    /// Favourites screens, one per media type.
    pub fn favourite_screens(&self) -> &Mutex<HashMap<MediaType, Browser<FavouritesKey>>> {
        &self.favourite_screens
    }

    /// A fresh screen configured from the search and pagination settings.
    pub fn new_browser<K: Clone + PartialEq + fmt::Display>(&self) -> Browser<K> {
        Browser::new(
            self.config.search.fuzzy_options(),
            self.config.pagination.page_size,
        )
    }

    pub fn identity(&self) -> &SessionIdentityProvider {
        self.identity.as_ref()
    }

    pub fn favourites(&self) -> &FavouritesSession {
        self.favourites.as_ref()
    }
}
