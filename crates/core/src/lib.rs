pub mod aggregator;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod favourites;
pub mod media;
pub mod metrics;
pub mod pipeline;
pub mod search;
pub mod testing;

pub use aggregator::{FetchError, PageAggregator};
pub use auth::{
    create_identity_provider, Identity, IdentityProvider, SessionError, SessionIdentityProvider,
};
pub use catalog::{
    CatalogError, CatalogPage, CatalogProvider, DiscoverFilter, FixtureCatalog, FixtureConfig,
    InvalidDiscoverFilter, Listing, PageRange, QueryKey, TmdbCatalog, TmdbConfig, MAX_PAGE,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CatalogBackend, Config, ConfigError,
    PersistenceBackend, SanitizedConfig,
};
pub use favourites::{
    FavouriteOp, FavouritesEvent, FavouritesKey, FavouritesSession, FavouritesStore,
    MutationState, PersistenceError, PersistenceProvider, RestFavourites, RestFavouritesConfig,
    SqliteFavourites,
};
pub use media::{Collection, Genre, MediaItem, MediaKind, MediaType};
pub use pipeline::{
    Applied, Browser, FilterPipeline, FilterState, MemberOf, PageView, PaginationWindow,
    QueryTicket, SortMode, SortStage, StateConflictError,
};
pub use search::{FuzzyOptions, IndexBuildError, SearchIndex};
