//! Catalog provider integration.
//!
//! The catalog is the read-only remote source of paginated media metadata.
//! The pipeline only talks to it through [`CatalogProvider`], so the TMDB
//! client, the JSON fixture and the test mock are interchangeable.

mod fixture;
mod tmdb;
mod types;

pub use fixture::{FixtureCatalog, FixtureConfig};
pub use tmdb::{TmdbCatalog, TmdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::media::{Genre, MediaItem, MediaType};

/// Errors that can occur when talking to a catalog provider.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The provider answered with an error status.
    #[error("Catalog error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl CatalogError {
    /// Status code reported by the provider, if the failure carried one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CatalogError::HttpError(e) => e.status().map(|s| s.as_u16()),
            CatalogError::Status { status, .. } => Some(*status),
            CatalogError::NotFound(_) => Some(404),
            CatalogError::NotConfigured(_) => Some(401),
            CatalogError::ParseError(_) => None,
        }
    }
}

/// Remote source of media records.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch one page of a listing.
    async fn page(
        &self,
        media_type: MediaType,
        listing: Listing,
        page: u32,
    ) -> Result<CatalogPage, CatalogError>;

    /// Fetch the full record for one item.
    async fn detail(&self, media_type: MediaType, id: u32) -> Result<MediaItem, CatalogError>;

    /// Fetch the genre list for a media type.
    async fn genres(&self, media_type: MediaType) -> Result<Vec<Genre>, CatalogError>;

    /// Short backend name for logs and metrics.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code() {
        let err = CatalogError::Status {
            status: 503,
            message: "down".to_string(),
        };
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(CatalogError::NotFound("x".into()).status_code(), Some(404));
        assert_eq!(CatalogError::ParseError("x".into()).status_code(), None);
    }

    #[test]
    fn test_error_display() {
        let err = CatalogError::Status {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Catalog error: 500 - boom");
    }
}
