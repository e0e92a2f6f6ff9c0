//! Favourites persistence over a PostgREST-style HTTP table (e.g. Supabase).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Request, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PersistenceError, PersistenceProvider};
use crate::media::MediaType;

/// REST favourites backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestFavouritesConfig {
    /// REST root, e.g. `https://project.supabase.co/rest/v1`.
    pub url: String,
    /// API key sent as `apikey` and as bearer token.
    pub api_key: String,
    /// Table name (default: favourites).
    #[serde(default = "default_table")]
    pub table: String,
    /// Request timeout in seconds (default: 15).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    "favourites".to_string()
}

fn default_timeout() -> u64 {
    15
}

#[derive(Debug, Serialize)]
struct FavouriteRow<'a> {
    user_id: &'a str,
    media_id: u32,
    media_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct MediaIdRow {
    media_id: u32,
}

/// Favourites table reached over HTTP.
pub struct RestFavourites {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RestFavourites {
    pub fn new(config: RestFavouritesConfig) -> Result<Self, PersistenceError> {
        if config.url.trim().is_empty() {
            return Err(PersistenceError::NotConfigured(
                "REST favourites url is required".to_string(),
            ));
        }
        if config.api_key.is_empty() {
            return Err(PersistenceError::NotConfigured(
                "REST favourites api_key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}", config.url.trim_end_matches('/'), config.table),
            api_key: config.api_key,
        })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    fn list_request(
        &self,
        user_id: &str,
        media_type: MediaType,
    ) -> Result<Request, PersistenceError> {
        self.request(Method::GET)
            .query(&[
                ("select", "media_id".to_string()),
                ("user_id", format!("eq.{}", user_id)),
                ("media_type", format!("eq.{}", media_type.as_str())),
            ])
            .build()
            .map_err(|e| PersistenceError::Backend(e.to_string()))
    }

    fn insert_request(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<Request, PersistenceError> {
        self.request(Method::POST)
            .query(&[("on_conflict", "user_id,media_id,media_type")])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(&[FavouriteRow {
                user_id,
                media_id,
                media_type: media_type.as_str(),
            }])
            .build()
            .map_err(|e| PersistenceError::Backend(e.to_string()))
    }

    fn delete_request(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<Request, PersistenceError> {
        self.request(Method::DELETE)
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("media_id", format!("eq.{}", media_id)),
                ("media_type", format!("eq.{}", media_type.as_str())),
            ])
            .build()
            .map_err(|e| PersistenceError::Backend(e.to_string()))
    }

    async fn execute(&self, request: Request) -> Result<reqwest::Response, PersistenceError> {
        debug!("Favourites request: {} {}", request.method(), request.url().path());

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        let status = response.status();
        if status == 401 || status == 403 {
            return Err(PersistenceError::NotConfigured(format!(
                "favourites backend rejected credentials ({})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Backend(format!(
                "{} - {}",
                status.as_u16(),
                body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl PersistenceProvider for RestFavourites {
    async fn list_favourites(
        &self,
        user_id: &str,
        media_type: MediaType,
    ) -> Result<Vec<u32>, PersistenceError> {
        let request = self.list_request(user_id, media_type)?;
        let rows: Vec<MediaIdRow> = self
            .execute(request)
            .await?
            .json()
            .await
            .map_err(|e| PersistenceError::Backend(format!("invalid response: {}", e)))?;
        Ok(rows.into_iter().map(|row| row.media_id).collect())
    }

    async fn insert_favourite(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<(), PersistenceError> {
        let request = self.insert_request(user_id, media_id, media_type)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn delete_favourite(
        &self,
        user_id: &str,
        media_id: u32,
        media_type: MediaType,
    ) -> Result<(), PersistenceError> {
        let request = self.delete_request(user_id, media_id, media_type)?;
        self.execute(request).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> RestFavourites {
        RestFavourites::new(RestFavouritesConfig {
            url: "https://example.supabase.co/rest/v1/".to_string(),
            api_key: "anon-key".to_string(),
            table: default_table(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_requires_url_and_key() {
        let result = RestFavourites::new(RestFavouritesConfig {
            url: String::new(),
            api_key: "k".to_string(),
            table: default_table(),
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(PersistenceError::NotConfigured(_))));

        let result = RestFavourites::new(RestFavouritesConfig {
            url: "https://example.com".to_string(),
            api_key: String::new(),
            table: default_table(),
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(PersistenceError::NotConfigured(_))));
    }

    #[test]
    fn test_list_request() {
        let request = client().list_request("alice", MediaType::Tv).unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().path(), "/rest/v1/favourites");
        assert_eq!(
            request.url().query(),
            Some("select=media_id&user_id=eq.alice&media_type=eq.tv")
        );
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer anon-key");
    }

    #[test]
    fn test_insert_request_ignores_duplicates() {
        let request = client().insert_request("alice", 42, MediaType::Movie).unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.headers()["prefer"],
            "resolution=ignore-duplicates,return=minimal"
        );
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"user_id": "alice", "media_id": 42, "media_type": "movie"}])
        );
    }

    #[test]
    fn test_delete_request_filters_row() {
        let request = client().delete_request("alice", 42, MediaType::Movie).unwrap();

        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(
            request.url().query(),
            Some("user_id=eq.alice&media_id=eq.42&media_type=eq.movie")
        );
    }
}
