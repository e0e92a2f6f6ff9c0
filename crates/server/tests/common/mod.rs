//! Common test utilities for in-process API testing with mocks.
//!
//! The fixture builds the real router over a mock catalog and mock
//! favourites persistence, so requests run end to end without a network.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use filmdeck_core::{
    load_config_from_str, Config, FavouritesSession, Listing, MediaType, PageAggregator,
    SessionIdentityProvider,
    testing::{MockCatalog, MockPersistence},
};
use filmdeck_server::state::AppState;

/// Re-export fixtures for test convenience
pub use filmdeck_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_browse() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.get("/api/v1/catalog/movie?pages=3").await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock catalog - configure pages, details and genres
    pub catalog: Arc<MockCatalog>,
    /// Mock persistence - configure remote favourites and failures
    pub persistence: Arc<MockPersistence>,
    pub identity: Arc<SessionIdentityProvider>,
    pub state: Arc<AppState>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture with 45 movies, 10 shows, and nobody signed in.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let config: Config = load_config_from_str(&format!(
            r#"
[server]
host = "127.0.0.1"
port = 0

[catalog]
backend = "fixture"

# Never read: the fixture wires the mock catalog in directly
[catalog.fixture]
path = "catalog.json"

[aggregator]
default_pages = 3
max_pages = 5

[pagination]
page_size = {}
"#,
            test_config.page_size
        ))
        .expect("Failed to parse test config");

        let catalog = Arc::new(MockCatalog::new());
        catalog
            .set_pages(
                MediaType::Movie,
                Listing::Discover,
                fixtures::movies(1..=45),
                20,
            )
            .await;
        catalog
            .set_pages(MediaType::Tv, Listing::Discover, fixtures::shows(1..=10), 20)
            .await;
        catalog
            .set_pages(
                MediaType::Movie,
                Listing::TopRated,
                fixtures::classic_movies().into_items(),
                20,
            )
            .await;
        catalog
            .set_genres(MediaType::Movie, fixtures::movie_genres())
            .await;
        catalog
            .add_detail(fixtures::movie(603, "The Matrix").with_revenue(463_517_383))
            .await;

        let persistence = Arc::new(MockPersistence::new());
        let identity = Arc::new(SessionIdentityProvider::new());
        let favourites = Arc::new(FavouritesSession::new(
            persistence.clone(),
            identity.clone(),
        ));

        let aggregator = PageAggregator::from_config(catalog.clone(), &config.aggregator);
        let state = Arc::new(AppState::new(config, aggregator, identity.clone(), favourites));
        let router = filmdeck_server::api::create_router(state.clone());

        Self {
            router,
            catalog,
            persistence,
            identity,
            state,
        }
    }

    /// Sign in through the API and assert it succeeded.
    pub async fn sign_in(&self, user_id: &str) {
        let response = self
            .post("/api/v1/session", serde_json::json!({ "user_id": user_id }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request without a body.
    pub async fn put(&self, path: &str) -> TestResponse {
        self.request("PUT", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// GET a path and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub page_size: usize,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

impl TestConfig {
    pub fn with_page_size(page_size: usize) -> Self {
        Self { page_size }
    }
}

/// Ids of the items in a browse response.
pub fn item_ids(body: &Value) -> Vec<u64> {
    body["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["id"].as_u64()).collect())
        .unwrap_or_default()
}
