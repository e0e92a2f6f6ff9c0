//! Session and favourites API tests.
//!
//! These tests cover:
//! - Sign-in hydration, user switches and sign-out
//! - Optimistic favourites mutations and rollback on remote failure
//! - Favourite markers on browse and detail responses
//! - The favourites screen built from catalog details

mod common;

use axum::http::StatusCode;
use common::{fixtures, item_ids, TestConfig, TestFixture};
use filmdeck_core::MediaType;

/// Alice favourites three known movies and one the catalog has dropped.
async fn alice_with_details(fixture: &TestFixture) {
    fixture
        .persistence
        .set_favourites("alice", MediaType::Movie, vec![3, 603, 30, 999])
        .await;
    for item in [
        fixtures::movie(3, "Movie 3"),
        fixtures::movie(30, "Movie 30"),
        fixtures::movie(603, "The Matrix"),
    ] {
        fixture.catalog.add_detail(item).await;
    }
    fixture.sign_in("alice").await;
}

#[tokio::test]
async fn test_signed_out_session() {
    let fixture = TestFixture::new().await;

    let session = fixture.get("/api/v1/session").await;
    assert_eq!(session.status, StatusCode::OK);
    assert_eq!(session.body["signed_in"], false);
    assert!(session.body.get("identity").is_none());

    let list = fixture.get("/api/v1/favourites/movie").await;
    assert_eq!(list.status, StatusCode::UNAUTHORIZED);

    let add = fixture.put("/api/v1/favourites/movie/42").await;
    assert_eq!(add.status, StatusCode::UNAUTHORIZED);
    assert_eq!(fixture.persistence.mutation_count().await, 0);
}

#[tokio::test]
async fn test_sign_in_hydrates_remote_favourites() {
    let fixture = TestFixture::new().await;
    fixture
        .persistence
        .set_favourites("alice", MediaType::Movie, vec![2, 1])
        .await;
    fixture
        .persistence
        .set_favourites("alice", MediaType::Tv, vec![7])
        .await;

    let response = fixture
        .post(
            "/api/v1/session",
            serde_json::json!({ "user_id": "alice", "display_name": "Alice" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["signed_in"], true);
    assert_eq!(response.body["identity"]["user_id"], "alice");
    assert_eq!(response.body["identity"]["display_name"], "Alice");
    assert_eq!(response.body["favourites"], 3);

    let list = fixture.get("/api/v1/favourites/movie").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["user_id"], "alice");
    assert_eq!(list.body["ids"], serde_json::json!([1, 2]));
}

#[tokio::test]
async fn test_add_and_remove_favourite() {
    let fixture = TestFixture::new().await;
    fixture
        .persistence
        .set_favourites("alice", MediaType::Movie, vec![1])
        .await;
    fixture.sign_in("alice").await;

    let add = fixture.put("/api/v1/favourites/movie/5").await;
    assert_eq!(add.status, StatusCode::OK);
    assert_eq!(add.body["state"], "committed");
    assert_eq!(add.body["operation"], "add");
    assert_eq!(add.body["member"], true);

    let remove = fixture.delete("/api/v1/favourites/movie/1").await;
    assert_eq!(remove.status, StatusCode::OK);
    assert_eq!(remove.body["state"], "committed");
    assert_eq!(remove.body["member"], false);

    assert_eq!(
        fixture.persistence.remote_ids("alice", MediaType::Movie).await,
        vec![5]
    );

    // Already a member: nothing to send
    let again = fixture.put("/api/v1/favourites/movie/5").await;
    assert_eq!(again.body["state"], "skipped");
    assert_eq!(fixture.persistence.mutation_count().await, 2);
}

#[tokio::test]
async fn test_failed_insert_rolls_back_with_conflict() {
    let fixture = TestFixture::new().await;
    fixture.sign_in("alice").await;
    fixture.persistence.fail_inserts(true).await;

    let response = fixture.put("/api/v1/favourites/movie/42").await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert!(response.body["error"].as_str().unwrap().contains("42"));

    let list = fixture.get("/api/v1/favourites/movie").await;
    assert_eq!(list.body["ids"], serde_json::json!([]));
    assert!(fixture
        .persistence
        .remote_ids("alice", MediaType::Movie)
        .await
        .is_empty());
}

#[tokio::test]
async fn test_switching_users_swaps_favourites() {
    let fixture = TestFixture::new().await;
    fixture
        .persistence
        .set_favourites("alice", MediaType::Movie, vec![1])
        .await;
    fixture
        .persistence
        .set_favourites("bob", MediaType::Movie, vec![2, 3])
        .await;

    fixture.sign_in("alice").await;
    fixture.sign_in("bob").await;

    let list = fixture.get("/api/v1/favourites/movie").await;
    assert_eq!(list.body["user_id"], "bob");
    assert_eq!(list.body["ids"], serde_json::json!([2, 3]));

    let signed_out = fixture.delete("/api/v1/session").await;
    assert_eq!(signed_out.status, StatusCode::OK);
    assert_eq!(signed_out.body["signed_in"], false);
    assert_eq!(signed_out.body["favourites"], 0);

    let after = fixture.get("/api/v1/favourites/movie").await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blank_user_id_is_rejected() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/session", serde_json::json!({ "user_id": "   " }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.get("/api/v1/session").await.body["signed_in"], false);
}

#[tokio::test]
async fn test_hydration_failure_is_bad_gateway() {
    let fixture = TestFixture::new().await;
    fixture.persistence.fail_lists(true).await;

    let response = fixture
        .post("/api/v1/session", serde_json::json!({ "user_id": "alice" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    // Identity is set but no store was installed
    let session = fixture.get("/api/v1/session").await;
    assert_eq!(session.body["signed_in"], true);
    let add = fixture.put("/api/v1/favourites/movie/1").await;
    assert_eq!(add.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_browse_and_detail_mark_favourites() {
    let fixture = TestFixture::new().await;
    fixture
        .persistence
        .set_favourites("alice", MediaType::Movie, vec![3, 603, 30])
        .await;
    fixture.sign_in("alice").await;

    let browse = fixture.get("/api/v1/catalog/movie").await;
    assert_eq!(browse.body["favourites"], serde_json::json!([3]));

    let detail = fixture.get("/api/v1/catalog/movie/603").await;
    assert_eq!(detail.body["favourite"], true);
}

#[tokio::test]
async fn test_signed_out_before_sync_disables_mutations() {
    let fixture = TestFixture::new().await;
    fixture
        .persistence
        .set_favourites("alice", MediaType::Movie, vec![1])
        .await;
    fixture.sign_in("alice").await;

    // Identity changes without the session catching up
    fixture.identity.sign_out();

    assert_eq!(
        fixture.put("/api/v1/favourites/movie/5").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        fixture.delete("/api/v1/favourites/movie/1").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        fixture.get("/api/v1/favourites/movie").await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(fixture.get("/api/v1/session").await.body["favourites"], 0);

    assert_eq!(fixture.persistence.mutation_count().await, 0);
    assert_eq!(
        fixture.persistence.remote_ids("alice", MediaType::Movie).await,
        vec![1]
    );
}

#[tokio::test]
async fn test_favourite_items_are_sorted_and_filtered() {
    let fixture = TestFixture::new().await;
    alice_with_details(&fixture).await;

    let response = fixture
        .get("/api/v1/favourites/movie/items?sort=popularity")
        .await;

    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    assert_eq!(response.body["key"]["user_id"], "alice");
    assert_eq!(response.body["total_results"], 3);
    assert_eq!(item_ids(&response.body), vec![603, 30, 3]);

    let matrix = fixture
        .get("/api/v1/favourites/movie/items?title=Matrix")
        .await;
    assert_eq!(item_ids(&matrix.body).first(), Some(&603));

    fixture.delete("/api/v1/favourites/movie/30").await;
    let after = fixture.get("/api/v1/favourites/movie/items").await;
    assert_eq!(after.body["total_results"], 2);
    assert!(!item_ids(&after.body).contains(&30));
}

#[tokio::test]
async fn test_favourite_items_are_paginated() {
    let fixture = TestFixture::with_config(TestConfig::with_page_size(2)).await;
    alice_with_details(&fixture).await;

    let second = fixture
        .get("/api/v1/favourites/movie/items?sort=popularity&page=2")
        .await;

    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["total_pages"], 2);
    assert_eq!(second.body["page"], 2);
    assert_eq!(item_ids(&second.body), vec![3]);
}

#[tokio::test]
async fn test_favourite_items_require_sign_in() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/favourites/movie/items").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(fixture.catalog.request_count().await, 0);
}

#[tokio::test]
async fn test_favourite_items_detail_failure_is_bad_gateway() {
    let fixture = TestFixture::new().await;
    alice_with_details(&fixture).await;
    fixture.catalog.fail_detail(30).await;

    let response = fixture.get("/api/v1/favourites/movie/items").await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert!(response.body["error"].as_str().unwrap().contains("30"));
}
