//! Favourites synchronization integration tests.
//!
//! These tests verify the favourites store and session against real and mock
//! persistence:
//! - Hydration per identity and teardown on sign-out
//! - Optimistic mutations persisted to SQLite
//! - Convergence of interleaved add/remove bursts under varying latency

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use filmdeck_core::{
    testing::MockPersistence, FavouritesSession, FavouritesStore, Identity, MediaType,
    MutationState, PersistenceProvider, SessionIdentityProvider, SqliteFavourites,
};

#[tokio::test]
async fn test_session_persists_to_sqlite_across_sign_ins() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db = Arc::new(
        SqliteFavourites::new(&temp_dir.path().join("favourites.db"))
            .expect("Failed to open database"),
    );
    let identity = Arc::new(SessionIdentityProvider::new());
    let session = FavouritesSession::new(db.clone(), identity.clone());

    identity.sign_in(Identity::new("alice")).unwrap();
    session.sync().await.unwrap();
    assert_eq!(
        session.add(MediaType::Movie, 603).await.unwrap(),
        MutationState::Committed
    );
    session.add(MediaType::Tv, 1399).await.unwrap();

    identity.sign_in(Identity::new("bob")).unwrap();
    session.sync().await.unwrap();
    assert!(session.ids(MediaType::Movie).is_empty());
    session.add(MediaType::Movie, 11).await.unwrap();

    identity.sign_out();
    session.sync().await.unwrap();
    assert_eq!(
        session.remove(MediaType::Movie, 11).await.unwrap(),
        MutationState::Skipped
    );

    identity.sign_in(Identity::new("alice")).unwrap();
    session.sync().await.unwrap();
    assert_eq!(session.ids(MediaType::Movie), vec![603]);
    assert_eq!(session.ids(MediaType::Tv), vec![1399]);

    assert_eq!(
        db.list_favourites("bob", MediaType::Movie).await.unwrap(),
        vec![11]
    );
}

/// Issue a burst of toggles for one item, with a different latency for every
/// remote call, and check both sides end on the last intent.
async fn run_burst(ops: &[bool], delays_ms: &[u64]) {
    let persistence = Arc::new(MockPersistence::new());
    persistence
        .set_mutation_delays(delays_ms.iter().map(|&ms| Duration::from_millis(ms)).collect())
        .await;
    let store = Arc::new(FavouritesStore::new(
        "alice",
        persistence.clone() as Arc<dyn PersistenceProvider>,
    ));

    let mut handles = Vec::new();
    for &add in ops {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            if add {
                store.add(MediaType::Movie, 42).await
            } else {
                store.remove(MediaType::Movie, 42).await
            }
        }));
        tokio::time::sleep(Duration::from_millis(3)).await;
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let last = *ops.last().unwrap();
    assert_eq!(store.contains(MediaType::Movie, 42), last, "ops {:?}", ops);
    assert_eq!(
        persistence.remote_ids("alice", MediaType::Movie).await == vec![42],
        last,
        "ops {:?} delays {:?}",
        ops,
        delays_ms
    );
    let state = store.mutation_state(MediaType::Movie, 42);
    assert!(
        matches!(state, Some(MutationState::Committed)),
        "ops {:?}: {:?}",
        ops,
        state
    );
}

#[tokio::test(start_paused = true)]
async fn test_bursts_converge_to_last_intent() {
    let bursts: [&[bool]; 5] = [
        &[true, false],
        &[true, false, true],
        &[true, false, true, false],
        &[true, false, true, false, true, false, true],
        &[true, false, true, false, true, false, true, false],
    ];
    let latencies: [&[u64]; 4] = [
        &[0, 0, 0, 0, 0, 0, 0, 0],
        &[100, 1, 1, 1, 1, 1, 1, 1],
        &[1, 100, 1, 100, 1, 100, 1, 100],
        &[50, 40, 30, 20, 10, 5, 2, 1],
    ];

    for ops in bursts {
        for delays in latencies {
            run_burst(ops, delays).await;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_independent_items_do_not_block_each_other() {
    let persistence = Arc::new(MockPersistence::new());
    persistence
        .set_mutation_delays(vec![Duration::from_millis(500)])
        .await;
    let store = Arc::new(FavouritesStore::new(
        "alice",
        persistence.clone() as Arc<dyn PersistenceProvider>,
    ));

    let slow = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.add(MediaType::Movie, 1).await })
    };
    tokio::time::sleep(Duration::from_millis(1)).await;

    let started = tokio::time::Instant::now();
    store.add(MediaType::Tv, 1).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));

    slow.await.unwrap().unwrap();
    assert_eq!(store.ids(MediaType::Movie), vec![1]);
    assert_eq!(store.ids(MediaType::Tv), vec![1]);
}
