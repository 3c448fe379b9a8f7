//! PostgreSQL backend tests.
//!
//! Tests that need a live server are `#[ignore]`d and read the server URL
//! from `CENSUS_TEST_DATABASE_URL`:
//!
//! ```text
//! CENSUS_TEST_DATABASE_URL=postgres://... cargo test -p census-store --test postgres_backend -- --ignored
//! ```
//!
//! Labels carry a per-run suffix so repeated runs against the same database
//! do not interfere.

use std::time::Duration;

use census_core::{Address, Nationality, RecordOutcome};
use census_store::{BackendKind, CensusStore, PostgresBackend, StoreConfig, StoreError};

const TEST_DATABASE_URL: &str = "CENSUS_TEST_DATABASE_URL";

fn run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn live_url() -> String {
    std::env::var(TEST_DATABASE_URL)
        .unwrap_or_else(|_| panic!("{TEST_DATABASE_URL} must point at a test database"))
}

async fn live_store() -> CensusStore {
    let store = CensusStore::open(&StoreConfig::postgres(live_url())).await.unwrap();
    assert_eq!(store.kind(), BackendKind::Postgres);
    store
}

#[tokio::test]
#[ignore] // needs CENSUS_TEST_DATABASE_URL; run with -- --ignored
async fn record_create_refresh_move() {
    let store = live_store().await;
    let run = run_id();
    let germany = Nationality::new(format!("Germany-{run}")).unwrap();
    let spain = Nationality::new(format!("Spain-{run}")).unwrap();
    let upper = Address::new(&format!("0xABC{run}")).unwrap();
    let lower = Address::new(&format!("0xabc{run}")).unwrap();

    let outcome = store.record(&upper, &germany).await.unwrap();
    assert_eq!(outcome, RecordOutcome::Created);
    let stats = store.get_stats().await.unwrap();
    assert_eq!(stats.count_of(germany.as_str()), 1);
    assert_eq!(stats.tallied(), stats.total);

    let first = store.entry(&lower).await.unwrap().unwrap();
    let outcome = store.record(&lower, &germany).await.unwrap();
    assert_eq!(outcome, RecordOutcome::Refreshed);
    let second = store.entry(&upper).await.unwrap().unwrap();
    assert!(second.recorded_at >= first.recorded_at);
    assert_eq!(store.get_stats().await.unwrap().count_of(germany.as_str()), 1);

    let outcome = store.record(&lower, &spain).await.unwrap();
    assert_eq!(
        outcome,
        RecordOutcome::Moved {
            from: germany.clone()
        }
    );
    let stats = store.get_stats().await.unwrap();
    assert_eq!(stats.count_of(germany.as_str()), 0);
    assert!(stats.countries.iter().all(|c| c.country != germany.as_str()));
    assert_eq!(stats.count_of(spain.as_str()), 1);
    assert_eq!(stats.tallied(), stats.total);
}

#[tokio::test]
#[ignore] // needs CENSUS_TEST_DATABASE_URL; run with -- --ignored
async fn concurrent_moves_on_one_address_stay_consistent() {
    let store = live_store().await;
    let run = run_id();
    let labels = [format!("Chile-{run}"), format!("Peru-{run}")];
    let address = Address::new(&format!("0xrace{run}")).unwrap();

    let mut handles = Vec::new();
    for i in 0..40 {
        let store = store.clone();
        let address = address.clone();
        let label = Nationality::new(labels[i % 2].clone()).unwrap();
        handles.push(tokio::spawn(async move {
            store.record(&address, &label).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let stats = store.get_stats().await.unwrap();
    let entry = store.entry(&address).await.unwrap().unwrap();
    let chile = stats.count_of(&labels[0]);
    let peru = stats.count_of(&labels[1]);
    assert_eq!(chile + peru, 1);
    assert_eq!(stats.count_of(entry.nationality.as_str()), 1);
    assert_eq!(stats.tallied(), stats.total);
}

#[tokio::test]
#[ignore] // needs CENSUS_TEST_DATABASE_URL; run with -- --ignored
async fn migrations_are_idempotent() {
    let backend = PostgresBackend::connect(&StoreConfig::postgres(live_url()))
        .await
        .unwrap();
    backend.migrate().await.unwrap();
}

#[tokio::test]
async fn unreachable_server_reports_unavailable() {
    let config = StoreConfig {
        acquire_timeout: Duration::from_millis(500),
        ..StoreConfig::postgres("postgres://census@127.0.0.1:1/census")
    };
    let store = CensusStore::from(PostgresBackend::connect_lazy(&config).unwrap());

    let address = Address::new("0xdead").unwrap();
    let nationality = Nationality::new("Norway").unwrap();

    let err = store.record(&address, &nationality).await.unwrap_err();
    assert!(err.is_unavailable(), "unexpected error: {err}");

    let err = store.get_stats().await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)), "unexpected error: {err}");

    assert!(store.ping().await.is_err());
}
