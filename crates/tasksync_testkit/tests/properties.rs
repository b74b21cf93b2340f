//! Properties of the sync store, checked against generated histories.

use proptest::prelude::*;
use std::sync::Arc;
use tasksync_core::{CoreError, SnapshotOutcome};
use tasksync_testkit::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn history_reads_back_exactly(client in client_id_strategy(), history in history_strategy(20)) {
        let store = TestStore::memory();
        let mut parent = VersionId::NIL;
        for payload in &history {
            parent = store.append_batch(client, parent, payload.clone()).unwrap().version;
        }

        prop_assert_eq!(full_history(&store, client), history.clone());
        prop_assert_eq!(store.latest_version(client).unwrap(), VersionId::new(history.len() as u64));
    }

    #[test]
    fn reads_after_a_version_are_exact_and_repeatable(
        history in history_strategy(20),
        since in 0u64..25,
    ) {
        let store = TestStore::memory();
        let client = ClientId::generate();
        let mut parent = VersionId::NIL;
        for payload in &history {
            parent = store.append_batch(client, parent, payload.clone()).unwrap().version;
        }

        let first = store.read_batches(client, VersionId::new(since), None).unwrap();
        let second = store.read_batches(client, VersionId::new(since), None).unwrap();
        prop_assert_eq!(&first, &second);

        let expected: Vec<_> = history.iter().skip(since as usize).cloned().collect();
        let payloads: Vec<_> = first.iter().map(|b| b.payload.clone()).collect();
        prop_assert_eq!(payloads, expected);
        prop_assert!(first.iter().all(|b| b.version > VersionId::new(since)));
        prop_assert!(first.windows(2).all(|w| w[0].version < w[1].version));
    }

    #[test]
    fn only_the_latest_parent_is_accepted(submissions in prop::collection::vec(submission_strategy(), 1..30)) {
        let store = TestStore::memory();
        let client = ClientId::generate();

        for submission in submissions {
            let latest = store.latest_version(client).unwrap();
            let (parent, payload) = match submission {
                Submission::Current(p) => (latest, p),
                Submission::Behind(n, p) => match latest.as_u64().checked_sub(n) {
                    Some(v) => (VersionId::new(v), p),
                    None => continue,
                },
                Submission::Ahead(n, p) => (VersionId::new(latest.as_u64() + n), p),
            };

            match store.append_batch(client, parent, payload) {
                Ok(outcome) => {
                    prop_assert_eq!(parent, latest);
                    prop_assert_eq!(outcome.version, latest.next());
                }
                Err(CoreError::Conflict(conflict)) => {
                    prop_assert_ne!(parent, latest);
                    prop_assert_eq!(conflict.latest, latest);
                    prop_assert_eq!(store.latest_version(client).unwrap(), latest);
                }
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }
    }

    #[test]
    fn snapshots_never_regress(versions in prop::collection::vec(1u64..=10, 1..10)) {
        let store = TestStore::memory();
        let client = ClientId::generate();
        seed_versions(&store, client, 10);

        let mut newest = 0;
        for version in versions {
            let payload = bytes::Bytes::from(format!("snapshot@{version}"));
            let outcome = store.store_snapshot(client, VersionId::new(version), payload).unwrap();
            if version > newest {
                prop_assert_eq!(outcome, SnapshotOutcome::Stored);
                newest = version;
            }

            let snapshot = store.read_latest_snapshot(client).unwrap().unwrap();
            prop_assert_eq!(snapshot.version, VersionId::new(newest));
            prop_assert_eq!(snapshot.payload, bytes::Bytes::from(format!("snapshot@{newest}")));
        }
    }
}

#[test]
fn append_on_top_of_five() {
    let store = TestStore::memory();
    let client = ClientId::generate();
    seed_versions(&store, client, 5);

    let outcome = store
        .append_batch(client, VersionId::new(5), bytes::Bytes::from_static(b"P"))
        .unwrap();
    assert_eq!(outcome.version, VersionId::new(6));

    let after = store.read_batches(client, VersionId::new(5), None).unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].payload, bytes::Bytes::from_static(b"P"));
}

#[test]
fn stale_append_leaves_latest_alone() {
    let store = TestStore::memory();
    let client = ClientId::generate();
    seed_versions(&store, client, 5);

    let err = store
        .append_batch(client, VersionId::new(4), bytes::Bytes::from_static(b"P"))
        .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(store.latest_version(client).unwrap(), VersionId::new(5));
}

#[test]
fn concurrent_same_parent_has_one_winner() {
    for _ in 0..20 {
        let store = Arc::new(SyncStore::in_memory(StoreConfig::default()));
        let client = ClientId::generate();
        seed_versions(&store, client, 3);

        let result = race_same_parent(&store, client, VersionId::new(3), 2);
        assert_eq!(result.successful_ops, 1);
        assert_eq!(result.conflicts, 1);
        assert_eq!(store.latest_version(client).unwrap(), VersionId::new(4));
    }
}

#[test]
fn history_survives_reopen() {
    let store = TestStore::disk();
    let client = ClientId::generate();
    let payloads = seed_versions(&store, client, 25);
    store
        .store_snapshot(client, VersionId::new(20), bytes::Bytes::from_static(b"state"))
        .unwrap();

    let store = store.reopen();
    assert_eq!(full_history(&store, client), payloads);
    let snapshot = store.read_latest_snapshot(client).unwrap().unwrap();
    assert_eq!(snapshot.version, VersionId::new(20));
}
