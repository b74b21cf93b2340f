//! Property-based test generators using proptest.

use bytes::Bytes;
use proptest::prelude::*;
use tasksync_core::ClientId;
use uuid::Uuid;

/// Strategy for non-nil client ids.
pub fn client_id_strategy() -> impl Strategy<Value = ClientId> {
    any::<u128>()
        .prop_filter("client id must not be nil", |n| *n != 0)
        .prop_map(|n| ClientId::new(Uuid::from_u128(n)).expect("non-nil uuid"))
}

/// Strategy for opaque payloads, including empty ones.
pub fn payload_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..512).prop_map(Bytes::from)
}

/// Strategy for a history of up to `max_len` payloads.
pub fn history_strategy(max_len: usize) -> impl Strategy<Value = Vec<Bytes>> {
    prop::collection::vec(payload_strategy(), 0..=max_len)
}

/// A submission against a client's history, relative to its latest version.
#[derive(Debug, Clone)]
pub enum Submission {
    /// Built on the latest version.
    Current(Bytes),
    /// Built on a version this many steps behind the latest.
    Behind(u64, Bytes),
    /// Built on a version this many steps ahead of the latest.
    Ahead(u64, Bytes),
}

/// Strategy for a mix of current, stale and future submissions.
pub fn submission_strategy() -> impl Strategy<Value = Submission> {
    prop_oneof![
        3 => payload_strategy().prop_map(Submission::Current),
        1 => (1u64..5, payload_strategy()).prop_map(|(n, p)| Submission::Behind(n, p)),
        1 => (1u64..5, payload_strategy()).prop_map(|(n, p)| Submission::Ahead(n, p)),
    ]
}
