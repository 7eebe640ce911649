//! Proptest strategies for the vocabulary types, exported behind the
//! `testing` feature so downstream crates can reuse them.

use proptest::prelude::*;

use crate::types::{
    MetricKey,
    MetricType,
    Timestamp,
};

/// Finite, order-comparable timestamps. NaN and infinities are excluded
/// because the store's binary searches assume a total order over stored
/// timestamps.
pub fn arbitrary_timestamp() -> impl Strategy<Value = Timestamp> {
    (0u32..2_000_000_000, 0u32..1000)
        .prop_map(|(secs, millis)| Timestamp::from_secs_f64(secs as f64 + millis as f64 / 1000.0))
}

pub fn arbitrary_metric_key() -> impl Strategy<Value = MetricKey> {
    (
        "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
        prop::collection::vec(("[a-z]{1,4}", "[a-z]{1,4}"), 0..3),
        any::<MetricType>(),
    )
        .prop_map(|(name, tags, metric_type)| MetricKey::with_tags(name, tags, metric_type))
}
