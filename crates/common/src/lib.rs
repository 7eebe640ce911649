//! Shared vocabulary for the fleetmon core: timestamps, endpoint and metric
//! identity, and the env-overridable knobs the other crates read their
//! tunables from.

pub mod env;
pub mod knobs;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod test_helpers;

pub use types::{
    EndpointId,
    MetricKey,
    MetricType,
    Timestamp,
};
