//! Self-observability for the collector: a process-global prometheus
//! registry plus the registration macros and logging helpers the other
//! crates build their `metrics` modules out of.
//!
//! Conventions:
//! 1. Metric names contain only alphanumerics and underscores, are prefixed
//!    with the service name, and end in a unit suffix (`_seconds`, `_bytes`,
//!    `_total`).
//! 2. All instrumentation for a crate lives in a `metrics` module whose
//!    interface is high level ("this event happened"), never a raw metric
//!    name at a call site.

use std::sync::LazyLock;

use prometheus::Registry;

mod macros;
mod reporting;
mod timer;

pub use paste::paste;
pub use prometheus;

pub use crate::{
    reporting::{
        log_counter,
        log_counter_with_labels,
        log_distribution,
        log_distribution_with_labels,
        log_gauge,
        log_gauge_with_labels,
    },
    timer::Timer,
};

/// Every metric in the process registers here; an exporter (out of scope for
/// the core) gathers this registry onto whatever wire format it serves.
pub static FLEETMON_METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub const SERVICE_NAME: &str = "fleetmon";
