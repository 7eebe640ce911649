//! The application/endpoint registry of the collector: which applications we
//! poll, which (host, application) endpoints currently exist, what state
//! each poller last reported, and the handoff that keeps the registry's
//! active set and the paged store's active series in lockstep as the fleet
//! changes underneath us.
//!
//! The flow: a machine oracle periodically reports the full fleet to
//! [`ApplicationStatuses::mark_hosts_active_exclusively`], which mints
//! endpoints for newcomers, retires departures, and swaps in a successor
//! [`timeseries::Store`]. Pollers walk
//! [`ApplicationStatuses::active_endpoint_ids`], feed samples to the store
//! half of that pair, and report their progress back through
//! [`ApplicationStatuses::update`] and [`ApplicationStatuses::report_error`].

pub mod application;
pub mod endpoint;
pub mod machine;
pub mod registry;
pub mod status;

mod metrics;

#[cfg(test)]
mod tests;

pub use crate::{
    application::{
        Application,
        ApplicationList,
        ApplicationListBuilder,
        ConfigError,
    },
    endpoint::Endpoint,
    machine::{
        AwsMetadata,
        Machine,
    },
    registry::ApplicationStatuses,
    status::{
        ApplicationStatus,
        PollState,
        PollStatus,
    },
};
