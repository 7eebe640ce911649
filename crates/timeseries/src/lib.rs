//! Bounded-memory paged store for per-(endpoint, metric) time series.
//!
//! All sample storage lives in a fixed budget of pages owned by a single
//! [`PagePool`]. A [`TimeSeries`] borrows pages from the pool, appends
//! strictly-timestamp-increasing samples into its tail page, and serves
//! range queries in both directions. When the pool runs out of free pages it
//! recycles the page granted longest ago, wherever it currently lives, so
//! the store as a whole degrades by forgetting the oldest history first.
//!
//! A [`Store`] maps endpoints to shards of series. Fleet reconfiguration
//! produces a successor store via [`Store::with_active_subset`]; shards for
//! endpoints that remain active are shared between the two stores, which is
//! why shard and series locks are per-entity rather than per-store.
//!
//! # Locking
//! One mutex serializes the pool; every series has its own `RwLock`. The
//! pool lock is always taken before any series lock (eviction locks the
//! victim while holding the pool), and a series drops its own lock before
//! asking the pool for a page.

pub mod page;
pub mod pool;
pub mod series;
pub mod store;

mod metrics;

pub use crate::{
    page::{
        Sample,
        SampleValue,
        SampleVisitor,
    },
    pool::PagePool,
    series::TimeSeries,
    store::{
        MetricSample,
        Store,
    },
};
