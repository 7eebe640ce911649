use std::{
    fmt,
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
};

use chrono::{
    Local,
    TimeZone,
};
use serde::Serialize;

/// Seconds since the Unix epoch as a 64-bit float, the canonical timestamp
/// representation throughout the store. Sub-second precision is whatever the
/// poller hands us.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Timestamp(f64);

impl Timestamp {
    pub const fn from_secs_f64(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0
    }

    /// Render in the process-local timezone as `YYYY-MM-DDTHH:MM:SS`, the
    /// format the status pages display last-error times in.
    pub fn display_local(&self) -> String {
        let secs = self.0.floor() as i64;
        match Local.timestamp_opt(secs, 0).single() {
            Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => format!("{secs}"),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of one (host, port) polling target. Ids are allocated from
/// a process-global counter and never reused, so id equality is object
/// identity for the lifetime of the process.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EndpointId(u64);

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

impl EndpointId {
    /// Mint a fresh id. Only the endpoint registry should call this.
    pub fn next() -> Self {
        Self(NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[cfg_attr(any(test, feature = "testing"), derive(proptest_derive::Arbitrary))]
pub enum MetricType {
    Counter,
    Gauge,
}

/// Identity of one time series under an endpoint: metric name, sorted tag
/// pairs, and type. Two samples belong to the same series iff their keys are
/// equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MetricKey {
    name: String,
    tags: Vec<(String, String)>,
    metric_type: MetricType,
}

impl MetricKey {
    pub fn new(name: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            metric_type,
        }
    }

    pub fn with_tags(
        name: impl Into<String>,
        mut tags: Vec<(String, String)>,
        metric_type: MetricType,
    ) -> Self {
        tags.sort();
        tags.dedup();
        Self {
            name: name.into(),
            tags,
            metric_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.tags.is_empty() {
            write!(f, "{{")?;
            for (i, (k, v)) in self.tags.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{k}={v}")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}
