use std::{
    collections::HashMap,
    sync::Arc,
};

use common::{
    EndpointId,
    MetricKey,
    Timestamp,
};
use parking_lot::RwLock;

use crate::{
    metrics::log_series_created,
    page::{
        Sample,
        SampleVisitor,
    },
    pool::PagePool,
    series::TimeSeries,
};

/// One decoded metric reading from a poll cycle.
#[derive(Clone, Debug)]
pub struct MetricSample {
    pub key: MetricKey,
    pub value: f64,
}

/// The series for every metric of one endpoint. Shards are shared by `Arc`
/// between a store and its successor during fleet reconfiguration, so the
/// lock lives here and not on the store.
pub(crate) struct EndpointSeries {
    by_metric: RwLock<HashMap<MetricKey, Arc<TimeSeries>>>,
}

impl EndpointSeries {
    fn new() -> Self {
        Self {
            by_metric: RwLock::new(HashMap::new()),
        }
    }

    fn series_or_create(&self, key: &MetricKey, pool: &Arc<PagePool>) -> Arc<TimeSeries> {
        if let Some(series) = self.by_metric.read().get(key) {
            return series.clone();
        }
        let mut by_metric = self.by_metric.write();
        by_metric
            .entry(key.clone())
            .or_insert_with(|| {
                log_series_created();
                TimeSeries::new(key.clone(), pool.clone())
            })
            .clone()
    }

    fn series(&self, key: &MetricKey) -> Option<Arc<TimeSeries>> {
        self.by_metric.read().get(key).cloned()
    }

    fn all_series(&self) -> Vec<(MetricKey, Arc<TimeSeries>)> {
        let by_metric = self.by_metric.read();
        let mut all: Vec<_> = by_metric
            .iter()
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        all.sort_by(|(a, _), (b, _)| a.cmp(b));
        all
    }
}

/// Maps endpoints to their series shards. The endpoint set is fixed when the
/// store is built: fleet changes construct a successor with
/// [`Store::with_active_subset`] rather than mutating the current store, so
/// an endpoint's presence here *is* the store's notion of "active". The
/// top-level lock guards membership only; all sample traffic synchronizes on
/// shard and series locks, so writers and queries on distinct endpoints
/// proceed in parallel.
pub struct Store {
    pool: Arc<PagePool>,
    endpoints: RwLock<HashMap<EndpointId, Arc<EndpointSeries>>>,
}

impl Store {
    pub fn new(pool: Arc<PagePool>) -> Self {
        Self {
            pool,
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &Arc<PagePool> {
        &self.pool
    }

    /// Prepare the shard for `endpoint`. Idempotent.
    pub fn register_endpoint(&self, endpoint: EndpointId) {
        let mut endpoints = self.endpoints.write();
        endpoints
            .entry(endpoint)
            .or_insert_with(|| Arc::new(EndpointSeries::new()));
    }

    pub fn contains_endpoint(&self, endpoint: EndpointId) -> bool {
        self.endpoints.read().contains_key(&endpoint)
    }

    pub fn endpoint_ids(&self) -> Vec<EndpointId> {
        let mut ids: Vec<_> = self.endpoints.read().keys().copied().collect();
        ids.sort();
        ids
    }

    fn shard(&self, endpoint: EndpointId) -> Option<Arc<EndpointSeries>> {
        self.endpoints.read().get(&endpoint).cloned()
    }

    /// Route one poll cycle's samples into their series, creating series on
    /// first sight. Returns how many samples differed from the previous
    /// value of their series, the input to average-changed-metrics
    /// accounting.
    ///
    /// Panics if `endpoint` was never registered: pollers obtain endpoints
    /// and the store as a pair, so an unknown endpoint is a caller bug, not
    /// a runtime condition.
    pub fn add_batch(
        &self,
        endpoint: EndpointId,
        timestamp: Timestamp,
        samples: &[MetricSample],
    ) -> usize {
        let shard = self
            .shard(endpoint)
            .unwrap_or_else(|| panic!("add_batch for unregistered endpoint {endpoint}"));
        let mut changed = 0;
        for sample in samples {
            let series = shard.series_or_create(&sample.key, &self.pool);
            if series.add(timestamp, sample.value) == Some(true) {
                changed += 1;
            }
        }
        changed
    }

    /// The last stored sample of every series under `endpoint`, sorted by
    /// metric key. Empty for unknown endpoints.
    pub fn latest_by_endpoint(&self, endpoint: EndpointId) -> Vec<(MetricKey, Sample)> {
        let Some(shard) = self.shard(endpoint) else {
            return Vec::new();
        };
        shard
            .all_series()
            .into_iter()
            .filter_map(|(key, series)| series.latest().map(|sample| (key, sample)))
            .collect()
    }

    /// Reverse-chronological range query over every series under `endpoint`
    /// whose metric name is `name` (tags and type may differ).
    pub fn by_name_and_endpoint<V: SampleVisitor + ?Sized>(
        &self,
        name: &str,
        endpoint: EndpointId,
        start: Timestamp,
        end: Timestamp,
        visitor: &mut V,
    ) {
        let Some(shard) = self.shard(endpoint) else {
            return;
        };
        for (key, series) in shard.all_series() {
            if key.name() == name {
                series.fetch(start, end, visitor);
            }
        }
    }

    /// Reverse-chronological range query over one series.
    pub fn fetch<V: SampleVisitor + ?Sized>(
        &self,
        endpoint: EndpointId,
        key: &MetricKey,
        start: Timestamp,
        end: Timestamp,
        visitor: &mut V,
    ) {
        if let Some(series) = self.shard(endpoint).and_then(|shard| shard.series(key)) {
            series.fetch(start, end, visitor);
        }
    }

    /// Chronological range query over one series.
    pub fn fetch_forward<V: SampleVisitor + ?Sized>(
        &self,
        endpoint: EndpointId,
        key: &MetricKey,
        start: Timestamp,
        end: Timestamp,
        visitor: &mut V,
    ) {
        if let Some(series) = self.shard(endpoint).and_then(|shard| shard.series(key)) {
            series.fetch_forward(start, end, visitor);
        }
    }

    /// Terminate every active series under `endpoint` with the inactive
    /// sentinel at `timestamp`. The shard stays readable through any store
    /// that still references it.
    pub fn mark_endpoint_inactive(&self, timestamp: Timestamp, endpoint: EndpointId) {
        let Some(shard) = self.shard(endpoint) else {
            return;
        };
        for (_, series) in shard.all_series() {
            series.mark_inactive(timestamp);
        }
    }

    /// Build the successor store for a fleet change: shards for endpoints in
    /// `active` are shared with this store when they exist and created fresh
    /// when they don't; everything else is left behind with this store.
    pub fn with_active_subset(&self, active: impl IntoIterator<Item = EndpointId>) -> Store {
        let old = self.endpoints.read();
        let mut endpoints = HashMap::new();
        for id in active {
            let shard = old
                .get(&id)
                .cloned()
                .unwrap_or_else(|| Arc::new(EndpointSeries::new()));
            endpoints.insert(id, shard);
        }
        Store {
            pool: self.pool.clone(),
            endpoints: RwLock::new(endpoints),
        }
    }
}
