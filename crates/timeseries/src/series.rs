use std::{
    collections::VecDeque,
    mem,
    sync::Arc,
};

use common::{
    MetricKey,
    Timestamp,
};
use parking_lot::RwLock;

use crate::{
    metrics::{
        log_sample_appended,
        log_sample_rejected,
    },
    page::{
        Page,
        Sample,
        SampleValue,
        SampleVisitor,
    },
    pool::{
        GrantedPage,
        PagePool,
        SeqNo,
    },
};

/// One (endpoint, metric) sample stream. Samples arrive with strictly
/// increasing timestamps from a single logical writer; stale or duplicate
/// timestamps are silently dropped. The page chain is chronological: pages
/// are appended at the back as the tail fills, and the pool may splice the
/// front page away at any time to serve an allocation elsewhere.
pub struct TimeSeries {
    metric: MetricKey,
    pool: Arc<PagePool>,
    state: RwLock<SeriesState>,
}

struct SeriesState {
    pages: VecDeque<GrantedPage>,
    last_timestamp: Option<Timestamp>,
    last_value: Option<SampleValue>,
    active: bool,
}

impl TimeSeries {
    pub(crate) fn new(metric: MetricKey, pool: Arc<PagePool>) -> Arc<Self> {
        Arc::new(Self {
            metric,
            pool,
            state: RwLock::new(SeriesState {
                pages: VecDeque::new(),
                last_timestamp: None,
                last_value: None,
                active: true,
            }),
        })
    }

    pub fn metric(&self) -> &MetricKey {
        &self.metric
    }

    pub fn is_active(&self) -> bool {
        self.state.read().active
    }

    /// The most recently stored sample, sentinel included.
    pub fn latest(&self) -> Option<Sample> {
        let state = self.state.read();
        match (state.last_timestamp, state.last_value) {
            (Some(timestamp), Some(value)) => Some(Sample { timestamp, value }),
            _ => None,
        }
    }

    /// Append a sample. Returns `None` when the sample was rejected (series
    /// inactive, or `timestamp` not beyond the last stored one), otherwise
    /// whether the value differs from the previously stored value, which is
    /// the changed-metric signal the registry aggregates.
    ///
    /// The write lock is dropped across page allocation: the pool may pick
    /// this very series as its eviction victim.
    pub fn add(self: &Arc<Self>, timestamp: Timestamp, value: f64) -> Option<bool> {
        let value = SampleValue::Numeric(value);
        loop {
            {
                let mut state = self.state.write();
                let state = &mut *state;
                if !state.active {
                    log_sample_rejected();
                    return None;
                }
                if let Some(last) = state.last_timestamp {
                    if timestamp <= last {
                        log_sample_rejected();
                        return None;
                    }
                }
                if let Some(tail) = state.pages.back_mut() {
                    if !tail.page.is_full() {
                        let changed = state.last_value != Some(value);
                        tail.page.add(Sample { timestamp, value });
                        state.last_timestamp = Some(timestamp);
                        state.last_value = Some(value);
                        log_sample_appended();
                        return Some(changed);
                    }
                }
            }
            self.pool.get_page(self);
        }
    }

    /// Terminate the series at `timestamp`. Appends the inactive sentinel
    /// when the timestamp advances past the last stored sample; either way
    /// the series accepts no further samples.
    pub fn mark_inactive(self: &Arc<Self>, timestamp: Timestamp) {
        loop {
            {
                let mut state = self.state.write();
                let state = &mut *state;
                if !state.active {
                    return;
                }
                let stale = state
                    .last_timestamp
                    .is_some_and(|last| timestamp <= last);
                if stale {
                    state.active = false;
                    return;
                }
                if let Some(tail) = state.pages.back_mut() {
                    if !tail.page.is_full() {
                        tail.page.add(Sample {
                            timestamp,
                            value: SampleValue::Inactive,
                        });
                        state.last_timestamp = Some(timestamp);
                        state.last_value = Some(SampleValue::Inactive);
                        state.active = false;
                        return;
                    }
                }
                if state.pages.is_empty() && state.last_timestamp.is_none() {
                    // Nothing was ever stored; no sentinel needed to prove
                    // the series ended.
                    state.active = false;
                    return;
                }
            }
            self.pool.get_page(self);
        }
    }

    /// Range query over `[start, end)` in reverse chronological order,
    /// starting at the newest page holding data before `end` and walking
    /// backwards while the page protocol asks for more.
    pub fn fetch<V: SampleVisitor + ?Sized>(
        &self,
        start: Timestamp,
        end: Timestamp,
        visitor: &mut V,
    ) {
        let state = self.state.read();
        let mut start_index = None;
        for (i, granted) in state.pages.iter().enumerate().rev() {
            match granted.page.first_timestamp() {
                Some(first) if first < end => {
                    start_index = Some(i);
                    break;
                },
                _ => {},
            }
        }
        let Some(mut i) = start_index else {
            return;
        };
        loop {
            if !state.pages[i].page.fetch(start, end, visitor) {
                return;
            }
            if i == 0 {
                return;
            }
            i -= 1;
        }
    }

    /// Chronological twin of [`TimeSeries::fetch`].
    pub fn fetch_forward<V: SampleVisitor + ?Sized>(
        &self,
        start: Timestamp,
        end: Timestamp,
        visitor: &mut V,
    ) {
        let state = self.state.read();
        if state.pages.is_empty() {
            return;
        }
        // Start at the newest page whose first sample is at or before
        // `start` (it holds the predecessor sample), else at the front.
        let mut i = 0;
        for (j, granted) in state.pages.iter().enumerate().rev() {
            match granted.page.first_timestamp() {
                Some(first) if first <= start => {
                    i = j;
                    break;
                },
                _ => {},
            }
        }
        while i < state.pages.len() {
            if !state.pages[i].page.fetch_forward(start, end, visitor) {
                return;
            }
            i += 1;
        }
    }

    /// Splice the front page out of the chain if it is the one granted under
    /// `seq`. Called by the pool, holding the pool lock, when this series'
    /// oldest page is the global eviction victim.
    pub(crate) fn reclaim_page(&self, seq: SeqNo) -> Option<Page> {
        let mut state = self.state.write();
        match state.pages.front() {
            Some(front) if front.seq == seq => Some(
                state
                    .pages
                    .pop_front()
                    .expect("front page vanished under the write lock")
                    .page,
            ),
            _ => None,
        }
    }

    /// Append a freshly granted page to the chain. Called by the pool with
    /// the pool lock held.
    pub(crate) fn install_page(&self, seq: SeqNo, page: Page) {
        let mut state = self.state.write();
        state.pages.push_back(GrantedPage { seq, page });
    }

    #[cfg(any(test, feature = "testing"))]
    pub(crate) fn owns_page(&self, seq: SeqNo) -> bool {
        self.state.read().pages.iter().any(|g| g.seq == seq)
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn consistency_check(&self) {
        let state = self.state.read();
        let mut prev: Option<Timestamp> = None;
        let mut prev_seq: Option<SeqNo> = None;
        for granted in &state.pages {
            if let Some(p) = prev_seq {
                assert!(p < granted.seq, "page seqNos out of order");
            }
            prev_seq = Some(granted.seq);
            for i in 0..granted.page.len() {
                let sample = granted.page.get(i).unwrap();
                if let Some(p) = prev {
                    assert!(p < sample.timestamp, "timestamps not strictly increasing");
                }
                prev = Some(sample.timestamp);
            }
        }
        if let Some(last) = state.last_timestamp {
            if let Some(newest) = prev {
                assert!(newest <= last);
            }
        }
    }
}

impl Drop for TimeSeries {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.pages.is_empty() {
            return;
        }
        let pages = mem::take(&mut state.pages);
        self.pool.give_up_all(pages);
    }
}
