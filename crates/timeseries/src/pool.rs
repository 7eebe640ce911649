use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        Weak,
    },
};

use common::knobs::{
    PAGE_BYTES,
    PAGE_POOL_PAGES,
};
use parking_lot::Mutex;

use crate::{
    metrics::log_page_recycled,
    page::Page,
    series::TimeSeries,
};

pub(crate) type SeqNo = u64;

/// A page together with the sequence number it was granted under. The seqNo
/// doubles as the page's position in the pool's global LRU order.
pub(crate) struct GrantedPage {
    pub(crate) seq: SeqNo,
    pub(crate) page: Page,
}

/// The process-wide page budget. Every page in existence is either on the
/// free list or granted to exactly one series; the total never changes after
/// construction. When the free list is empty, `get_page` recycles the page
/// with the smallest sequence number, i.e. the one granted longest ago
/// anywhere in the store.
pub struct PagePool {
    capacity: usize,
    inner: Mutex<PoolInner>,
}

struct PoolInner {
    free: Vec<Page>,
    /// Granted pages by seqNo, with a back-link to the owning series so the
    /// victim can be spliced out of its chain under that series' lock.
    lru: BTreeMap<SeqNo, Weak<TimeSeries>>,
    next_seq: SeqNo,
}

impl PagePool {
    /// A pool of `total_pages` pages of the knob-configured byte size.
    pub fn new(total_pages: usize) -> Arc<Self> {
        Self::with_page_bytes(total_pages, *PAGE_BYTES)
    }

    /// A pool sized entirely from knobs.
    pub fn from_knobs() -> Arc<Self> {
        Self::with_page_bytes(*PAGE_POOL_PAGES, *PAGE_BYTES)
    }

    pub fn with_page_bytes(total_pages: usize, page_bytes: usize) -> Arc<Self> {
        assert!(total_pages > 0, "page pool needs at least one page");
        let free = (0..total_pages)
            .map(|_| Page::with_byte_capacity(page_bytes))
            .collect();
        Arc::new(Self {
            capacity: total_pages,
            inner: Mutex::new(PoolInner {
                free,
                lru: BTreeMap::new(),
                next_seq: 0,
            }),
        })
    }

    /// The fixed page budget.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grant a cleared page to `owner` and append it to the owner's chain.
    /// Recycles the oldest granted page when the free list is empty. The
    /// caller must not hold any series lock.
    pub(crate) fn get_page(&self, owner: &Arc<TimeSeries>) {
        loop {
            // Victim owners upgraded inside the critical section are dropped
            // only after the pool lock is released: if ours is the last
            // reference, the series' Drop impl re-enters the pool.
            let mut touched: Vec<Arc<TimeSeries>> = Vec::new();
            let mut inner = self.inner.lock();
            let mut page = inner.free.pop();
            while page.is_none() {
                let Some((&seq, _)) = inner.lru.iter().next() else {
                    break;
                };
                let weak = inner
                    .lru
                    .remove(&seq)
                    .expect("lru entry vanished under the pool lock");
                let Some(victim) = weak.upgrade() else {
                    // Owner is mid-teardown; its pages reach the free list
                    // once its drop gets the pool lock.
                    continue;
                };
                let reclaimed = victim.reclaim_page(seq);
                touched.push(victim);
                if reclaimed.is_some() {
                    log_page_recycled();
                    tracing::trace!(victim_seq = seq, "recycled page");
                    page = reclaimed;
                }
            }
            match page {
                Some(mut page) => {
                    page.clear();
                    let seq = inner.next_seq;
                    inner.next_seq += 1;
                    inner.lru.insert(seq, Arc::downgrade(owner));
                    owner.install_page(seq, page);
                    drop(inner);
                    drop(touched);
                    return;
                },
                None => {
                    // Every page belongs to a series whose teardown is racing
                    // us; let those drops finish and retry.
                    drop(inner);
                    drop(touched);
                    std::thread::yield_now();
                },
            }
        }
    }

    /// Return a discarded owner's pages to the free list.
    pub(crate) fn give_up_all(&self, pages: impl IntoIterator<Item = GrantedPage>) {
        let mut inner = self.inner.lock();
        for granted in pages {
            inner.lru.remove(&granted.seq);
            inner.free.push(granted.page);
        }
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn consistency_check(&self) {
        let inner = self.inner.lock();
        let mut granted = 0;
        for (&seq, weak) in &inner.lru {
            let owner = weak.upgrade().expect("lru entry for a dropped series");
            assert!(
                owner.owns_page(seq),
                "pool thinks series owns page {seq} but the series disagrees"
            );
            granted += 1;
        }
        assert_eq!(
            inner.free.len() + granted,
            self.capacity,
            "pages leaked or duplicated"
        );
    }
}
