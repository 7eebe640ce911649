//! Tunable limits for the collector core. Each knob can be overridden with an
//! environment variable of the same name; defaults are chosen for a
//! mid-sized fleet on a single collector host.

use std::sync::LazyLock;

use crate::env::env_config;

/// Size in bytes of one page buffer. The logical record capacity is derived
/// from this and the record size, so changing it rescales every page in the
/// pool. Must be large enough for at least two records.
pub static PAGE_BYTES: LazyLock<usize> = LazyLock::new(|| env_config("PAGE_BYTES", 1024));

/// Total number of pages in the process-wide pool. This bounds the memory the
/// store will ever hold: once all pages are granted, the oldest page is
/// recycled to serve new writes. Default is ~160MiB of samples at the default
/// page size.
pub static PAGE_POOL_PAGES: LazyLock<usize> =
    LazyLock::new(|| env_config("PAGE_POOL_PAGES", 160_000));
