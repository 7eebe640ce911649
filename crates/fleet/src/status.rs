use std::{
    sync::Arc,
    time::Duration,
};

use common::Timestamp;
use serde::Serialize;

use crate::endpoint::Endpoint;

/// Where a poller currently is in its cycle against one endpoint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PollStatus {
    Unknown,
    WaitingToConnect,
    Connecting,
    WaitingToPoll,
    Polling,
    Synced,
    FailedToConnect,
    FailedToPoll,
}

impl PollStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, PollStatus::FailedToConnect | PollStatus::FailedToPoll)
    }
}

/// A poller-reported transition. `poll_duration` and `initial_metric_count`
/// are only meaningful when the transition lands on [`PollStatus::Synced`];
/// the registry ignores them otherwise.
#[derive(Clone, Debug)]
pub struct PollState {
    pub status: PollStatus,
    pub timestamp: Timestamp,
    pub poll_duration: Duration,
    pub initial_metric_count: usize,
}

impl PollState {
    pub fn transition(status: PollStatus, timestamp: Timestamp) -> Self {
        Self {
            status,
            timestamp,
            poll_duration: Duration::ZERO,
            initial_metric_count: 0,
        }
    }

    pub fn synced(timestamp: Timestamp, poll_duration: Duration, initial_metric_count: usize) -> Self {
        Self {
            status: PollStatus::Synced,
            timestamp,
            poll_duration,
            initial_metric_count,
        }
    }
}

/// The registry's mutable per-endpoint record. Only the registry touches
/// these; everyone else sees by-value [`ApplicationStatus`] snapshots.
pub(crate) struct StatusEntry {
    pub(crate) endpoint: Arc<Endpoint>,
    pub(crate) application_name: String,
    pub(crate) instance_id: String,
    pub(crate) status: PollStatus,
    pub(crate) active: bool,
    pub(crate) last_read_time: Option<Timestamp>,
    pub(crate) last_poll_duration: Option<Duration>,
    pub(crate) last_error: Option<String>,
    pub(crate) last_error_time: Option<Timestamp>,
    pub(crate) up_since: Option<Timestamp>,
    pub(crate) initial_metric_count: usize,
    pub(crate) down: bool,
    pub(crate) changed_metrics_sum: u64,
    pub(crate) changed_metrics_count: u64,
}

impl StatusEntry {
    pub(crate) fn new(
        endpoint: Arc<Endpoint>,
        application_name: String,
        instance_id: String,
    ) -> Self {
        Self {
            endpoint,
            application_name,
            instance_id,
            status: PollStatus::Unknown,
            active: true,
            last_read_time: None,
            last_poll_duration: None,
            last_error: None,
            last_error_time: None,
            up_since: None,
            initial_metric_count: 0,
            down: false,
            changed_metrics_sum: 0,
            changed_metrics_count: 0,
        }
    }

    pub(crate) fn snapshot(&self) -> ApplicationStatus {
        ApplicationStatus {
            endpoint: (*self.endpoint).clone(),
            application_name: self.application_name.clone(),
            instance_id: self.instance_id.clone(),
            status: self.status,
            active: self.active,
            last_read_time: self.last_read_time,
            last_poll_duration: self.last_poll_duration,
            last_error: self.last_error.clone(),
            last_error_time: self.last_error_time,
            up_since: self.up_since,
            initial_metric_count: self.initial_metric_count,
            down: self.down,
            changed_metrics_sum: self.changed_metrics_sum,
            changed_metrics_count: self.changed_metrics_count,
        }
    }
}

/// A point-in-time copy of one endpoint's status, safe to hold across
/// concurrent registry mutation.
#[derive(Clone, Debug, Serialize)]
pub struct ApplicationStatus {
    pub endpoint: Endpoint,
    pub application_name: String,
    pub instance_id: String,
    pub status: PollStatus,
    pub active: bool,
    pub last_read_time: Option<Timestamp>,
    pub last_poll_duration: Option<Duration>,
    pub last_error: Option<String>,
    pub last_error_time: Option<Timestamp>,
    pub up_since: Option<Timestamp>,
    pub initial_metric_count: usize,
    pub down: bool,
    pub changed_metrics_sum: u64,
    pub changed_metrics_count: u64,
}

impl ApplicationStatus {
    /// Mean changed-metric count per poll cycle, 0 before the first cycle.
    pub fn average_changed_metrics(&self) -> f64 {
        if self.changed_metrics_count == 0 {
            return 0.0;
        }
        self.changed_metrics_sum as f64 / self.changed_metrics_count as f64
    }

    /// Last-error time as the status pages render it:
    /// `YYYY-MM-DDTHH:MM:SS` in the process-local timezone.
    pub fn last_error_time_display(&self) -> Option<String> {
        self.last_error_time.map(|t| t.display_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> ApplicationStatus {
        StatusEntry::new(Endpoint::new("h1", 80), "web".to_owned(), "i-1".to_owned()).snapshot()
    }

    #[test]
    fn test_average_changed_metrics_zero_before_first_cycle() {
        let status = status();
        assert_eq!(status.average_changed_metrics(), 0.0);
    }

    #[test]
    fn test_average_changed_metrics_ratio() {
        let mut status = status();
        status.changed_metrics_sum = 5;
        status.changed_metrics_count = 2;
        assert_eq!(status.average_changed_metrics(), 2.5);
    }

    #[test]
    fn test_snapshot_serializes() {
        let status = status();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["application_name"], "web");
        assert_eq!(json["status"], "Unknown");
        assert_eq!(json["endpoint"]["port"], 80);
    }
}
