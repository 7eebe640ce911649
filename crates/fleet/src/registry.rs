use std::{
    collections::{
        HashMap,
        HashSet,
    },
    mem,
    sync::Arc,
};

use common::{
    EndpointId,
    Timestamp,
};
use parking_lot::{
    Mutex,
    RwLock,
};
use timeseries::{
    PagePool,
    Store,
};

use crate::{
    application::ApplicationList,
    endpoint::Endpoint,
    machine::Machine,
    metrics::{
        log_active_endpoints,
        log_endpoints_created,
        log_endpoints_retired,
        reconcile_timer,
    },
    status::{
        ApplicationStatus,
        PollState,
        PollStatus,
        StatusEntry,
    },
};

/// The reconciliation engine between fleet membership and the store: the
/// current fleet view (endpoint lifecycle, poll status, errors) plus the
/// active [`Store`], kept in lockstep as machines come and go.
///
/// Two locks with strictly separated jobs. `status_change` is the coarse
/// outer lock, held only across fleet reconciliation; it is what makes
/// "active" a stable notion while a reconfiguration is being computed.
/// `inner` is the everyday lock guarding the maps, the status entries and
/// the store pointer. Reconciliation commits the active-bit flips and the
/// store swap inside a single `inner` critical section, so every reader sees
/// a (status, store) pair that is entirely pre- or entirely
/// post-reconfiguration. Lock order here and store-wards:
/// `status_change`, then page pool, then series, then `inner`.
pub struct ApplicationStatuses {
    applications: ApplicationList,
    status_change: Mutex<()>,
    inner: RwLock<Inner>,
}

struct Inner {
    by_endpoint: HashMap<EndpointId, StatusEntry>,
    /// Re-finds an endpoint across fleet snapshots: a host that leaves and
    /// returns keeps its endpoint identity.
    by_host_port: HashMap<(String, u16), Arc<Endpoint>>,
    current_store: Arc<Store>,
}

impl Inner {
    fn entry_mut(&mut self, endpoint: &Arc<Endpoint>) -> &mut StatusEntry {
        self.by_endpoint.get_mut(&endpoint.id()).unwrap_or_else(|| {
            panic!(
                "endpoint {} ({}:{}) was not issued by this registry",
                endpoint.id(),
                endpoint.host_name(),
                endpoint.port()
            )
        })
    }
}

impl ApplicationStatuses {
    pub fn new(applications: ApplicationList, pool: Arc<PagePool>) -> Self {
        Self {
            applications,
            status_change: Mutex::new(()),
            inner: RwLock::new(Inner {
                by_endpoint: HashMap::new(),
                by_host_port: HashMap::new(),
                current_store: Arc::new(Store::new(pool)),
            }),
        }
    }

    pub fn applications(&self) -> &ApplicationList {
        &self.applications
    }

    /// Record a poller-reported state transition. A transition into
    /// [`PollStatus::Synced`] also refreshes the last read time, the poll
    /// duration and the initial metric count.
    ///
    /// Panics if `endpoint` was not issued by this registry: pollers only
    /// ever see endpoints from [`ApplicationStatuses::active_endpoint_ids`],
    /// so anything else is a bug in the caller.
    pub fn update(&self, endpoint: &Arc<Endpoint>, state: PollState) {
        let mut inner = self.inner.write();
        let entry = inner.entry_mut(endpoint);
        entry.status = state.status;
        if state.status == PollStatus::Synced {
            entry.last_read_time = Some(state.timestamp);
            entry.last_poll_duration = Some(state.poll_duration);
            entry.initial_metric_count = state.initial_metric_count;
        }
    }

    /// Record the outcome of a poll attempt. An error sets the down flag and
    /// the last-error fields; a success clears them, stamping the recovery
    /// time when the endpoint had been down.
    pub fn report_error(
        &self,
        endpoint: &Arc<Endpoint>,
        error: Option<&anyhow::Error>,
        timestamp: Timestamp,
    ) {
        let mut inner = self.inner.write();
        let entry = inner.entry_mut(endpoint);
        match error {
            Some(error) => {
                entry.last_error = Some(format!("{error:#}"));
                entry.last_error_time = Some(timestamp);
                entry.down = true;
            },
            None => {
                if entry.down {
                    entry.up_since = Some(timestamp);
                }
                entry.last_error = None;
                entry.last_error_time = None;
                entry.down = false;
            },
        }
    }

    /// Fold one poll cycle's changed-metric count into the endpoint's
    /// running average.
    pub fn log_changed_metric_count(&self, endpoint: &Arc<Endpoint>, count: u64) {
        let mut inner = self.inner.write();
        let entry = inner.entry_mut(endpoint);
        entry.changed_metrics_sum += count;
        entry.changed_metrics_count += 1;
    }

    /// Reconcile a full fleet snapshot: exactly the (host, application)
    /// cross product of `machines` with the application list is active
    /// afterwards. Newcomers get fresh endpoints and empty series; endpoints
    /// whose host departed are flipped inactive, their series terminated
    /// with the sentinel at `timestamp` and their shards left behind with
    /// the outgoing store. Idempotent: re-reporting an unchanged fleet
    /// leaves both statuses and the store pointer untouched.
    pub fn mark_hosts_active_exclusively(&self, timestamp: Timestamp, machines: &[Machine]) {
        let _timer = reconcile_timer();
        let _status_change = self.status_change.lock();

        // `status_change` is held, so nothing else can mint endpoints or
        // flip active bits while we compute from this snapshot.
        let (old_store, mut known, active_before) = {
            let inner = self.inner.read();
            let active: HashSet<EndpointId> = inner
                .by_endpoint
                .iter()
                .filter(|(_, entry)| entry.active)
                .map(|(id, _)| *id)
                .collect();
            (
                inner.current_store.clone(),
                inner.by_host_port.clone(),
                active,
            )
        };

        let mut active_after = HashSet::new();
        let mut active_ids = Vec::new();
        let mut created: Vec<(Arc<Endpoint>, StatusEntry)> = Vec::new();
        for machine in machines {
            for application in self.applications.all() {
                let key = (machine.host_name.clone(), application.port());
                let endpoint = match known.get(&key) {
                    Some(endpoint) => endpoint.clone(),
                    None => {
                        let endpoint = Endpoint::new(&machine.host_name, application.port());
                        created.push((
                            endpoint.clone(),
                            StatusEntry::new(
                                endpoint.clone(),
                                application.name().to_owned(),
                                machine.instance_id.clone(),
                            ),
                        ));
                        known.insert(key, endpoint.clone());
                        endpoint
                    },
                };
                if active_after.insert(endpoint.id()) {
                    active_ids.push(endpoint.id());
                }
            }
        }

        if created.is_empty() && active_after == active_before {
            return;
        }

        let newly_inactive: Vec<EndpointId> =
            active_before.difference(&active_after).copied().collect();

        // Terminate the outgoing endpoints' series in the current store
        // before snapshotting the active subset, so readers still holding
        // that store see their history end with the sentinel.
        for &id in &newly_inactive {
            old_store.mark_endpoint_inactive(timestamp, id);
        }
        let successor = Arc::new(old_store.with_active_subset(active_ids.iter().copied()));

        let created_count = created.len() as u64;
        let previous_store = {
            let mut inner = self.inner.write();
            for (endpoint, entry) in created {
                inner
                    .by_host_port
                    .insert((endpoint.host_name().to_owned(), endpoint.port()), endpoint.clone());
                inner.by_endpoint.insert(endpoint.id(), entry);
            }
            for (id, entry) in inner.by_endpoint.iter_mut() {
                entry.active = active_after.contains(id);
            }
            mem::replace(&mut inner.current_store, successor)
        };
        // Dropping the outgoing store may return shard pages to the pool;
        // that must not happen under `inner`.
        drop(previous_store);

        log_endpoints_created(created_count);
        log_endpoints_retired(newly_inactive.len() as u64);
        log_active_endpoints(active_after.len());
        tracing::info!(
            machines = machines.len(),
            endpoints_created = created_count,
            endpoints_retired = newly_inactive.len(),
            active_endpoints = active_after.len(),
            "reconciled fleet snapshot"
        );
    }

    /// Snapshots of every status, sorted by endpoint id.
    pub fn all(&self) -> Vec<ApplicationStatus> {
        self.all_with_store(|_| true).0
    }

    /// Snapshots satisfying `filter`, paired with the store those snapshots
    /// are consistent with.
    pub fn all_with_store(
        &self,
        mut filter: impl FnMut(&ApplicationStatus) -> bool,
    ) -> (Vec<ApplicationStatus>, Arc<Store>) {
        let inner = self.inner.read();
        let mut statuses: Vec<ApplicationStatus> = inner
            .by_endpoint
            .values()
            .map(StatusEntry::snapshot)
            .filter(|snapshot| filter(snapshot))
            .collect();
        statuses.sort_by_key(|s| s.endpoint.id());
        (statuses, inner.current_store.clone())
    }

    pub fn all_active_with_store(&self) -> (Vec<ApplicationStatus>, Arc<Store>) {
        self.all_with_store(|snapshot| snapshot.active)
    }

    /// The endpoints a poller should currently be polling, paired with the
    /// store to feed their samples into. Pollers re-fetch this after every
    /// cycle to pick up fleet changes.
    pub fn active_endpoint_ids(&self) -> (Vec<Arc<Endpoint>>, Arc<Store>) {
        let inner = self.inner.read();
        let mut endpoints: Vec<Arc<Endpoint>> = inner
            .by_endpoint
            .values()
            .filter(|entry| entry.active)
            .map(|entry| entry.endpoint.clone())
            .collect();
        endpoints.sort_by_key(|e| e.id());
        (endpoints, inner.current_store.clone())
    }

    pub fn by_endpoint_id(&self, id: EndpointId) -> Option<ApplicationStatus> {
        let inner = self.inner.read();
        inner.by_endpoint.get(&id).map(StatusEntry::snapshot)
    }

    /// Find the endpoint for (host, application name), with the store any
    /// follow-up query should run against. `None` when the application is
    /// unknown or the pair has never been active.
    pub fn endpoint_id_by_host_and_name(
        &self,
        host: &str,
        name: &str,
    ) -> (Option<Arc<Endpoint>>, Arc<Store>) {
        let inner = self.inner.read();
        let endpoint = self
            .applications
            .by_name(name)
            .and_then(|application| {
                inner
                    .by_host_port
                    .get(&(host.to_owned(), application.port()))
            })
            .cloned();
        (endpoint, inner.current_store.clone())
    }
}
