use std::{
    sync::{
        atomic::{
            AtomicBool,
            Ordering,
        },
        Arc,
    },
    thread,
    time::Duration,
};

use common::{
    MetricKey,
    MetricType,
    Timestamp,
};
use timeseries::{
    MetricSample,
    PagePool,
    Sample,
    SampleValue,
};

use crate::{
    application::{
        ApplicationList,
        ApplicationListBuilder,
    },
    endpoint::Endpoint,
    machine::{
        AwsMetadata,
        Machine,
    },
    registry::ApplicationStatuses,
    status::{
        PollState,
        PollStatus,
    },
};

fn ts(secs: f64) -> Timestamp {
    Timestamp::from_secs_f64(secs)
}

fn applications(defs: &[(&str, u16)]) -> ApplicationList {
    let mut builder = ApplicationListBuilder::new();
    for (name, port) in defs {
        builder.add(*port, *name, vec!["poll".to_owned()]).unwrap();
    }
    builder.build()
}

fn registry(defs: &[(&str, u16)]) -> ApplicationStatuses {
    ApplicationStatuses::new(applications(defs), PagePool::new(64))
}

fn machine(host: &str) -> Machine {
    Machine::new(host, format!("i-{host}"))
}

fn gauge(name: &str) -> MetricKey {
    MetricKey::new(name, MetricType::Gauge)
}

fn sample(name: &str, value: f64) -> MetricSample {
    MetricSample {
        key: gauge(name),
        value,
    }
}

fn collect(
    store: &timeseries::Store,
    endpoint: &Endpoint,
    name: &str,
) -> Vec<(f64, SampleValue)> {
    let mut out = Vec::new();
    store.fetch(
        endpoint.id(),
        &gauge(name),
        ts(0.0),
        ts(f64::MAX),
        &mut |s: &Sample| {
            out.push((s.timestamp.as_secs_f64(), s.value));
            true
        },
    );
    out
}

#[test]
fn test_birth_poll_death() {
    let registry = registry(&[("web", 80)]);
    registry.mark_hosts_active_exclusively(ts(900.0), &[machine("h1")]);

    let (endpoints, store) = registry.active_endpoint_ids();
    assert_eq!(endpoints.len(), 1);
    let endpoint = endpoints[0].clone();
    assert_eq!(endpoint.host_name(), "h1");
    assert_eq!(endpoint.port(), 80);

    for (t, value) in [(1000.0, 10.0), (1010.0, 10.0), (1020.0, 11.0)] {
        let changed = store.add_batch(endpoint.id(), ts(t), &[sample("conn", value)]);
        registry.log_changed_metric_count(&endpoint, changed as u64);
    }
    // First sight (changed), repeat (unchanged), new value (changed): two
    // changes over three cycles.
    let status = registry.by_endpoint_id(endpoint.id()).unwrap();
    assert!((status.average_changed_metrics() - 2.0 / 3.0).abs() < 1e-9);

    // The whole fleet departs.
    registry.mark_hosts_active_exclusively(ts(1030.0), &[]);

    let status = registry.by_endpoint_id(endpoint.id()).unwrap();
    assert!(!status.active);
    let (active, current) = registry.active_endpoint_ids();
    assert!(active.is_empty());
    assert!(registry.all_active_with_store().0.is_empty());
    assert!(!current.contains_endpoint(endpoint.id()));

    // History survives through the store handle obtained before the
    // reconfiguration, terminated by the sentinel.
    let samples = collect(&store, &endpoint, "conn");
    assert_eq!(samples.len(), 4);
    assert_eq!(samples[0].0, 1030.0);
    assert!(samples[0].1.is_inactive());
    assert_eq!(samples[1].1, SampleValue::Numeric(11.0));
    assert_eq!(samples[3].1, SampleValue::Numeric(10.0));
}

#[test]
fn test_fleet_churn_preserves_history() {
    let registry = registry(&[("web", 80), ("db", 5432)]);
    registry.mark_hosts_active_exclusively(ts(100.0), &[machine("h1")]);

    let (endpoints, store) = registry.active_endpoint_ids();
    assert_eq!(endpoints.len(), 2);
    for (i, endpoint) in endpoints.iter().enumerate() {
        for step in 0..10 {
            store.add_batch(
                endpoint.id(),
                ts(200.0 + step as f64),
                &[sample("conn", (i + step) as f64)],
            );
        }
    }

    registry.mark_hosts_active_exclusively(ts(300.0), &[machine("h1"), machine("h2")]);

    let (after, current) = registry.active_endpoint_ids();
    assert_eq!(after.len(), 4);
    assert_eq!(registry.all().len(), 4);
    // h1's endpoints kept their identity across the snapshot.
    for endpoint in &endpoints {
        assert!(after.iter().any(|e| e.id() == endpoint.id()));
        // Previously stored samples remain queryable in the new store.
        assert_eq!(collect(&current, endpoint, "conn").len(), 10);
    }
    // h2's endpoints exist with empty series.
    for endpoint in after.iter().filter(|e| e.host_name() == "h2") {
        assert!(current.contains_endpoint(endpoint.id()));
        assert!(current.latest_by_endpoint(endpoint.id()).is_empty());
    }
}

#[test]
fn test_reconcile_idempotent() {
    let registry = registry(&[("web", 80)]);
    let mut h1 = machine("h1");
    h1.aws = Some(AwsMetadata {
        region: "us-east-1".to_owned(),
        availability_zone: "us-east-1a".to_owned(),
    });
    let fleet = [h1, machine("h2")];
    registry.mark_hosts_active_exclusively(ts(100.0), &fleet);

    let (before, store_before) = registry.all_with_store(|_| true);
    registry.mark_hosts_active_exclusively(ts(200.0), &fleet);
    let (after, store_after) = registry.all_with_store(|_| true);

    // Same machine list: no status change and the very same store.
    assert!(Arc::ptr_eq(&store_before, &store_after));
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.endpoint, a.endpoint);
        assert_eq!(b.active, a.active);
    }
}

#[test]
fn test_departed_endpoint_returns_with_identity_and_empty_series() {
    let registry = registry(&[("web", 80)]);
    registry.mark_hosts_active_exclusively(ts(100.0), &[machine("h1")]);
    let (endpoints, store) = registry.active_endpoint_ids();
    let endpoint = endpoints[0].clone();
    store.add_batch(endpoint.id(), ts(150.0), &[sample("conn", 1.0)]);

    registry.mark_hosts_active_exclusively(ts(200.0), &[]);
    registry.mark_hosts_active_exclusively(ts(300.0), &[machine("h1")]);

    let (returned, current) = registry.active_endpoint_ids();
    assert_eq!(returned.len(), 1);
    // Same identity as before the departure.
    assert_eq!(returned[0].id(), endpoint.id());
    // The terminated series stayed with the old store; the comeback starts
    // clean and accepts samples again.
    assert!(current.latest_by_endpoint(endpoint.id()).is_empty());
    assert_eq!(
        current.add_batch(endpoint.id(), ts(350.0), &[sample("conn", 2.0)]),
        1
    );
}

#[test]
fn test_update_refreshes_sync_fields() {
    let registry = registry(&[("web", 80)]);
    registry.mark_hosts_active_exclusively(ts(100.0), &[machine("h1")]);
    let (endpoints, _) = registry.active_endpoint_ids();
    let endpoint = &endpoints[0];

    registry.update(endpoint, PollState::transition(PollStatus::Connecting, ts(110.0)));
    let status = registry.by_endpoint_id(endpoint.id()).unwrap();
    assert_eq!(status.status, PollStatus::Connecting);
    assert!(status.last_read_time.is_none());

    registry.update(
        endpoint,
        PollState::synced(ts(120.0), Duration::from_millis(250), 42),
    );
    let status = registry.by_endpoint_id(endpoint.id()).unwrap();
    assert_eq!(status.status, PollStatus::Synced);
    assert_eq!(status.last_read_time, Some(ts(120.0)));
    assert_eq!(status.last_poll_duration, Some(Duration::from_millis(250)));
    assert_eq!(status.initial_metric_count, 42);
}

#[test]
fn test_report_error_down_transitions() {
    let registry = registry(&[("web", 80)]);
    registry.mark_hosts_active_exclusively(ts(100.0), &[machine("h1")]);
    let (endpoints, _) = registry.active_endpoint_ids();
    let endpoint = &endpoints[0];

    let error = anyhow::anyhow!("connection refused");
    registry.report_error(endpoint, Some(&error), ts(110.0));
    let status = registry.by_endpoint_id(endpoint.id()).unwrap();
    assert!(status.down);
    assert_eq!(status.last_error.as_deref(), Some("connection refused"));
    assert_eq!(status.last_error_time, Some(ts(110.0)));
    assert!(status.last_error_time_display().is_some());

    registry.report_error(endpoint, None, ts(120.0));
    let status = registry.by_endpoint_id(endpoint.id()).unwrap();
    assert!(!status.down);
    assert!(status.last_error.is_none());
    assert!(status.last_error_time.is_none());
    assert_eq!(status.up_since, Some(ts(120.0)));
}

#[test]
#[should_panic(expected = "not issued by this registry")]
fn test_update_with_foreign_endpoint_panics() {
    let registry = registry(&[("web", 80)]);
    registry.mark_hosts_active_exclusively(ts(100.0), &[machine("h1")]);
    let rogue = Endpoint::new("h1", 80);
    registry.update(&rogue, PollState::transition(PollStatus::Polling, ts(110.0)));
}

#[test]
fn test_endpoint_id_by_host_and_name() {
    let registry = registry(&[("web", 80), ("db", 5432)]);
    registry.mark_hosts_active_exclusively(ts(100.0), &[machine("h1")]);
    assert_eq!(registry.applications().by_name("db").unwrap().port(), 5432);

    let (found, _) = registry.endpoint_id_by_host_and_name("h1", "db");
    assert_eq!(found.unwrap().port(), 5432);
    let (missing, _) = registry.endpoint_id_by_host_and_name("h2", "db");
    assert!(missing.is_none());
    let (unknown_app, _) = registry.endpoint_id_by_host_and_name("h1", "cache");
    assert!(unknown_app.is_none());
}

#[test]
fn test_concurrent_writer_and_reader_see_consistent_pairs() {
    let registry = Arc::new(registry(&[("web", 80)]));
    registry.mark_hosts_active_exclusively(ts(0.0), &[machine("h1")]);
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let registry = registry.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let fleets = [
                vec![machine("h1")],
                vec![machine("h1"), machine("h2")],
                vec![machine("h2")],
            ];
            let mut now = 1000.0;
            for round in 0..300usize {
                registry.mark_hosts_active_exclusively(ts(now), &fleets[round % fleets.len()]);
                now += 1.0;
                let (endpoints, store) = registry.active_endpoint_ids();
                for endpoint in &endpoints {
                    store.add_batch(
                        endpoint.id(),
                        ts(now),
                        &[sample("conn", round as f64)],
                    );
                    now += 1.0;
                }
            }
            stop.store(true, Ordering::Release);
        })
    };

    while !stop.load(Ordering::Acquire) {
        let (snapshots, store) = registry.all_with_store(|_| true);
        let active: Vec<_> = snapshots
            .iter()
            .filter(|s| s.active)
            .map(|s| s.endpoint.id())
            .collect();
        // The pair is mutually consistent: the store's endpoints are exactly
        // the snapshots' active set.
        assert_eq!(active, store.endpoint_ids());
    }
    writer.join().unwrap();

    let (_, store) = registry.all_with_store(|_| true);
    store.pool().consistency_check();
}
