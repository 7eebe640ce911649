use metrics::{
    log_counter,
    log_gauge,
    register_fleetmon_counter,
    register_fleetmon_gauge,
    register_fleetmon_histogram,
    Timer,
};

register_fleetmon_counter!(
    FLEET_ENDPOINTS_CREATED_TOTAL,
    "Endpoints minted for (host, application) pairs seen active for the first time"
);
pub fn log_endpoints_created(count: u64) {
    log_counter(&FLEET_ENDPOINTS_CREATED_TOTAL, count);
}

register_fleetmon_counter!(
    FLEET_ENDPOINTS_RETIRED_TOTAL,
    "Endpoints flipped inactive because their host left the fleet"
);
pub fn log_endpoints_retired(count: u64) {
    log_counter(&FLEET_ENDPOINTS_RETIRED_TOTAL, count);
}

register_fleetmon_gauge!(
    FLEET_ACTIVE_ENDPOINTS,
    "Endpoints currently eligible for polling"
);
pub fn log_active_endpoints(count: usize) {
    log_gauge(&FLEET_ACTIVE_ENDPOINTS, count as f64);
}

register_fleetmon_histogram!(
    FLEET_RECONCILE_SECONDS,
    "Time spent reconciling a fleet snapshot into the registry and store"
);
pub fn reconcile_timer() -> Timer {
    Timer::new(&FLEET_RECONCILE_SECONDS)
}
