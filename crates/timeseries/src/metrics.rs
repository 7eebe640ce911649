use metrics::{
    log_counter,
    register_fleetmon_counter,
};

register_fleetmon_counter!(
    STORE_SAMPLES_APPENDED_TOTAL,
    "Samples accepted into a time series"
);
pub fn log_sample_appended() {
    log_counter(&STORE_SAMPLES_APPENDED_TOTAL, 1);
}

register_fleetmon_counter!(
    STORE_SAMPLES_REJECTED_TOTAL,
    "Samples dropped for stale or duplicate timestamps or an inactive series"
);
pub fn log_sample_rejected() {
    log_counter(&STORE_SAMPLES_REJECTED_TOTAL, 1);
}

register_fleetmon_counter!(
    STORE_PAGES_RECYCLED_TOTAL,
    "Pages reclaimed from their owner to serve a new allocation"
);
pub fn log_page_recycled() {
    log_counter(&STORE_PAGES_RECYCLED_TOTAL, 1);
}

register_fleetmon_counter!(
    STORE_SERIES_CREATED_TOTAL,
    "Time series created on first sight of an (endpoint, metric) pair"
);
pub fn log_series_created() {
    log_counter(&STORE_SERIES_CREATED_TOTAL, 1);
}
