use prometheus::{
    Gauge,
    GaugeVec,
    Histogram,
    HistogramVec,
    IntCounter,
    IntCounterVec,
};

pub fn log_counter(counter: &IntCounter, increment: u64) {
    counter.inc_by(increment);
}

pub fn log_counter_with_labels(counter: &IntCounterVec, increment: u64, labels: &[&str]) {
    counter.with_label_values(labels).inc_by(increment);
}

pub fn log_gauge(gauge: &Gauge, value: f64) {
    gauge.set(value);
}

pub fn log_gauge_with_labels(gauge: &GaugeVec, value: f64, labels: &[&str]) {
    gauge.with_label_values(labels).set(value);
}

pub fn log_distribution(histogram: &Histogram, value: f64) {
    histogram.observe(value);
}

pub fn log_distribution_with_labels(histogram: &HistogramVec, value: f64, labels: &[&str]) {
    histogram.with_label_values(labels).observe(value);
}
