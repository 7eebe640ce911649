/// Prefix a metric name with the service name.
#[macro_export]
macro_rules! metric_name {
    ($name:expr) => {
        format!("{}_{}", $crate::SERVICE_NAME, $name)
    };
}

/// Register an integer counter with the fleetmon registry and store it in a
/// static variable. An optional third argument specifies label names. The
/// reported metric name is the lower_snake_case of the declared variable
/// name.
#[macro_export]
macro_rules! register_fleetmon_counter {
    ($VIS:vis $NAME:ident, $HELP:literal $(,)?) => {
        $VIS static $NAME: std::sync::LazyLock<$crate::prometheus::IntCounter> =
            std::sync::LazyLock::new(|| {
                $crate::paste! {
                    let name = $crate::metric_name!(stringify!([<$NAME:lower>]));
                }
                $crate::prometheus::register_int_counter_with_registry!(
                    name,
                    $HELP,
                    $crate::FLEETMON_METRICS_REGISTRY,
                )
                .expect("Metric initialization failed")
            });
    };
    ($VIS:vis $NAME:ident, $HELP:literal, $LABELS:expr $(,)?) => {
        $VIS static $NAME: std::sync::LazyLock<$crate::prometheus::IntCounterVec> =
            std::sync::LazyLock::new(|| {
                $crate::paste! {
                    let name = $crate::metric_name!(stringify!([<$NAME:lower>]));
                }
                $crate::prometheus::register_int_counter_vec_with_registry!(
                    name,
                    $HELP,
                    $LABELS,
                    $crate::FLEETMON_METRICS_REGISTRY,
                )
                .expect("Metric initialization failed")
            });
    };
}

/// Register a floating-point gauge with the fleetmon registry and store it
/// in a static variable. An optional third argument specifies label names.
#[macro_export]
macro_rules! register_fleetmon_gauge {
    ($VIS:vis $NAME:ident, $HELP:literal $(,)?) => {
        $VIS static $NAME: std::sync::LazyLock<$crate::prometheus::Gauge> =
            std::sync::LazyLock::new(|| {
                $crate::paste! {
                    let name = $crate::metric_name!(stringify!([<$NAME:lower>]));
                }
                $crate::prometheus::register_gauge_with_registry!(
                    name,
                    $HELP,
                    $crate::FLEETMON_METRICS_REGISTRY,
                )
                .expect("Metric initialization failed")
            });
    };
    ($VIS:vis $NAME:ident, $HELP:literal, $LABELS:expr $(,)?) => {
        $VIS static $NAME: std::sync::LazyLock<$crate::prometheus::GaugeVec> =
            std::sync::LazyLock::new(|| {
                $crate::paste! {
                    let name = $crate::metric_name!(stringify!([<$NAME:lower>]));
                }
                $crate::prometheus::register_gauge_vec_with_registry!(
                    name,
                    $HELP,
                    $LABELS,
                    $crate::FLEETMON_METRICS_REGISTRY,
                )
                .expect("Metric initialization failed")
            });
    };
}

/// Register a histogram with the fleetmon registry and store it in a static
/// variable. An optional third argument specifies label names.
#[macro_export]
macro_rules! register_fleetmon_histogram {
    ($VIS:vis $NAME:ident, $HELP:literal $(,)?) => {
        $VIS static $NAME: std::sync::LazyLock<$crate::prometheus::Histogram> =
            std::sync::LazyLock::new(|| {
                $crate::paste! {
                    let name = $crate::metric_name!(stringify!([<$NAME:lower>]));
                }
                $crate::prometheus::register_histogram_with_registry!(
                    name,
                    $HELP,
                    $crate::FLEETMON_METRICS_REGISTRY,
                )
                .expect("Metric initialization failed")
            });
    };
    ($VIS:vis $NAME:ident, $HELP:literal, $LABELS:expr $(,)?) => {
        $VIS static $NAME: std::sync::LazyLock<$crate::prometheus::HistogramVec> =
            std::sync::LazyLock::new(|| {
                $crate::paste! {
                    let name = $crate::metric_name!(stringify!([<$NAME:lower>]));
                }
                $crate::prometheus::register_histogram_vec_with_registry!(
                    name,
                    $HELP,
                    $LABELS,
                    $crate::FLEETMON_METRICS_REGISTRY,
                )
                .expect("Metric initialization failed")
            });
    };
}
