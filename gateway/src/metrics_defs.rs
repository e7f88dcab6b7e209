//! Metrics definitions for the gateway.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Inbound request duration in seconds. Tagged with action, status.",
};

pub const BACKEND_REQUEST_DURATION: MetricDef = MetricDef {
    name: "backend.request.duration",
    metric_type: MetricType::Histogram,
    description: "Duration of a single backend API call in seconds. Tagged with command.",
};

pub const BACKEND_JOB_POLLS: MetricDef = MetricDef {
    name: "backend.job.polls",
    metric_type: MetricType::Histogram,
    description: "Number of job status queries needed before an async job finished",
};

pub const BACKEND_JOB_TIMEOUT: MetricDef = MetricDef {
    name: "backend.job.timeout",
    metric_type: MetricType::Counter,
    description: "Async jobs abandoned because they exceeded the poll budget",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    BACKEND_REQUEST_DURATION,
    BACKEND_JOB_POLLS,
    BACKEND_JOB_TIMEOUT,
];
