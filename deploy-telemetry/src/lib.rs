//! Telemetry bootstrap for the deployments API binaries.
//!
//! [`tracing`] wires structured logging (JSON rolling files in production,
//! pretty console output in development) and [`metrics`] installs the
//! Prometheus recorder rendered by the API's `/metrics` endpoint.

pub mod metrics;
pub mod tracing;
