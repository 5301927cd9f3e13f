//! Cluster integration for the deployments API.
//!
//! This module turns raw orchestration resources into the application,
//! deployment and environment views served by the HTTP API. Consumers should
//! depend on the traits in [`base`] ([`K8sApi`], [`MetricsApi`],
//! [`ClientFactory`]) and avoid relying on a specific transport.
//!
//! The default resource client, [`http::HttpK8sApi`], is backed by the
//! [`kube`] crate and talks to the cluster using an explicitly configured
//! client (cluster URL and bearer token), never an ambient default. The
//! default metrics client, [`metrics::HttpMetricsApi`], queries a
//! Prometheus-compatible HTTP API.
//!
//! The algorithms themselves are pure functions of already-fetched inputs:
//! pod status classification in [`pods`], generation resolution in
//! [`deployment`], route resolution in [`route`], quota summarization in
//! [`quota`] and usage downsampling in [`stats`]. [`client`] composes them
//! into the request-scoped [`client::DeploymentsClient`].

mod base;
pub mod client;
pub mod deployment;
pub mod http;
pub mod metrics;
pub mod pods;
pub mod quota;
pub mod route;
pub mod stats;

pub use base::*;
