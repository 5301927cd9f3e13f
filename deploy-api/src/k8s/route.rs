use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Service;
use serde_json::Value;

use crate::k8s::RawKind;

/// Coordinates of the route kind, which has no typed bindings and is fetched
/// through the dynamic API.
pub const ROUTE_KIND: RawKind = RawKind {
    group: "route.openshift.io",
    version: "v1",
    kind: "Route",
    plural: "routes",
};

/// Condition type signalling that the routing layer accepted an ingress.
const ADMITTED_CONDITION: &str = "Admitted";
/// Condition status signalling acceptance.
const CONDITION_TRUE: &str = "True";

/// A route resource decoded into the parts relevant for resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteCandidate {
    /// Name of the route resource.
    pub name: String,
    /// Name of the service the route points at.
    pub target_service: String,
    /// Whether the route declares TLS termination.
    pub tls: bool,
    /// Admitted ingress entries offered by the route.
    pub ingress: Vec<IngressEntry>,
}

/// One admitted, externally reachable endpoint of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct IngressEntry {
    pub host: String,
    /// Admission time as reported upstream (ISO-8601), preserved verbatim.
    pub admitted_at: Option<String>,
}

/// An externally reachable address for a deployment.
///
/// Absence of a resolved route is a normal, displayable state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub scheme: &'static str,
    pub host: String,
}

impl ResolvedRoute {
    /// Renders the route as a URL string.
    pub fn to_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Decodes a raw route object into a [`RouteCandidate`].
///
/// This is the only place that traverses the loosely-typed route
/// representation; everything downstream works on the typed intermediate.
/// Routes without a target service are dropped, and only ingress entries
/// with an `Admitted`/`True` condition are kept. When an entry carries
/// several admission conditions, the most recent one provides its admission
/// time.
pub fn decode_route(value: &Value) -> Option<RouteCandidate> {
    let target_service = value
        .pointer("/spec/to/name")
        .and_then(Value::as_str)?
        .to_string();
    let name = value
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let tls = value
        .pointer("/spec/tls")
        .is_some_and(|tls| !tls.is_null());

    let mut ingress = Vec::new();
    let entries = value
        .pointer("/status/ingress")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for entry in &entries {
        let Some(host) = entry.get("host").and_then(Value::as_str) else {
            continue;
        };
        let Some(admitted_at) = latest_admission(entry) else {
            continue;
        };
        ingress.push(IngressEntry {
            host: host.to_string(),
            admitted_at,
        });
    }

    Some(RouteCandidate {
        name,
        target_service,
        tls,
        ingress,
    })
}

/// Returns the admission time of an ingress entry, or `None` when the entry
/// was never admitted. An admitted entry without a timestamp yields
/// `Some(None)`.
fn latest_admission(entry: &Value) -> Option<Option<String>> {
    let conditions = entry.get("conditions").and_then(Value::as_array)?;

    let mut admitted = false;
    let mut latest: Option<(DateTime<Utc>, String)> = None;
    for condition in conditions {
        let is_admitted = condition.get("type").and_then(Value::as_str) == Some(ADMITTED_CONDITION)
            && condition.get("status").and_then(Value::as_str) == Some(CONDITION_TRUE);
        if !is_admitted {
            continue;
        }
        admitted = true;

        let Some(raw) = condition.get("lastTransitionTime").and_then(Value::as_str) else {
            continue;
        };
        let Some(parsed) = parse_admission_time(raw) else {
            continue;
        };
        if latest.as_ref().is_none_or(|(best, _)| parsed > *best) {
            latest = Some((parsed, raw.to_string()));
        }
    }

    admitted.then(|| latest.map(|(_, raw)| raw))
}

/// Keeps the services whose selector is a non-empty subset of the pod
/// template labels, returning their names.
pub fn matching_services(
    services: &[Service],
    template_labels: &BTreeMap<String, String>,
) -> Vec<String> {
    services
        .iter()
        .filter(|service| {
            service
                .spec
                .as_ref()
                .and_then(|spec| spec.selector.as_ref())
                .is_some_and(|selector| {
                    !selector.is_empty()
                        && selector
                            .iter()
                            .all(|(key, value)| template_labels.get(key) == Some(value))
                })
        })
        .filter_map(|service| service.metadata.name.clone())
        .collect()
}

/// Chooses the externally reachable address for a deployment from the routes
/// targeting its services.
///
/// Among all admitted ingress entries across all candidate routes, the one
/// with the most recent admission time wins; entries without a parseable
/// admission time only win when no timestamped entry exists. On equal
/// timestamps the entry encountered first is kept. Returns `None` when no
/// route admits, which the caller renders as a deployment without a URL.
pub fn resolve_route(routes: &[RouteCandidate], service_names: &[String]) -> Option<ResolvedRoute> {
    let mut best: Option<(Option<DateTime<Utc>>, ResolvedRoute)> = None;

    for route in routes {
        if !service_names.contains(&route.target_service) {
            continue;
        }
        let scheme = if route.tls { "https" } else { "http" };

        for entry in &route.ingress {
            let admitted_at = entry
                .admitted_at
                .as_deref()
                .and_then(parse_admission_time);
            let candidate = ResolvedRoute {
                scheme,
                host: entry.host.clone(),
            };
            let more_recent = match (&best, &admitted_at) {
                (None, _) => true,
                (Some((None, _)), Some(_)) => true,
                (Some((None, _)), None) => false,
                (Some((Some(_), _)), None) => false,
                (Some((Some(current), _)), Some(candidate_at)) => candidate_at > current,
            };
            if more_recent {
                best = Some((admitted_at, candidate));
            }
        }
    }

    best.map(|(_, route)| route)
}

fn parse_admission_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|time| time.with_timezone(&Utc))
}
