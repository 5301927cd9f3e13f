use std::collections::HashMap;

use k8s_openapi::api::core::v1::Pod;

/// Bucket label for pods running with all containers ready.
pub const POD_RUNNING: &str = "Running";
/// Bucket label for running pods with fewer ready containers than declared.
pub const POD_NOT_READY: &str = "Not Ready";
/// Bucket label for pending pods without a recognized waiting reason.
pub const POD_WARNING: &str = "Warning";
/// Bucket label for pods with a crash-looping container.
pub const POD_ERROR: &str = "Error";
/// Bucket label for pods still pulling their images.
pub const POD_PULLING: &str = "Pulling";
/// Bucket label for pods marked for deletion.
pub const POD_TERMINATING: &str = "Terminating";

/// Container waiting reason while an image pull is in progress.
const CONTAINER_CREATING: &str = "ContainerCreating";
/// Container waiting reason for a crash loop.
const CONTAINER_CRASH_LOOP: &str = "CrashLoopBackOff";

/// Rendering order for the known buckets. Buckets named after unrecognized
/// phases sort alphabetically after these.
const BUCKET_ORDER: [&str; 6] = [
    POD_RUNNING,
    POD_NOT_READY,
    POD_WARNING,
    POD_ERROR,
    POD_PULLING,
    POD_TERMINATING,
];

/// Pod counts per status bucket, in a fixed deterministic order, plus the
/// total of counted pods.
///
/// Counts are rendered as strings, matching the representation consumed by
/// the UI. Pods in phase `Failed` appear in neither the buckets nor the
/// total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodStatusBreakdown {
    pub buckets: Vec<(String, String)>,
    pub total: usize,
}

/// Classifies a set of pods into status buckets.
///
/// Every non-`Failed` pod lands in exactly one bucket, so the bucket counts
/// always sum to `total`. The result is a pure function of the input set:
/// reordering the input never changes the output.
pub fn classify_pods(pods: &[Pod]) -> PodStatusBreakdown {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0;

    for pod in pods {
        let Some(label) = classify_pod(pod) else {
            continue;
        };
        *counts.entry(label).or_insert(0) += 1;
        total += 1;
    }

    let mut buckets = Vec::with_capacity(counts.len());
    for label in BUCKET_ORDER {
        if let Some(count) = counts.remove(label) {
            buckets.push((label.to_string(), count.to_string()));
        }
    }
    let mut remaining: Vec<(String, usize)> = counts.into_iter().collect();
    remaining.sort();
    buckets.extend(
        remaining
            .into_iter()
            .map(|(label, count)| (label, count.to_string())),
    );

    if buckets.is_empty() {
        // The UI always renders at least the running bucket.
        buckets.push((POD_RUNNING.to_string(), "0".to_string()));
    }

    PodStatusBreakdown { buckets, total }
}

/// Classifies one pod, returning `None` for pods excluded from the counts.
///
/// The categorization mirrors the one used by the cluster web console: a
/// deletion marker always wins, `Failed` pods are dropped, and the waiting
/// reasons of individual containers refine the `Pending` and `Running`
/// phases. Unrecognized phases become their own bucket so new upstream
/// phases surface instead of being swallowed.
fn classify_pod(pod: &Pod) -> Option<String> {
    if pod.metadata.deletion_timestamp.is_some() {
        return Some(POD_TERMINATING.to_string());
    }

    let phase = pod
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        .unwrap_or_default();

    match phase {
        "Failed" => None,
        "Pending" => {
            if any_container_waiting_on(pod, CONTAINER_CREATING) {
                Some(POD_PULLING.to_string())
            } else if any_container_waiting_on(pod, CONTAINER_CRASH_LOOP) {
                Some(POD_ERROR.to_string())
            } else {
                Some(POD_WARNING.to_string())
            }
        }
        "Running" => {
            if any_container_waiting_on(pod, CONTAINER_CRASH_LOOP) {
                Some(POD_ERROR.to_string())
            } else if ready_containers(pod) < declared_containers(pod) {
                Some(POD_NOT_READY.to_string())
            } else {
                Some(POD_RUNNING.to_string())
            }
        }
        other => Some(other.to_string()),
    }
}

fn any_container_waiting_on(pod: &Pod, reason: &str) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .is_some_and(|statuses| {
            statuses.iter().any(|container| {
                container
                    .state
                    .as_ref()
                    .and_then(|state| state.waiting.as_ref())
                    .and_then(|waiting| waiting.reason.as_deref())
                    == Some(reason)
            })
        })
}

fn ready_containers(pod: &Pod) -> usize {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .map(|statuses| statuses.iter().filter(|container| container.ready).count())
        .unwrap_or(0)
}

fn declared_containers(pod: &Pod) -> usize {
    pod.spec
        .as_ref()
        .map(|spec| spec.containers.len())
        .unwrap_or(0)
}
