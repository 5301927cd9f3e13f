use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ReplicationController;

use crate::utils::parse_image_tag;

/// Label carrying the space a resource belongs to.
pub const SPACE_LABEL: &str = "space";

/// Label carrying the human-readable version of a generation.
pub const VERSION_LABEL: &str = "version";

/// Annotation linking a replication-controller generation to the application
/// it was rolled out for.
pub const APPLICATION_ANNOTATION: &str = "openshift.io/deployment-config.name";

/// Annotation carrying the rollout ordinal of a generation. Newer rollouts
/// have strictly larger ordinals.
pub const GENERATION_ANNOTATION: &str = "openshift.io/deployment-config.latest-version";

/// The replication-controller generations backing one deployment.
///
/// `current` is the newest generation for the application. `previous` is the
/// newest strictly-older generation that still reports live replicas, kept
/// only while a rollout has not fully converged.
#[derive(Debug, Clone)]
pub struct Generations {
    pub current: ReplicationController,
    pub previous: Option<ReplicationController>,
}

/// Selects the current and previous generations for an application from the
/// replication controllers of one environment namespace.
///
/// Returns `None` when no generation matches the application, which callers
/// surface as a not-found outcome.
pub fn select_generations(
    controllers: Vec<ReplicationController>,
    application: &str,
) -> Option<Generations> {
    let mut matching: Vec<(u64, ReplicationController)> = controllers
        .into_iter()
        .filter(|controller| annotation(controller, APPLICATION_ANNOTATION) == Some(application))
        .map(|controller| (generation_ordinal(&controller), controller))
        .collect();

    if matching.is_empty() {
        return None;
    }

    matching.sort_by_key(|(ordinal, _)| *ordinal);
    let (current_ordinal, current) = matching.pop().expect("matching is non-empty");

    // An older generation only counts as "previous" while it still has pods;
    // once the rollout converges it is scaled to zero and disappears from
    // the view.
    let previous = matching
        .into_iter()
        .rev()
        .find(|(ordinal, controller)| *ordinal < current_ordinal && live_replicas(controller) > 0)
        .map(|(_, controller)| controller);

    Some(Generations { current, previous })
}

/// Returns the complete label set of a generation's pod template.
///
/// Pods created from the generation carry exactly these labels, and services
/// select over them, so the set is the correlation key for both ownership
/// and route resolution.
pub fn template_labels(controller: &ReplicationController) -> BTreeMap<String, String> {
    controller
        .spec
        .as_ref()
        .and_then(|spec| spec.template.as_ref())
        .and_then(|template| template.metadata.as_ref())
        .and_then(|metadata| metadata.labels.clone())
        .unwrap_or_default()
}

/// Renders a label set as a selector string, `key=value` pairs joined by
/// commas in key order.
pub fn label_selector(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Extracts a display version for a generation.
///
/// Prefers the `version` label on the controller, then on its pod template,
/// and finally falls back to the image tag of the first container.
pub fn display_version(controller: &ReplicationController) -> String {
    if let Some(version) = controller
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(VERSION_LABEL))
    {
        return version.clone();
    }

    let template = template_labels(controller);
    if let Some(version) = template.get(VERSION_LABEL) {
        return version.clone();
    }

    controller
        .spec
        .as_ref()
        .and_then(|spec| spec.template.as_ref())
        .and_then(|template| template.spec.as_ref())
        .and_then(|pod_spec| pod_spec.containers.first())
        .and_then(|container| container.image.as_deref())
        .map(parse_image_tag)
        .unwrap_or_else(|| "unavailable".to_string())
}

/// Returns the application a generation was rolled out for, if recorded.
pub fn application_name(controller: &ReplicationController) -> Option<&str> {
    annotation(controller, APPLICATION_ANNOTATION)
}

fn annotation<'a>(controller: &'a ReplicationController, key: &str) -> Option<&'a str> {
    controller
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(key))
        .map(String::as_str)
}

fn generation_ordinal(controller: &ReplicationController) -> u64 {
    annotation(controller, GENERATION_ANNOTATION)
        .and_then(|ordinal| ordinal.parse().ok())
        .unwrap_or(0)
}

fn live_replicas(controller: &ReplicationController) -> i32 {
    controller
        .status
        .as_ref()
        .map(|status| status.replicas)
        .unwrap_or(0)
}
