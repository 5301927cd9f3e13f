use k8s_openapi::api::core::v1::ResourceQuota;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Quota keys under which CPU limits are reported.
const CPU_QUOTA_KEYS: [&str; 2] = ["limits.cpu", "cpu"];
/// Quota keys under which memory limits are reported.
const MEMORY_QUOTA_KEYS: [&str; 2] = ["limits.memory", "memory"];

/// Used and allowed amounts for one resource dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuotaUsage {
    pub used: f64,
    pub quota: f64,
}

/// CPU and memory quota usage of one environment namespace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnvironmentQuota {
    /// CPU, in cores.
    pub cpu_cores: QuotaUsage,
    /// Memory, in bytes.
    pub memory: QuotaUsage,
}

/// Sums the CPU and memory quotas of a namespace.
///
/// Returns `None` when no quota reports either dimension, which the caller
/// renders as an environment without quota information.
pub fn summarize_quotas(quotas: &[ResourceQuota]) -> Option<EnvironmentQuota> {
    let mut cpu = QuotaUsage {
        used: 0.0,
        quota: 0.0,
    };
    let mut memory = QuotaUsage {
        used: 0.0,
        quota: 0.0,
    };
    let mut seen = false;

    for quota in quotas {
        let Some(status) = quota.status.as_ref() else {
            continue;
        };
        for key in CPU_QUOTA_KEYS {
            if let Some(hard) = status.hard.as_ref().and_then(|hard| hard.get(key)) {
                cpu.quota += parse_quantity(hard);
                cpu.used += status
                    .used
                    .as_ref()
                    .and_then(|used| used.get(key))
                    .map(parse_quantity)
                    .unwrap_or(0.0);
                seen = true;
                break;
            }
        }
        for key in MEMORY_QUOTA_KEYS {
            if let Some(hard) = status.hard.as_ref().and_then(|hard| hard.get(key)) {
                memory.quota += parse_quantity(hard);
                memory.used += status
                    .used
                    .as_ref()
                    .and_then(|used| used.get(key))
                    .map(parse_quantity)
                    .unwrap_or(0.0);
                seen = true;
                break;
            }
        }
    }

    seen.then_some(EnvironmentQuota {
        cpu_cores: cpu,
        memory,
    })
}

/// Parses an orchestration quantity string into a float.
///
/// Handles the decimal suffixes (`m`, `k`, `M`, `G`, `T`), the binary
/// suffixes (`Ki`, `Mi`, `Gi`, `Ti`) and plain numbers. Unparseable values
/// count as zero rather than failing the whole environment view.
pub fn parse_quantity(quantity: &Quantity) -> f64 {
    let raw = quantity.0.trim();

    let (number, scale) = if let Some(number) = raw.strip_suffix("Ki") {
        (number, 1024.0)
    } else if let Some(number) = raw.strip_suffix("Mi") {
        (number, 1024.0 * 1024.0)
    } else if let Some(number) = raw.strip_suffix("Gi") {
        (number, 1024.0 * 1024.0 * 1024.0)
    } else if let Some(number) = raw.strip_suffix("Ti") {
        (number, 1024.0 * 1024.0 * 1024.0 * 1024.0)
    } else if let Some(number) = raw.strip_suffix('m') {
        (number, 1e-3)
    } else if let Some(number) = raw.strip_suffix('k') {
        (number, 1e3)
    } else if let Some(number) = raw.strip_suffix('M') {
        (number, 1e6)
    } else if let Some(number) = raw.strip_suffix('G') {
        (number, 1e9)
    } else if let Some(number) = raw.strip_suffix('T') {
        (number, 1e12)
    } else {
        (raw, 1.0)
    };

    number.parse::<f64>().map(|value| value * scale).unwrap_or(0.0)
}
