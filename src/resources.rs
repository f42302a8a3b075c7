use tracing::warn;

use crate::client::Collaborator;
use crate::error::TriageResult;
use crate::models::ResourceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityBand {
    Normal,
    Warning,
    Critical,
}

impl CapacityBand {
    pub fn label(self) -> &'static str {
        match self {
            CapacityBand::Normal => "normal",
            CapacityBand::Warning => "warning",
            CapacityBand::Critical => "critical",
        }
    }
}

pub async fn fetch_resources(collaborator: &dyn Collaborator) -> TriageResult<Vec<ResourceStatus>> {
    let resources = collaborator.fetch_resources().await?;
    for resource in resources.iter().filter(|r| !is_consistent(r)) {
        warn!(
            resource_type = %resource.resource_type,
            total_capacity = resource.total_capacity,
            used = resource.used,
            available = resource.available,
            "inconsistent resource counts; deriving availability from used"
        );
    }
    Ok(resources)
}

/// `0 <= used <= total_capacity` and `available == total_capacity - used`.
pub fn is_consistent(resource: &ResourceStatus) -> bool {
    (0..=resource.total_capacity).contains(&resource.used)
        && resource.available == resource.total_capacity - resource.used
}

/// Free units, always derived from `used` so gauges and bands agree.
pub fn available(resource: &ResourceStatus) -> i64 {
    let total = resource.total_capacity.max(0);
    total - resource.used.clamp(0, total)
}

/// `used / total_capacity`, or `None` for a resource with no capacity.
pub fn utilization(resource: &ResourceStatus) -> Option<f64> {
    if resource.total_capacity <= 0 {
        return None;
    }
    let used = resource.used.clamp(0, resource.total_capacity);
    Some(used as f64 / resource.total_capacity as f64)
}

/// Zero capacity is treated as an unavailable resource.
pub fn band(resource: &ResourceStatus) -> CapacityBand {
    match utilization(resource) {
        None => CapacityBand::Critical,
        Some(ratio) if ratio > 0.8 => CapacityBand::Critical,
        Some(ratio) if ratio > 0.5 => CapacityBand::Warning,
        Some(_) => CapacityBand::Normal,
    }
}

/// Share of total capacity still available across every resource, in percent.
pub fn available_percent(resources: &[ResourceStatus]) -> f64 {
    let total: i64 = resources.iter().map(|r| r.total_capacity.max(0)).sum();
    if total == 0 {
        return 0.0;
    }
    let free: i64 = resources.iter().map(available).sum();
    free as f64 / total as f64 * 100.0
}
