//! Dashboard aggregation: stats, platform breakdown, recent activity and a
//! status breakdown computed from the customer list.
use tracing::{info, instrument};

use crate::customers::StatusBreakdown;
use crate::errors::{settle, ApiError, ApiResult, LoadIssue};
use crate::model::{Activity, DashboardStats, PlatformCount};
use crate::scope::Scope;
use crate::services::Services;

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub stats: Option<DashboardStats>,
    pub platforms: Vec<PlatformCount>,
    pub recent_activity: Vec<Activity>,
    pub status_breakdown: Option<StatusBreakdown>,
    pub issues: Vec<LoadIssue>,
}

impl Dashboard {
    pub fn is_partial(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Fan out to all dashboard endpoints concurrently. Each part settles on its
/// own; only when every part fails is the load an error, carrying the stats
/// request's own error.
#[instrument(skip(services, scope))]
pub async fn load(services: &Services, scope: &Scope, activity_limit: u32) -> ApiResult<Dashboard> {
    let api = services.api.as_ref();
    let (stats, platforms, activity, customers) = tokio::join!(
        scope.run(api.dashboard_stats()),
        scope.run(api.platform_breakdown()),
        scope.run(api.recent_activities(activity_limit)),
        scope.run(api.list_customers()),
    );

    let (stats, platforms, activity, customers) = match (stats, platforms, activity, customers) {
        (Err(stats), Err(platforms), Err(activity), Err(customers)) => {
            let rest = [
                ("platforms", platforms),
                ("recent activity", activity),
                ("customers", customers),
            ];
            return Err(all_failed(services, stats, rest));
        }
        parts => parts,
    };

    let mut issues = Vec::new();
    let stats = settle("stats", stats, &mut issues)?;
    let platforms = settle("platforms", platforms, &mut issues)?;
    let activity = settle("recent activity", activity, &mut issues)?;
    let customers = settle("customers", customers, &mut issues)?;

    let mut platforms = platforms.unwrap_or_default();
    platforms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.platform.cmp(&b.platform)));
    let mut recent_activity = activity.unwrap_or_default();
    recent_activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent_activity.truncate(activity_limit as usize);

    let dashboard = Dashboard {
        stats,
        platforms,
        recent_activity,
        status_breakdown: customers.as_deref().map(StatusBreakdown::of),
        issues,
    };
    if dashboard.is_partial() {
        services.notifier.warning(format!(
            "Dashboard partially loaded ({} part(s) failed)",
            dashboard.issues.len()
        ));
    }
    info!(partial = dashboard.is_partial(), "dashboard loaded");
    Ok(dashboard)
}

/// Every part failed: report them together and hand back the stats error.
fn all_failed(services: &Services, stats: ApiError, rest: [(&'static str, ApiError); 3]) -> ApiError {
    if stats.is_cancelled() || rest.iter().any(|(_, err)| err.is_cancelled()) {
        return ApiError::Cancelled;
    }
    let message = std::iter::once(format!("stats: {}", stats))
        .chain(rest.iter().map(|(part, err)| format!("{}: {}", part, err)))
        .collect::<Vec<_>>()
        .join("; ");
    services
        .notifier
        .error(format!("Dashboard unavailable: {}", message));
    stats
}
