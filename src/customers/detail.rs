use tracing::{info, instrument};

use crate::api::TaskBoardKind;
use crate::errors::{settle, ApiResult, LoadIssue};
use crate::model::{Activity, Customer, CustomerId, Note, Task};
use crate::scope::Scope;
use crate::services::Services;

/// Everything shown on a customer's detail page.
#[derive(Debug, Clone)]
pub struct CustomerOverview {
    pub customer: Customer,
    pub notes: Vec<Note>,
    pub onboarding_tasks: Vec<Task>,
    pub ai_tasks: Vec<Task>,
    pub activities: Vec<Activity>,
    /// Parts that failed to load while the rest succeeded.
    pub issues: Vec<LoadIssue>,
}

/// Fetch the customer and its related lists concurrently. The customer record
/// itself is required; the related lists degrade to empty with an issue each.
#[instrument(skip(services, scope))]
pub async fn load_overview(
    services: &Services,
    scope: &Scope,
    customer_id: CustomerId,
) -> ApiResult<CustomerOverview> {
    let api = services.api.as_ref();
    let (customer, notes, onboarding, ai, activities) = tokio::join!(
        scope.run(api.get_customer(customer_id)),
        scope.run(api.list_notes(customer_id)),
        scope.run(api.list_tasks(TaskBoardKind::Onboarding, customer_id)),
        scope.run(api.list_tasks(TaskBoardKind::AiContent, customer_id)),
        scope.run(api.customer_activities(customer_id)),
    );
    let customer = customer?;

    let mut issues = Vec::new();
    let mut notes = settle("notes", notes, &mut issues)?.unwrap_or_default();
    notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let onboarding_tasks = settle("onboarding tasks", onboarding, &mut issues)?.unwrap_or_default();
    let ai_tasks = settle("AI tasks", ai, &mut issues)?.unwrap_or_default();
    let mut activities = settle("activities", activities, &mut issues)?.unwrap_or_default();
    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    if !issues.is_empty() {
        services.notifier.warning(format!(
            "Some details could not be loaded: {}",
            issues
                .iter()
                .map(|i| i.part)
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    info!(
        customer_id,
        notes = notes.len(),
        activities = activities.len(),
        issues = issues.len(),
        "customer overview loaded"
    );

    Ok(CustomerOverview {
        customer,
        notes,
        onboarding_tasks,
        ai_tasks,
        activities,
        issues,
    })
}
