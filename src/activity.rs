//! Activity / audit feed.
use tracing::instrument;

use crate::errors::ApiResult;
use crate::model::{Activity, CustomerId};
use crate::scope::Scope;
use crate::services::Services;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    Global,
    Customer(CustomerId),
}

/// Load a feed, newest first, at most `limit` entries.
#[instrument(skip(services, scope))]
pub async fn load_feed(
    services: &Services,
    scope: &Scope,
    source: FeedSource,
    limit: u32,
) -> ApiResult<Vec<Activity>> {
    let api = services.api.as_ref();
    let result = match source {
        FeedSource::Global => scope.run(api.recent_activities(limit)).await,
        FeedSource::Customer(id) => scope.run(api.customer_activities(id)).await,
    };
    match result {
        Ok(mut feed) => {
            feed.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            feed.truncate(limit as usize);
            Ok(feed)
        }
        Err(err) => {
            if !err.is_cancelled() {
                services
                    .notifier
                    .error(format!("Could not load activity: {}", err));
            }
            Err(err)
        }
    }
}

/// Short label for an activity type, used where no icon is supplied.
pub fn label(activity: &Activity) -> &str {
    activity
        .icon
        .as_deref()
        .filter(|icon| !icon.trim().is_empty())
        .unwrap_or(activity.activity_type.as_str())
}
