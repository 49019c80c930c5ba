// SPDX-License-Identifier: MIT

//! Cloud Tasks service for rate-limited stage dispatch.
//!
//! Each pipeline stage runs off its own queue so the search, scrape, and
//! publish rates can be throttled independently. Task creation failures are
//! surfaced as `AppError::Dispatch`; callers decide whether a failed
//! enqueue is fatal for the invocation that requested it.
//!
//! Uses the official google-cloud-tasks-v2 SDK.

use crate::config::{PUBLISH_QUEUE_NAME, SCRAPE_QUEUE_NAME, SEARCH_QUEUE_NAME};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Payload for a search-stage invocation.
///
/// `start_index` is the zero-based result offset on the faceted search;
/// an empty body (the Cloud Scheduler kick-off) means "first page,
/// default activity type".
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchTask {
    #[serde(default)]
    pub start_index: u32,
    #[serde(default)]
    pub activity_type: Option<String>,
}

/// Payload for a detail-scrape invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeTask {
    pub activity_url: String,
}

/// Payload for a publish invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishTask {
    pub activity_id: String,
}

/// Cloud Tasks client wrapper.
pub struct TasksService {
    project_id: String,
    location: String,
    service_url: String,
}

impl TasksService {
    pub fn new(project_id: &str, region: &str, service_url: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            location: region.to_string(),
            service_url: service_url.to_string(),
        }
    }

    /// Enqueue a search-stage task (used for pagination continuations).
    pub async fn enqueue_search(&self, payload: SearchTask) -> Result<String> {
        self.enqueue(SEARCH_QUEUE_NAME, "/tasks/search", &payload)
            .await
    }

    /// Enqueue a detail-scrape task for one listing URL.
    pub async fn enqueue_scrape(&self, payload: ScrapeTask) -> Result<String> {
        self.enqueue(SCRAPE_QUEUE_NAME, "/tasks/scrape", &payload)
            .await
    }

    /// Enqueue a publish task for one cached activity.
    pub async fn enqueue_publish(&self, payload: PublishTask) -> Result<String> {
        self.enqueue(PUBLISH_QUEUE_NAME, "/tasks/publish", &payload)
            .await
    }

    /// Generic task creation helper. Returns the server-assigned task name.
    async fn enqueue<T: Serialize>(
        &self,
        queue_name: &str,
        endpoint: &str,
        payload: &T,
    ) -> Result<String> {
        use google_cloud_tasks_v2::client::CloudTasks;
        use google_cloud_tasks_v2::model::{HttpRequest, OidcToken, Task};

        let client = CloudTasks::builder()
            .build()
            .await
            .map_err(|e| AppError::Dispatch(format!("Cloud Tasks client error: {}", e)))?;

        let queue_path = format!(
            "projects/{}/locations/{}/queues/{}",
            self.project_id, self.location, queue_name
        );

        let body = serde_json::to_vec(payload)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JSON error: {}", e)))?;

        let http_request = HttpRequest::default()
            .set_url(format!("{}{}", self.service_url, endpoint))
            .set_http_method("POST")
            .set_body(axum::body::Bytes::from(body))
            .set_headers(std::collections::HashMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]))
            .set_oidc_token(
                OidcToken::default()
                    .set_service_account_email(format!(
                        "trip-herald@{}.iam.gserviceaccount.com",
                        self.project_id
                    ))
                    .set_audience(self.service_url.clone()),
            );

        let task = Task::default().set_http_request(http_request);

        let response = client
            .create_task()
            .set_parent(queue_path)
            .set_task(task)
            .send()
            .await
            .map_err(|e| AppError::Dispatch(format!("Cloud Tasks create error: {}", e)))?;

        tracing::debug!(task = %response.name, queue = queue_name, "Created task");

        Ok(response.name)
    }

    /// Purge the search and scrape queues.
    ///
    /// Used when processing is paused to stop in-flight discovery. The
    /// publish queue is left alone: anything already scraped into the cache
    /// should still be announced when processing resumes.
    pub async fn purge_pipeline_queues(&self) -> Result<Vec<String>> {
        use google_cloud_tasks_v2::client::CloudTasks;

        let client = CloudTasks::builder()
            .build()
            .await
            .map_err(|e| AppError::Dispatch(format!("Cloud Tasks client error: {}", e)))?;

        let mut purged = Vec::new();
        for queue_name in [SEARCH_QUEUE_NAME, SCRAPE_QUEUE_NAME] {
            let queue_path = format!(
                "projects/{}/locations/{}/queues/{}",
                self.project_id, self.location, queue_name
            );

            client
                .purge_queue()
                .set_name(queue_path)
                .send()
                .await
                .map_err(|e| {
                    AppError::Dispatch(format!("Cloud Tasks purge error for {}: {}", queue_name, e))
                })?;

            tracing::info!(queue = queue_name, "Purged queue");
            purged.push(queue_name.to_string());
        }

        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_task_defaults_apply_to_empty_body() {
        let task: SearchTask = serde_json::from_str("{}").unwrap();
        assert_eq!(task.start_index, 0);
        assert_eq!(task.activity_type, None);
    }

    #[test]
    fn search_task_round_trips_pagination_fields() {
        let task: SearchTask =
            serde_json::from_str(r#"{"start_index":40,"activity_type":"Scrambling"}"#).unwrap();
        assert_eq!(task.start_index, 40);
        assert_eq!(task.activity_type.as_deref(), Some("Scrambling"));
    }

    #[test]
    fn scrape_task_requires_activity_url() {
        assert!(serde_json::from_str::<ScrapeTask>("{}").is_err());

        let task: ScrapeTask =
            serde_json::from_str(r#"{"activity_url":"https://host/activities/a-1"}"#).unwrap();
        assert_eq!(task.activity_url, "https://host/activities/a-1");
    }

    #[test]
    fn publish_task_carries_document_id() {
        let task = PublishTask {
            activity_id: "death-gully-72".to_string(),
        };
        let json = serde_json::to_string(&task).unwrap();
        assert_eq!(json, r#"{"activity_id":"death-gully-72"}"#);
    }
}
