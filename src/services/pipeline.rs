// SPDX-License-Identifier: MIT

//! Stage runners for the discovery pipeline.
//!
//! Each stage is a free function over four seams (cache, dispatcher,
//! announcer, page source), so route handlers pass the real Firestore,
//! Cloud Tasks, Discord, and HTTP clients while tests substitute
//! in-memory fakes. Every runner returns a report instead of an error:
//! the report's status decides the HTTP code and therefore whether the
//! queue retries the invocation.

use crate::config::{Config, SEARCH_PAGE_SIZE};
use crate::db::CreateOutcome;
use crate::error::Result;
use crate::extract;
use crate::models::{activity, Activity, Bookkeeping, Leader, Place, Stage, StageStatus};
use crate::services::discord;
use crate::services::tasks::{PublishTask, ScrapeTask, SearchTask};
use chrono::{DateTime, Duration, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bound on concurrent Cloud Tasks creations during a catchup sweep.
const MAX_CONCURRENT_ENQUEUES: usize = 10;

/// Firestore-backed cache seam.
pub trait Cache {
    fn get_activity(&self, activity_id: &str)
        -> impl Future<Output = Result<Option<Activity>>> + Send;
    fn activity_exists(&self, activity_id: &str) -> impl Future<Output = Result<bool>> + Send;
    fn create_activity(
        &self,
        activity: &Activity,
    ) -> impl Future<Output = Result<CreateOutcome>> + Send;
    fn set_message_id(
        &self,
        activity_id: &str,
        message_id: &str,
    ) -> impl Future<Output = Result<()>> + Send;
    fn unpublished_activity_ids(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
    fn delete_expired_activities(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<usize>> + Send;
    fn upsert_leader(&self, leader: &Leader) -> impl Future<Output = Result<()>> + Send;
    fn get_leader(&self, leader_id: &str) -> impl Future<Output = Result<Option<Leader>>> + Send;
    fn upsert_place(&self, place: &Place) -> impl Future<Output = Result<()>> + Send;
    fn get_place(&self, place_id: &str) -> impl Future<Output = Result<Option<Place>>> + Send;
    fn get_bookkeeping(&self) -> impl Future<Output = Result<Bookkeeping>> + Send;
    fn record_stage_status(
        &self,
        stage: Stage,
        status: &StageStatus,
        success_time: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<()>> + Send;
    fn processing_enabled(&self) -> impl Future<Output = bool> + Send;
}

/// Cloud Tasks seam.
pub trait Dispatcher {
    fn enqueue_search(&self, task: SearchTask) -> impl Future<Output = Result<String>> + Send;
    fn enqueue_scrape(&self, task: ScrapeTask) -> impl Future<Output = Result<String>> + Send;
    fn enqueue_publish(&self, task: PublishTask) -> impl Future<Output = Result<String>> + Send;
}

/// Discord seam. Returns the external message ID.
pub trait Announcer {
    fn announce(&self, content: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Source-site HTTP seam.
pub trait PageSource {
    fn fetch_search_page(
        &self,
        start_index: u32,
        activity_type: &str,
    ) -> impl Future<Output = Result<String>> + Send;
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// How a stage invocation ended.
///
/// `Error` maps to HTTP 500 so the queue retries; `Deferred` maps to 429
/// so the queue backs off; everything else completes the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Skipped,
    Partial,
    Deferred,
    Error,
}

#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub status: OutcomeStatus,
    pub listings_found: usize,
    pub already_cached: usize,
    pub scrapes_enqueued: usize,
    /// Listings that could not be checked against the cache (bad URL or
    /// lookup error), kept apart from enqueue failures so a partial
    /// report names which side failed.
    pub lookup_failures: usize,
    pub enqueue_failures: usize,
    pub has_next_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchReport {
    fn empty(status: OutcomeStatus) -> Self {
        Self {
            status,
            listings_found: 0,
            already_cached: 0,
            scrapes_enqueued: 0,
            lookup_failures: 0,
            enqueue_failures: 0,
            has_next_page: false,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::empty(OutcomeStatus::Error)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScrapeReport {
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
    pub publish_enqueued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeReport {
    fn outcome(status: OutcomeStatus, activity_id: &str) -> Self {
        Self {
            status,
            activity_id: Some(activity_id.to_string()),
            publish_enqueued: false,
            error: None,
        }
    }

    fn failed(activity_id: &str, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::outcome(OutcomeStatus::Error, activity_id)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PublishReport {
    pub status: OutcomeStatus,
    pub activity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PublishReport {
    fn outcome(status: OutcomeStatus, activity_id: &str) -> Self {
        Self {
            status,
            activity_id: activity_id.to_string(),
            message_id: None,
            error: None,
        }
    }

    fn failed(activity_id: &str, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::outcome(OutcomeStatus::Error, activity_id)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatchupReport {
    pub status: OutcomeStatus,
    pub unpublished: usize,
    pub enqueued: usize,
    pub enqueue_failures: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RetentionReport {
    pub status: OutcomeStatus,
    pub deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Write one stage's bookkeeping slot, logging rather than failing:
/// a broken status record must not turn a finished stage into a retry.
async fn record<C: Cache>(
    cache: &C,
    stage: Stage,
    status: StageStatus,
    success_time: Option<DateTime<Utc>>,
) {
    if let Err(e) = cache.record_stage_status(stage, &status, success_time).await {
        tracing::error!(error = %e, stage = %stage.bookkeeping_slot(), "Bookkeeping write failed");
    }
}

/// Resolve a listing href against the source base URL.
fn resolve_listing_url(base_url: &str, href: &str) -> Option<String> {
    let base = url::Url::parse(base_url).ok()?;
    base.join(href).ok().map(String::from)
}

/// Search stage: scan one page of search results, enqueue a scrape for
/// every listing not already cached, and continue to the next page while
/// the site advertises one.
pub async fn run_search<C, D, S>(
    config: &Config,
    cache: &C,
    dispatcher: &D,
    source: &S,
    task: SearchTask,
) -> SearchReport
where
    C: Cache,
    D: Dispatcher,
    S: PageSource,
{
    if !cache.processing_enabled().await {
        tracing::info!("Processing disabled, skipping search");
        record(cache, Stage::Search, StageStatus::Green, None).await;
        return SearchReport::empty(OutcomeStatus::Skipped);
    }

    let activity_type = task
        .activity_type
        .unwrap_or_else(|| config.default_activity_type.clone());

    let html = match source
        .fetch_search_page(task.start_index, &activity_type)
        .await
    {
        Ok(html) => html,
        Err(crate::error::AppError::RateLimited) => {
            record(cache, Stage::Search, StageStatus::Yellow, None).await;
            return SearchReport::empty(OutcomeStatus::Deferred);
        }
        Err(e) => {
            record(cache, Stage::Search, StageStatus::Red(e.to_string()), None).await;
            return SearchReport::failed(e.to_string());
        }
    };

    let page = extract::search::extract_listing_links(&html);
    let mut report = SearchReport::empty(OutcomeStatus::Success);
    report.listings_found = page.listing_urls.len();
    report.has_next_page = page.has_next_page();

    for href in &page.listing_urls {
        let Some(activity_url) = resolve_listing_url(&config.source_base_url, href) else {
            tracing::warn!(href = %href, "Skipping unparseable listing URL");
            report.lookup_failures += 1;
            continue;
        };

        let activity_id = activity::document_id_for(&activity_url);

        match cache.activity_exists(&activity_id).await {
            Ok(true) => {
                report.already_cached += 1;
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(activity_id = %activity_id, error = %e, "Cache lookup failed");
                report.lookup_failures += 1;
                continue;
            }
        }

        match dispatcher
            .enqueue_scrape(ScrapeTask {
                activity_url: activity_url.clone(),
            })
            .await
        {
            Ok(_) => report.scrapes_enqueued += 1,
            Err(e) => {
                tracing::warn!(activity_url = %activity_url, error = %e, "Scrape enqueue failed");
                report.enqueue_failures += 1;
            }
        }
    }

    if page.has_next_page() {
        let next = SearchTask {
            start_index: task.start_index + SEARCH_PAGE_SIZE,
            activity_type: Some(activity_type),
        };
        if let Err(e) = dispatcher.enqueue_search(next).await {
            tracing::warn!(error = %e, "Next-page enqueue failed");
            report.enqueue_failures += 1;
        }
    }

    if report.lookup_failures > 0 || report.enqueue_failures > 0 {
        report.status = OutcomeStatus::Partial;
    }

    record(cache, Stage::Search, StageStatus::Green, Some(Utc::now())).await;

    tracing::info!(
        start_index = task.start_index,
        listings = report.listings_found,
        enqueued = report.scrapes_enqueued,
        cached = report.already_cached,
        lookup_failures = report.lookup_failures,
        enqueue_failures = report.enqueue_failures,
        "Search page processed"
    );

    report
}

/// Scrape stage: fetch one detail page, extract it, and cache the record.
///
/// A cache hit (before or during the create) is the idempotent skip path:
/// the invocation completes without writing or emitting anything.
pub async fn run_scrape<C, D, S>(
    cache: &C,
    dispatcher: &D,
    source: &S,
    task: ScrapeTask,
) -> ScrapeReport
where
    C: Cache,
    D: Dispatcher,
    S: PageSource,
{
    let activity_id = activity::document_id_for(&task.activity_url);

    if !cache.processing_enabled().await {
        tracing::info!(activity_id = %activity_id, "Processing disabled, skipping scrape");
        record(cache, Stage::Scrape, StageStatus::Green, None).await;
        return ScrapeReport::outcome(OutcomeStatus::Skipped, &activity_id);
    }

    match cache.activity_exists(&activity_id).await {
        Ok(true) => {
            tracing::debug!(activity_id = %activity_id, "Already cached, skipping scrape");
            record(cache, Stage::Scrape, StageStatus::Green, None).await;
            return ScrapeReport::outcome(OutcomeStatus::Skipped, &activity_id);
        }
        Ok(false) => {}
        Err(e) => {
            record(cache, Stage::Scrape, StageStatus::Red(e.to_string()), None).await;
            return ScrapeReport::failed(&activity_id, e.to_string());
        }
    }

    let html = match source.fetch_page(&task.activity_url).await {
        Ok(html) => html,
        Err(crate::error::AppError::RateLimited) => {
            record(cache, Stage::Scrape, StageStatus::Yellow, None).await;
            return ScrapeReport::outcome(OutcomeStatus::Deferred, &activity_id);
        }
        Err(e) => {
            record(cache, Stage::Scrape, StageStatus::Red(e.to_string()), None).await;
            return ScrapeReport::failed(&activity_id, e.to_string());
        }
    };

    let draft = match extract::detail::extract_detail_record(&html, &task.activity_url) {
        Ok(draft) => draft,
        Err(e) => {
            record(cache, Stage::Scrape, StageStatus::Red(e.to_string()), None).await;
            return ScrapeReport::failed(&activity_id, e.to_string());
        }
    };

    // Leader and place upserts are idempotent, so a retry after a failure
    // further down re-writes them harmlessly.
    if let Err(e) = cache.upsert_leader(&draft.leader).await {
        record(cache, Stage::Scrape, StageStatus::Red(e.to_string()), None).await;
        return ScrapeReport::failed(&activity_id, e.to_string());
    }
    if let Err(e) = cache.upsert_place(&draft.place).await {
        record(cache, Stage::Scrape, StageStatus::Red(e.to_string()), None).await;
        return ScrapeReport::failed(&activity_id, e.to_string());
    }

    let record_to_cache = Activity::from_draft(draft);
    match cache.create_activity(&record_to_cache).await {
        Ok(CreateOutcome::Created) => {}
        Ok(CreateOutcome::AlreadyExists) => {
            // Someone else scraped it first; their invocation owns the
            // publish enqueue.
            tracing::debug!(activity_id = %activity_id, "Lost create race, skipping");
            record(cache, Stage::Scrape, StageStatus::Green, None).await;
            return ScrapeReport::outcome(OutcomeStatus::Skipped, &activity_id);
        }
        Err(e) => {
            record(cache, Stage::Scrape, StageStatus::Red(e.to_string()), None).await;
            return ScrapeReport::failed(&activity_id, e.to_string());
        }
    }

    let mut report = ScrapeReport::outcome(OutcomeStatus::Success, &activity_id);

    // A failed publish enqueue is not fatal: the record is cached and the
    // catchup stage will find it unpublished.
    match dispatcher
        .enqueue_publish(PublishTask {
            activity_id: activity_id.clone(),
        })
        .await
    {
        Ok(_) => report.publish_enqueued = true,
        Err(e) => {
            tracing::warn!(activity_id = %activity_id, error = %e, "Publish enqueue failed");
            report.status = OutcomeStatus::Partial;
        }
    }

    record(cache, Stage::Scrape, StageStatus::Green, Some(Utc::now())).await;

    tracing::info!(activity_id = %activity_id, "Activity cached");

    report
}

/// Publish stage: announce one cached activity exactly once.
///
/// Runs even while processing is paused, so records already in the cache
/// still get announced. An already-set message ID is the idempotent skip.
pub async fn run_publish<C, A>(cache: &C, announcer: &A, task: PublishTask) -> PublishReport
where
    C: Cache,
    A: Announcer,
{
    let activity_id = task.activity_id;

    let activity = match cache.get_activity(&activity_id).await {
        Ok(Some(activity)) => activity,
        Ok(None) => {
            let msg = format!("activity {} not in cache", activity_id);
            record(cache, Stage::Publish, StageStatus::Red(msg.clone()), None).await;
            return PublishReport::failed(&activity_id, msg);
        }
        Err(e) => {
            record(cache, Stage::Publish, StageStatus::Red(e.to_string()), None).await;
            return PublishReport::failed(&activity_id, e.to_string());
        }
    };

    if activity.message_id.is_some() {
        tracing::debug!(activity_id = %activity_id, "Already announced, skipping");
        record(cache, Stage::Publish, StageStatus::Green, None).await;
        return PublishReport::outcome(OutcomeStatus::Skipped, &activity_id);
    }

    let leader = match cache.get_leader(&activity.leader_id).await {
        Ok(Some(leader)) => leader,
        Ok(None) => {
            let msg = format!("leader {} not in cache", activity.leader_id);
            record(cache, Stage::Publish, StageStatus::Red(msg.clone()), None).await;
            return PublishReport::failed(&activity_id, msg);
        }
        Err(e) => {
            record(cache, Stage::Publish, StageStatus::Red(e.to_string()), None).await;
            return PublishReport::failed(&activity_id, e.to_string());
        }
    };

    let place = match cache.get_place(&activity.place_id).await {
        Ok(Some(place)) => place,
        Ok(None) => {
            let msg = format!("place {} not in cache", activity.place_id);
            record(cache, Stage::Publish, StageStatus::Red(msg.clone()), None).await;
            return PublishReport::failed(&activity_id, msg);
        }
        Err(e) => {
            record(cache, Stage::Publish, StageStatus::Red(e.to_string()), None).await;
            return PublishReport::failed(&activity_id, e.to_string());
        }
    };

    let content = discord::format_message(&activity, &leader, &place);

    let message_id = match announcer.announce(&content).await {
        Ok(id) => id,
        Err(crate::error::AppError::RateLimited) => {
            record(cache, Stage::Publish, StageStatus::Yellow, None).await;
            return PublishReport::outcome(OutcomeStatus::Deferred, &activity_id);
        }
        Err(e) => {
            record(cache, Stage::Publish, StageStatus::Red(e.to_string()), None).await;
            return PublishReport::failed(&activity_id, e.to_string());
        }
    };

    if let Err(e) = cache.set_message_id(&activity_id, &message_id).await {
        // Sent but not recorded: the retry window can duplicate the
        // announcement, which the design accepts over losing it.
        record(cache, Stage::Publish, StageStatus::Red(e.to_string()), None).await;
        return PublishReport::failed(&activity_id, e.to_string());
    }

    record(cache, Stage::Publish, StageStatus::Green, Some(Utc::now())).await;

    tracing::info!(activity_id = %activity_id, message_id = %message_id, "Activity announced");

    PublishReport {
        message_id: Some(message_id),
        ..PublishReport::outcome(OutcomeStatus::Success, &activity_id)
    }
}

/// Catchup stage: re-enqueue a publish for every cached-but-unannounced
/// activity. Safe to run any time; publish invocations it produces for
/// already-announced records skip themselves.
pub async fn run_catchup<C, D>(cache: &C, dispatcher: &D) -> CatchupReport
where
    C: Cache,
    D: Dispatcher,
{
    let ids = match cache.unpublished_activity_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            record(cache, Stage::Catchup, StageStatus::Red(e.to_string()), None).await;
            return CatchupReport {
                status: OutcomeStatus::Error,
                unpublished: 0,
                enqueued: 0,
                enqueue_failures: 0,
                error: Some(e.to_string()),
            };
        }
    };

    let unpublished = ids.len();
    let enqueued = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);

    stream::iter(ids)
        .for_each_concurrent(MAX_CONCURRENT_ENQUEUES, |activity_id| {
            let enqueued = &enqueued;
            let failures = &failures;
            async move {
                match dispatcher
                    .enqueue_publish(PublishTask {
                        activity_id: activity_id.clone(),
                    })
                    .await
                {
                    Ok(_) => {
                        enqueued.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        tracing::warn!(activity_id = %activity_id, error = %e, "Catchup enqueue failed");
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
        .await;

    let mut report = CatchupReport {
        status: OutcomeStatus::Success,
        unpublished,
        enqueued: enqueued.into_inner(),
        enqueue_failures: failures.into_inner(),
        error: None,
    };

    if report.enqueue_failures > 0 {
        report.status = OutcomeStatus::Partial;
    }

    record(cache, Stage::Catchup, StageStatus::Green, None).await;

    tracing::info!(
        unpublished = report.unpublished,
        enqueued = report.enqueued,
        failures = report.enqueue_failures,
        "Catchup sweep complete"
    );

    report
}

/// Retention sweep: drop cache entries whose activity date fell out of the
/// retention window. Keeps the unpublished scan bounded; no bookkeeping
/// slot of its own.
pub async fn run_retention<C: Cache>(config: &Config, cache: &C) -> RetentionReport {
    let cutoff = Utc::now() - Duration::days(config.retention_days);

    match cache.delete_expired_activities(cutoff).await {
        Ok(deleted) => RetentionReport {
            status: OutcomeStatus::Success,
            deleted,
            error: None,
        },
        Err(e) => RetentionReport {
            status: OutcomeStatus::Error,
            deleted: 0,
            error: Some(e.to_string()),
        },
    }
}

// ─── Production seam implementations ─────────────────────────────

impl Cache for crate::db::FirestoreDb {
    async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>> {
        crate::db::FirestoreDb::get_activity(self, activity_id).await
    }

    async fn activity_exists(&self, activity_id: &str) -> Result<bool> {
        crate::db::FirestoreDb::activity_exists(self, activity_id).await
    }

    async fn create_activity(&self, record: &Activity) -> Result<CreateOutcome> {
        crate::db::FirestoreDb::create_activity(self, record).await
    }

    async fn set_message_id(&self, activity_id: &str, message_id: &str) -> Result<()> {
        crate::db::FirestoreDb::set_message_id(self, activity_id, message_id).await
    }

    async fn unpublished_activity_ids(&self) -> Result<Vec<String>> {
        crate::db::FirestoreDb::unpublished_activity_ids(self).await
    }

    async fn delete_expired_activities(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        crate::db::FirestoreDb::delete_expired_activities(self, cutoff).await
    }

    async fn upsert_leader(&self, leader: &Leader) -> Result<()> {
        crate::db::FirestoreDb::upsert_leader(self, leader).await
    }

    async fn get_leader(&self, leader_id: &str) -> Result<Option<Leader>> {
        crate::db::FirestoreDb::get_leader(self, leader_id).await
    }

    async fn upsert_place(&self, place: &Place) -> Result<()> {
        crate::db::FirestoreDb::upsert_place(self, place).await
    }

    async fn get_place(&self, place_id: &str) -> Result<Option<Place>> {
        crate::db::FirestoreDb::get_place(self, place_id).await
    }

    async fn get_bookkeeping(&self) -> Result<Bookkeeping> {
        crate::db::FirestoreDb::get_bookkeeping(self).await
    }

    async fn record_stage_status(
        &self,
        stage: Stage,
        status: &StageStatus,
        success_time: Option<DateTime<Utc>>,
    ) -> Result<()> {
        crate::db::FirestoreDb::record_stage_status(self, stage, status, success_time).await
    }

    async fn processing_enabled(&self) -> bool {
        crate::db::FirestoreDb::processing_enabled(self).await
    }
}

impl Dispatcher for crate::services::TasksService {
    async fn enqueue_search(&self, task: SearchTask) -> Result<String> {
        crate::services::TasksService::enqueue_search(self, task).await
    }

    async fn enqueue_scrape(&self, task: ScrapeTask) -> Result<String> {
        crate::services::TasksService::enqueue_scrape(self, task).await
    }

    async fn enqueue_publish(&self, task: PublishTask) -> Result<String> {
        crate::services::TasksService::enqueue_publish(self, task).await
    }
}

impl Announcer for crate::services::DiscordClient {
    async fn announce(&self, content: &str) -> Result<String> {
        crate::services::DiscordClient::send(self, content).await
    }
}

impl PageSource for crate::services::SourceClient {
    async fn fetch_search_page(&self, start_index: u32, activity_type: &str) -> Result<String> {
        crate::services::SourceClient::fetch_search_page(self, start_index, activity_type).await
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        crate::services::SourceClient::fetch_page(self, url).await
    }
}
