// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activities (create-if-absent, message-id bookkeeping, retention)
//! - Leaders and Places (idempotent upserts)
//! - Bookkeeping (per-stage health record)
//! - System config (processing-enabled flag)

use crate::db::{collections, BOOKKEEPING_DOC, SYSTEM_CONFIG_DOC};
use crate::error::AppError;
use crate::models::{Activity, Bookkeeping, Leader, Place, Stage, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a conditional activity create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The key was already present; nothing was written. This is the
    /// defined idempotent skip path, not an error.
    AlreadyExists,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// The `system/config` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SystemConfig {
    processing_enabled: bool,
    updated_at: Option<String>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Get an activity by document ID.
    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check whether an activity document exists.
    pub async fn activity_exists(&self, activity_id: &str) -> Result<bool, AppError> {
        Ok(self.get_activity(activity_id).await?.is_some())
    }

    /// Create an activity, conditioned on non-existence.
    ///
    /// Creating over an existing key never overwrites: it reports
    /// `AlreadyExists` so the scrape stage can take its idempotent skip
    /// path. Losing the create race is harmless for the same reason.
    pub async fn create_activity(&self, activity: &Activity) -> Result<CreateOutcome, AppError> {
        let doc_id = activity.document_id();

        if self.activity_exists(&doc_id).await? {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let result: Result<Activity, _> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::ACTIVITIES)
            .document_id(&doc_id)
            .object(activity)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            // Lost the race between the exists check and the insert.
            Err(firestore::errors::FirestoreError::DataConflictError(_)) => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Record the external message ID after a successful publication.
    ///
    /// Fails if the activity does not exist, and refuses to change an
    /// already-set message ID (it is written exactly once).
    pub async fn set_message_id(
        &self,
        activity_id: &str,
        message_id: &str,
    ) -> Result<(), AppError> {
        let mut activity = self
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("activity {}", activity_id)))?;

        if let Some(existing) = &activity.message_id {
            if existing != message_id {
                return Err(AppError::CacheConflict(format!(
                    "activity {} already published as message {}",
                    activity_id, existing
                )));
            }
            return Ok(());
        }

        activity.message_id = Some(message_id.to_string());

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(activity_id)
            .object(&activity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Document IDs of activities that have not been announced yet.
    ///
    /// Scans the collection and filters client-side: Firestore cannot index
    /// "field absent", and the retention sweep keeps this collection small.
    pub async fn unpublished_activity_ids(&self) -> Result<Vec<String>, AppError> {
        let activities: Vec<Activity> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(activities
            .into_iter()
            .filter(|a| a.message_id.is_none())
            .map(|a| a.document_id())
            .collect())
    }

    /// Delete activities whose date is before the cutoff (retention sweep).
    ///
    /// Dates are stored as RFC 3339 UTC strings, so string order is
    /// chronological order and a range filter works directly.
    pub async fn delete_expired_activities(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let cutoff = cutoff.to_rfc3339();

        let expired: Vec<Activity> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(|q| q.field("activity_date").less_than(cutoff.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = expired.len();
        for activity in &expired {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::ACTIVITIES)
                .document_id(activity.document_id())
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tracing::info!(count, "Deleted expired activities");
        Ok(count)
    }

    // ─── Leader / Place Operations ───────────────────────────────

    /// Create or update a leader (unconditionally idempotent).
    pub async fn upsert_leader(&self, leader: &Leader) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::LEADERS)
            .document_id(leader.document_id())
            .object(leader)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a leader by document ID.
    pub async fn get_leader(&self, leader_id: &str) -> Result<Option<Leader>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LEADERS)
            .obj()
            .one(leader_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a place (unconditionally idempotent).
    pub async fn upsert_place(&self, place: &Place) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PLACES)
            .document_id(place.document_id())
            .object(place)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get a place by document ID.
    pub async fn get_place(&self, place_id: &str) -> Result<Option<Place>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PLACES)
            .obj()
            .one(place_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Bookkeeping Operations ──────────────────────────────────

    /// Get the bookkeeping status record (empty defaults when absent).
    pub async fn get_bookkeeping(&self) -> Result<Bookkeeping, AppError> {
        let status: Option<Bookkeeping> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::BOOKKEEPING)
            .obj()
            .one(BOOKKEEPING_DOC)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(status.unwrap_or_default())
    }

    /// Write one stage's status into the bookkeeping record.
    ///
    /// `success_time` is recorded only when the stage actually performed
    /// its work (not on idempotent skips).
    ///
    /// The record is shared by every stage and the queues run handlers
    /// concurrently, so the write is field-masked to the stage's own
    /// slot. Rewriting the whole document would let one stage revert
    /// another's status with a stale snapshot.
    pub async fn record_stage_status(
        &self,
        stage: Stage,
        status: &StageStatus,
        success_time: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let status = Some(status.to_string());
        let success_time = success_time.map(|t| t.to_rfc3339());
        let record_success = success_time.is_some();

        let mut bookkeeping = Bookkeeping::default();
        let fields = match stage.bookkeeping_slot() {
            Stage::Search => {
                bookkeeping.search_status = status;
                bookkeeping.last_search_success = success_time;
                if record_success {
                    firestore::paths!(Bookkeeping::{search_status, last_search_success})
                } else {
                    firestore::paths!(Bookkeeping::{search_status})
                }
            }
            Stage::Scrape => {
                bookkeeping.scrape_status = status;
                bookkeeping.last_scrape_success = success_time;
                if record_success {
                    firestore::paths!(Bookkeeping::{scrape_status, last_scrape_success})
                } else {
                    firestore::paths!(Bookkeeping::{scrape_status})
                }
            }
            Stage::Publish | Stage::Catchup => {
                bookkeeping.publish_status = status;
                bookkeeping.last_publish_success = success_time;
                if record_success {
                    firestore::paths!(Bookkeeping::{publish_status, last_publish_success})
                } else {
                    firestore::paths!(Bookkeeping::{publish_status})
                }
            }
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields)
            .in_col(collections::BOOKKEEPING)
            .document_id(BOOKKEEPING_DOC)
            .object(&bookkeeping)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── System Config Operations ────────────────────────────────

    /// Whether the pipeline should process new work.
    ///
    /// Fails open: a missing document or a read error counts as enabled,
    /// so a broken config flag can never silently halt discovery.
    pub async fn processing_enabled(&self) -> bool {
        let result: Result<Option<SystemConfig>, _> = match self.get_client() {
            Ok(client) => {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::SYSTEM)
                    .obj()
                    .one(SYSTEM_CONFIG_DOC)
                    .await
            }
            Err(e) => {
                tracing::error!(error = %e, "Config flag check failed, defaulting to enabled");
                return true;
            }
        };

        match result {
            Ok(Some(config)) => config.processing_enabled,
            Ok(None) => true,
            Err(e) => {
                tracing::error!(error = %e, "Config flag check failed, defaulting to enabled");
                true
            }
        }
    }

    /// Set the processing-enabled flag (pause/resume).
    pub async fn set_processing_enabled(&self, enabled: bool) -> Result<(), AppError> {
        let config = SystemConfig {
            processing_enabled: enabled,
            updated_at: Some(Utc::now().to_rfc3339()),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SYSTEM)
            .document_id(SYSTEM_CONFIG_DOC)
            .object(&config)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::info!(enabled, "Processing flag updated");
        Ok(())
    }
}
