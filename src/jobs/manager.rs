// =============================================================================
// Job lifecycle manager — C6
// =============================================================================
//
// Grounded on scheduler-service/job_manager.py: owns the `screening_jobs`
// and `screening_results` collections, performs atomic progress emission
// (`$set` + `$push` + `$slice:-100`), and fans a live copy of every
// progress event out to SSE subscribers via a per-job broadcast channel.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::models::{is_legacy_job_id, mint_job_id, JobRecord, JobStatus, ProgressEvent, ScreeningResultRecord, PROGRESS_LOG_CAP};

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;

pub struct JobManager {
    jobs: Collection<JobRecord>,
    results: Collection<ScreeningResultRecord>,
    subscribers: RwLock<HashMap<String, broadcast::Sender<ProgressEvent>>>,
}

impl JobManager {
    pub fn new(db: &Database) -> Arc<Self> {
        Arc::new(JobManager {
            jobs: db.collection("screening_jobs"),
            results: db.collection("screening_results"),
            subscribers: RwLock::new(HashMap::new()),
        })
    }

    /// Accepts either a legacy `YYYYMMDD-HHMMSS-shortid` job-id or a UUIDv4
    /// on lookup (§9); new jobs always mint a UUIDv4.
    pub fn is_recognized_job_id(id: &str) -> bool {
        uuid::Uuid::parse_str(id).is_ok() || is_legacy_job_id(id)
    }

    pub async fn create(&self, job_type: &str, options: serde_json::Value, trigger_source: Option<String>) -> anyhow::Result<JobRecord> {
        let mut job = JobRecord::new(mint_job_id(), job_type, options);
        job.trigger_source = trigger_source;
        self.jobs.insert_one(&job).await?;
        info!(job_id = %job.job_id, status = %job.status, "job created");
        Ok(job)
    }

    pub async fn start(&self, job_id: &str) -> anyhow::Result<()> {
        let now = Utc::now();
        self.jobs
            .update_one(
                doc! { "job_id": job_id },
                doc! { "$set": { "status": "RUNNING", "started_at": bson::DateTime::from_chrono(now) } },
            )
            .await?;
        info!(job_id = %job_id, status = "RUNNING", "job started");
        Ok(())
    }

    /// Atomic progress emission: a single update writes the snapshot fields
    /// and appends one capped log entry. Failures here are logged and
    /// swallowed (§7) — they must never abort the pipeline.
    pub async fn emit_progress(
        &self,
        job_id: &str,
        job_type: &str,
        status: JobStatus,
        step_current: u32,
        step_total: u32,
        step_name: &str,
        message: &str,
    ) {
        let event = ProgressEvent {
            job_id: job_id.to_string(),
            job_type: job_type.to_string(),
            status,
            step_current,
            step_total,
            step_name: step_name.to_string(),
            message: message.to_string(),
            updated_at: Utc::now(),
        };

        let event_bson = match bson::to_bson(&event) {
            Ok(v) => v,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "failed to serialize progress event, skipping persistence");
                self.broadcast(job_id, event);
                return;
            }
        };

        let update = doc! {
            "$set": { "status": status.to_string(), "progress_snapshot": &event_bson },
            "$push": { "progress_log": { "$each": [&event_bson], "$slice": -(PROGRESS_LOG_CAP as i32) } },
        };

        if let Err(e) = self.jobs.update_one(doc! { "job_id": job_id }, update).await {
            warn!(job_id = %job_id, error = %e, "progress emission failed, continuing pipeline");
        }

        self.broadcast(job_id, event);
    }

    fn broadcast(&self, job_id: &str, event: ProgressEvent) {
        let subs = self.subscribers.read();
        if let Some(tx) = subs.get(job_id) {
            let _ = tx.send(event);
        }
    }

    pub fn subscribe(&self, job_id: &str) -> broadcast::Receiver<ProgressEvent> {
        let mut subs = self.subscribers.write();
        let tx = subs
            .entry(job_id.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_CHANNEL_CAPACITY).0);
        info!(job_id = %job_id, "SSE subscriber connected");
        tx.subscribe()
    }

    pub fn unsubscribe_if_idle(&self, job_id: &str) {
        let mut subs = self.subscribers.write();
        if let Some(tx) = subs.get(job_id) {
            if tx.receiver_count() == 0 {
                subs.remove(job_id);
            }
        }
        info!(job_id = %job_id, "SSE subscriber disconnected");
    }

    /// Completion: sets SUCCESS + `completed_at`, persists the lightweight
    /// summary on the job document, and bulk-inserts one detail record per
    /// candidate. A detail-insert failure does not fail the job — the
    /// summary is authoritative (§4.6).
    pub async fn complete_success(&self, job_id: &str, candidate_payloads: Vec<serde_json::Value>, result_summary: serde_json::Value) -> anyhow::Result<()> {
        let now = Utc::now();
        let tickers: Vec<String> = candidate_payloads
            .iter()
            .filter_map(|p| p.get("ticker").and_then(|t| t.as_str()).map(str::to_string))
            .collect();

        let results = bson::to_bson(&tickers)?;
        self.jobs
            .update_one(
                doc! { "job_id": job_id },
                doc! {
                    "$set": {
                        "status": "SUCCESS",
                        "completed_at": bson::DateTime::from_chrono(now),
                        "results": results,
                        "result_summary": bson::to_bson(&result_summary)?,
                    }
                },
            )
            .await?;

        if !candidate_payloads.is_empty() {
            let processed_at = now;
            let docs: Vec<ScreeningResultRecord> = candidate_payloads
                .into_iter()
                .filter_map(|payload| {
                    let ticker = payload.get("ticker")?.as_str()?.to_string();
                    Some(ScreeningResultRecord { job_id: job_id.to_string(), ticker, processed_at, payload })
                })
                .collect();

            if let Err(e) = self.results.insert_many(&docs).await {
                error!(job_id = %job_id, error = %e, "fan-out persistence of candidate details failed; job summary remains authoritative");
            }
        }

        info!(job_id = %job_id, status = "SUCCESS", "job completed");
        Ok(())
    }

    pub async fn fail(&self, job_id: &str, error_step: &str, error_message: &str) -> anyhow::Result<()> {
        let now = Utc::now();
        self.jobs
            .update_one(
                doc! { "job_id": job_id },
                doc! {
                    "$set": {
                        "status": "FAILED",
                        "completed_at": bson::DateTime::from_chrono(now),
                        "error_step": error_step,
                        "error_message": error_message,
                    }
                },
            )
            .await?;
        error!(job_id = %job_id, status = "FAILED", error_step = %error_step, "job failed");
        Ok(())
    }

    pub async fn get(&self, job_id: &str) -> anyhow::Result<Option<JobRecord>> {
        Ok(self.jobs.find_one(doc! { "job_id": job_id }).await?)
    }

    pub async fn history(&self, limit: i64, skip: u64) -> anyhow::Result<Vec<JobRecord>> {
        use futures_util::TryStreamExt;
        let opts = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .skip(skip)
            .build();
        let mut cursor = self.jobs.find(doc! {}).with_options(opts).await?;
        let mut out = Vec::new();
        while let Some(job) = cursor.try_next().await? {
            out.push(job);
        }
        Ok(out)
    }
}
