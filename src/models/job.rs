// =============================================================================
// Job lifecycle model
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const PROGRESS_LOG_CAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

impl JobStatus {
    /// Transitions are monotone forward: PENDING < RUNNING < {SUCCESS, FAILED}.
    /// SUCCESS and FAILED are both terminal and incomparable to each other.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Success)
                | (Pending, Failed)
                | (Running, Success)
                | (Running, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

/// A single progress event, matching the canonical snake_case wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: String,
    pub job_type: String,
    pub status: JobStatus,
    pub step_current: u32,
    pub step_total: u32,
    pub step_name: String,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub job_type: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub options: serde_json::Value,
    /// Capped at `PROGRESS_LOG_CAP` tail entries, chronological.
    #[serde(default)]
    pub progress_log: Vec<ProgressEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_snapshot: Option<ProgressEvent>,
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(default)]
    pub result_summary: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_job_id: Option<String>,
}

impl JobRecord {
    pub fn new(job_id: String, job_type: impl Into<String>, options: serde_json::Value) -> Self {
        JobRecord {
            job_id,
            job_type: job_type.into(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            options,
            progress_log: Vec::new(),
            progress_snapshot: None,
            results: serde_json::Value::Null,
            result_summary: serde_json::Value::Null,
            error_message: None,
            error_step: None,
            trigger_source: None,
            parent_job_id: None,
        }
    }

    /// Append an event to the capped rolling log, keeping only the last
    /// `PROGRESS_LOG_CAP` entries, mirroring a Mongo `$push` + `$slice:-100`.
    pub fn push_progress(&mut self, event: ProgressEvent) {
        self.progress_log.push(event.clone());
        if self.progress_log.len() > PROGRESS_LOG_CAP {
            let overflow = self.progress_log.len() - PROGRESS_LOG_CAP;
            self.progress_log.drain(0..overflow);
        }
        self.progress_snapshot = Some(event);
    }
}

/// Legacy job-id format: `YYYYMMDD-HHMMSS-` followed by an 8-char
/// lowercase-alphanumeric short id. New jobs always mint UUIDv4; this
/// format is accepted on lookup only.
pub fn is_legacy_job_id(id: &str) -> bool {
    let parts: Vec<&str> = id.splitn(3, '-').collect();
    if parts.len() != 3 {
        return false;
    }
    let (date, time, shortid) = (parts[0], parts[1], parts[2]);
    date.len() == 8
        && date.chars().all(|c| c.is_ascii_digit())
        && time.len() == 6
        && time.chars().all(|c| c.is_ascii_digit())
        && shortid.len() == 8
        && shortid.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn mint_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One fan-out detail document per final candidate, written to the
/// `screening_results` collection alongside the lightweight summary kept on
/// the job document itself (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningResultRecord {
    pub job_id: String,
    pub ticker: String,
    pub processed_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_monotonicity() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Success));
        assert!(!JobStatus::Success.can_transition_to(JobStatus::Running));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Success));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Pending));
    }

    #[test]
    fn progress_log_stays_capped_at_100_tail_entries() {
        let mut job = JobRecord::new("job-1".into(), "SCREENING", serde_json::Value::Null);
        for i in 0..150u32 {
            job.push_progress(ProgressEvent {
                job_id: "job-1".into(),
                job_type: "SCREENING".into(),
                status: JobStatus::Running,
                step_current: i,
                step_total: 150,
                step_name: "trend".into(),
                message: format!("tick {i}"),
                updated_at: Utc::now(),
            });
        }
        assert_eq!(job.progress_log.len(), 100);
        assert_eq!(job.progress_log.first().unwrap().step_current, 50);
        assert_eq!(job.progress_log.last().unwrap().step_current, 149);
    }

    #[test]
    fn legacy_job_id_format_recognized() {
        assert!(is_legacy_job_id("20260118-120000-ab12cd34"));
        assert!(!is_legacy_job_id("not-a-legacy-id"));
        assert!(!uuid::Uuid::parse_str("20260118-120000-ab12cd34").is_ok());
    }

    #[test]
    fn uuidv4_minted_for_new_jobs() {
        let id = mint_job_id();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert!(!is_legacy_job_id(&id));
    }
}
