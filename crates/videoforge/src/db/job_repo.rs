//! Job repository: row-level access to the `generation_jobs` table.
//!
//! State transitions are compare-and-set updates keyed on the expected
//! current status, so a transition that lost a race touches zero rows.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub subject_id: String,
    pub stage: String,
    pub status: String,
    pub request: String,
    pub message: Option<String>,
    pub artifact_ref: Option<String>,
    pub created_at: String,
    pub claimed_at: Option<String>,
    pub completed_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            subject_id: row.get("subject_id")?,
            stage: row.get("stage")?,
            status: row.get("status")?,
            request: row.get("request")?,
            message: row.get("message")?,
            artifact_ref: row.get("artifact_ref")?,
            created_at: row.get("created_at")?,
            claimed_at: row.get("claimed_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Column updates applied by a status transition.
#[derive(Debug, Default, Clone)]
pub struct Transition<'a> {
    pub message: Option<&'a str>,
    pub artifact_ref: Option<&'a str>,
    pub claimed_at: Option<&'a str>,
    pub completed_at: Option<&'a str>,
}

/// Inserts a new job row. Fails with a constraint violation when an
/// active job already exists for the same subject and stage.
pub fn insert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO generation_jobs (id, subject_id, stage, status, request, message,
             artifact_ref, created_at, claimed_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job.id,
                job.subject_id,
                job.stage,
                job.status,
                job.request,
                job.message,
                job.artifact_ref,
                job.created_at,
                job.claimed_at,
                job.completed_at,
            ],
        )?;
        Ok(())
    })
}

/// Moves a job from `from` to `to`. Returns false when no row matched,
/// either because the job does not exist or it is not in `from`.
pub fn transition(
    db: &Database,
    id: &str,
    from: &str,
    to: &str,
    changes: &Transition<'_>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE generation_jobs SET status = ?3,
                 message = COALESCE(?4, message),
                 artifact_ref = COALESCE(?5, artifact_ref),
                 claimed_at = COALESCE(?6, claimed_at),
                 completed_at = COALESCE(?7, completed_at)
             WHERE id = ?1 AND status = ?2",
            params![
                id,
                from,
                to,
                changes.message,
                changes.artifact_ref,
                changes.claimed_at,
                changes.completed_at,
            ],
        )?;
        Ok(updated == 1)
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM generation_jobs WHERE id = ?1",
                params![id],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Finds the active (pending or processing) job for a subject and stage.
pub fn find_active(
    db: &Database,
    subject_id: &str,
    stage: &str,
) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM generation_jobs
                 WHERE subject_id = ?1 AND stage = ?2 AND status IN ('pending', 'processing')",
                params![subject_id, stage],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists all jobs for a subject, most recent first.
pub fn list_by_subject(db: &Database, subject_id: &str) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM generation_jobs WHERE subject_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(params![subject_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists jobs with the given status created strictly before `cutoff`,
/// oldest first.
pub fn list_by_status_before(
    db: &Database,
    status: &str,
    cutoff: &str,
) -> Result<Vec<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM generation_jobs WHERE status = ?1 AND created_at < ?2
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![status, cutoff], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts jobs with the given status.
pub fn count_by_status(db: &Database, status: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM generation_jobs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
