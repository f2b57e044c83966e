//! Voice-over repository.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, from_json, parse_timestamp, to_json, Database, DatabaseError};
use crate::jobs::JobStatus;
use crate::models::VoiceOver;

struct VoiceOverRow {
    id: String,
    script_id: String,
    voice_id: String,
    settings: String,
    status: String,
    audio_ref: Option<String>,
    total_duration: Option<f64>,
    created_at: String,
    completed_at: Option<String>,
}

impl VoiceOverRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            script_id: row.get("script_id")?,
            voice_id: row.get("voice_id")?,
            settings: row.get("settings")?,
            status: row.get("status")?,
            audio_ref: row.get("audio_ref")?,
            total_duration: row.get("total_duration")?,
            created_at: row.get("created_at")?,
            completed_at: row.get("completed_at")?,
        })
    }

    fn into_voice_over(self) -> Result<VoiceOver, DatabaseError> {
        let status = JobStatus::parse(&self.status).ok_or_else(|| DatabaseError::InvalidValue {
            column: "status",
            value: self.status.clone(),
        })?;
        Ok(VoiceOver {
            settings: from_json("settings", &self.settings)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            completed_at: self
                .completed_at
                .as_deref()
                .map(|s| parse_timestamp("completed_at", s))
                .transpose()?,
            id: self.id,
            script_id: self.script_id,
            voice_id: self.voice_id,
            status,
            audio_ref: self.audio_ref,
            total_duration: self.total_duration,
        })
    }
}

pub fn insert(db: &Database, voice_over: &VoiceOver) -> Result<(), DatabaseError> {
    let settings = to_json("settings", &voice_over.settings)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO voice_overs (id, script_id, voice_id, settings, status, audio_ref,
             total_duration, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                voice_over.id,
                voice_over.script_id,
                voice_over.voice_id,
                settings,
                voice_over.status.as_str(),
                voice_over.audio_ref,
                voice_over.total_duration,
                format_timestamp(&voice_over.created_at),
                voice_over.completed_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(())
    })
}

/// Records the outcome of synthesis.
pub fn update_result(db: &Database, voice_over: &VoiceOver) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE voice_overs SET status = ?2, audio_ref = ?3, total_duration = ?4,
             completed_at = ?5 WHERE id = ?1",
            params![
                voice_over.id,
                voice_over.status.as_str(),
                voice_over.audio_ref,
                voice_over.total_duration,
                voice_over.completed_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<VoiceOver>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM voice_overs WHERE id = ?1",
                params![id],
                VoiceOverRow::from_row,
            )
            .optional()?)
    })?;
    row.map(VoiceOverRow::into_voice_over).transpose()
}

/// Voice-overs for a script, most recent first.
pub fn list_by_script(db: &Database, script_id: &str) -> Result<Vec<VoiceOver>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM voice_overs WHERE script_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(params![script_id], VoiceOverRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(VoiceOverRow::into_voice_over).collect()
}
