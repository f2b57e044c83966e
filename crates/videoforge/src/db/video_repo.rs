//! Final video repository.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, from_json, parse_timestamp, to_json, Database, DatabaseError};
use crate::jobs::JobStatus;
use crate::models::FinalVideo;

struct VideoRow {
    id: String,
    story_id: String,
    script_id: String,
    voice_over_id: String,
    title: String,
    description: String,
    bindings: String,
    duration: f64,
    resolution: String,
    file_size: i64,
    asset_ref: String,
    status: String,
    created_at: String,
}

impl VideoRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            story_id: row.get("story_id")?,
            script_id: row.get("script_id")?,
            voice_over_id: row.get("voice_over_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            bindings: row.get("bindings")?,
            duration: row.get("duration")?,
            resolution: row.get("resolution")?,
            file_size: row.get("file_size")?,
            asset_ref: row.get("asset_ref")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
        })
    }

    fn into_video(self) -> Result<FinalVideo, DatabaseError> {
        let status = JobStatus::parse(&self.status).ok_or_else(|| DatabaseError::InvalidValue {
            column: "status",
            value: self.status.clone(),
        })?;
        Ok(FinalVideo {
            segments: from_json("bindings", &self.bindings)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            file_size: u64::try_from(self.file_size).map_err(|_| DatabaseError::InvalidValue {
                column: "file_size",
                value: self.file_size.to_string(),
            })?,
            id: self.id,
            story_id: self.story_id,
            script_id: self.script_id,
            voice_over_id: self.voice_over_id,
            title: self.title,
            description: self.description,
            duration: self.duration,
            resolution: self.resolution,
            asset_ref: self.asset_ref,
            status,
        })
    }
}

pub fn insert(db: &Database, video: &FinalVideo) -> Result<(), DatabaseError> {
    let bindings = to_json("bindings", &video.segments)?;
    let file_size = i64::try_from(video.file_size).map_err(|_| DatabaseError::InvalidValue {
        column: "file_size",
        value: video.file_size.to_string(),
    })?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO final_videos (id, story_id, script_id, voice_over_id, title,
             description, bindings, duration, resolution, file_size, asset_ref, status,
             created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                video.id,
                video.story_id,
                video.script_id,
                video.voice_over_id,
                video.title,
                video.description,
                bindings,
                video.duration,
                video.resolution,
                file_size,
                video.asset_ref,
                video.status.as_str(),
                format_timestamp(&video.created_at),
            ],
        )?;
        Ok(())
    })
}

/// Updates the editable metadata of a video.
pub fn update_metadata(
    db: &Database,
    id: &str,
    title: &str,
    description: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE final_videos SET title = ?2, description = ?3 WHERE id = ?1",
            params![id, title, description],
        )?;
        Ok(updated == 1)
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<FinalVideo>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM final_videos WHERE id = ?1",
                params![id],
                VideoRow::from_row,
            )
            .optional()?)
    })?;
    row.map(VideoRow::into_video).transpose()
}

/// Videos made from a story, most recent first.
pub fn list_by_story(db: &Database, story_id: &str) -> Result<Vec<FinalVideo>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM final_videos WHERE story_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(params![story_id], VideoRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(VideoRow::into_video).collect()
}

pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM final_videos", [], |r| r.get(0))?;
        Ok(count)
    })
}
