//! Media repository: fetched clips and the per-script segment timeline
//! with its clip bindings.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_timestamp, from_json, to_json, Database, DatabaseError};
use crate::models::{MediaClip, Segment};

/// The segment timeline stored for a script, computed from one voice-over.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTimeline {
    pub voice_over_id: String,
    pub segments: Vec<Segment>,
}

fn clip_from_row(row: &Row<'_>, prefix: &str) -> Result<Option<ClipRow>, rusqlite::Error> {
    let id: Option<String> = row.get(format!("{}id", prefix).as_str())?;
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(Some(ClipRow {
        id,
        title: row.get(format!("{}title", prefix).as_str())?,
        thumbnail_ref: row.get(format!("{}thumbnail_ref", prefix).as_str())?,
        duration: row.get(format!("{}duration", prefix).as_str())?,
        tags: row.get(format!("{}tags", prefix).as_str())?,
        source: row.get(format!("{}source", prefix).as_str())?,
        license: row.get(format!("{}license", prefix).as_str())?,
        remote_url: row.get(format!("{}remote_url", prefix).as_str())?,
        asset_ref: row.get(format!("{}asset_ref", prefix).as_str())?,
    }))
}

struct ClipRow {
    id: String,
    title: String,
    thumbnail_ref: Option<String>,
    duration: f64,
    tags: String,
    source: String,
    license: String,
    remote_url: String,
    asset_ref: Option<String>,
}

impl ClipRow {
    fn into_clip(self) -> Result<MediaClip, DatabaseError> {
        Ok(MediaClip {
            tags: from_json("tags", &self.tags)?,
            id: self.id,
            title: self.title,
            thumbnail_ref: self.thumbnail_ref,
            duration: self.duration,
            source: self.source,
            license: self.license,
            remote_url: self.remote_url,
            asset_ref: self.asset_ref,
        })
    }
}

struct SegmentRow {
    voice_over_id: String,
    segment_id: String,
    segment_index: i64,
    start_time: f64,
    end_time: f64,
    content: String,
    clip: Option<ClipRow>,
}

fn upsert_clip_on(conn: &Connection, clip: &MediaClip) -> Result<(), DatabaseError> {
    let tags = to_json("tags", &clip.tags)?;
    conn.execute(
        "INSERT INTO media_clips (id, title, thumbnail_ref, duration, tags, source, license,
         remote_url, asset_ref, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET asset_ref = COALESCE(excluded.asset_ref, media_clips.asset_ref)",
        params![
            clip.id,
            clip.title,
            clip.thumbnail_ref,
            clip.duration,
            tags,
            clip.source,
            clip.license,
            clip.remote_url,
            clip.asset_ref,
            format_timestamp(&Utc::now()),
        ],
    )?;
    Ok(())
}

/// Stores a clip. Clips are immutable once fetched, so an existing row
/// only gains a local `asset_ref` it did not have.
pub fn upsert_clip(db: &Database, clip: &MediaClip) -> Result<(), DatabaseError> {
    db.with_conn(|conn| upsert_clip_on(conn, clip))
}

pub fn find_clip(db: &Database, id: &str) -> Result<Option<MediaClip>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM media_clips WHERE id = ?1",
                params![id],
                |row| clip_from_row(row, ""),
            )
            .optional()?
            .flatten())
    })?;
    row.map(ClipRow::into_clip).transpose()
}

/// Replaces the script's timeline in one transaction.
pub fn replace_timeline(
    db: &Database,
    script_id: &str,
    voice_over_id: &str,
    segments: &[Segment],
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM segment_bindings WHERE script_id = ?1",
            params![script_id],
        )?;
        let now = format_timestamp(&Utc::now());
        for segment in segments {
            if let Some(ref clip) = segment.clip {
                upsert_clip_on(&tx, clip)?;
            }
            tx.execute(
                "INSERT INTO segment_bindings (script_id, segment_id, voice_over_id,
                 segment_index, start_time, end_time, content, clip_id, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    script_id,
                    segment.id,
                    voice_over_id,
                    segment.index as i64,
                    segment.start_time,
                    segment.end_time,
                    segment.content,
                    segment.clip.as_ref().map(|c| c.id.as_str()),
                    now,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    })
}

/// Binds `clip` to one segment. Returns false when the script has no
/// such segment.
pub fn bind_segment(
    db: &Database,
    script_id: &str,
    segment_id: &str,
    clip: &MediaClip,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM segment_bindings WHERE script_id = ?1 AND segment_id = ?2",
                params![script_id, segment_id],
                |r| r.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(false);
        }
        upsert_clip_on(&tx, clip)?;
        tx.execute(
            "UPDATE segment_bindings SET clip_id = ?3, updated_at = ?4
             WHERE script_id = ?1 AND segment_id = ?2",
            params![
                script_id,
                segment_id,
                clip.id,
                format_timestamp(&Utc::now())
            ],
        )?;
        tx.commit()?;
        Ok(true)
    })
}

/// Loads the script's timeline in segment order, clips joined in.
pub fn load_timeline(
    db: &Database,
    script_id: &str,
) -> Result<Option<StoredTimeline>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT b.voice_over_id, b.segment_id, b.segment_index, b.start_time, b.end_time,
                    b.content,
                    c.id AS c_id, c.title AS c_title, c.thumbnail_ref AS c_thumbnail_ref,
                    c.duration AS c_duration, c.tags AS c_tags, c.source AS c_source,
                    c.license AS c_license, c.remote_url AS c_remote_url,
                    c.asset_ref AS c_asset_ref
             FROM segment_bindings b
             LEFT JOIN media_clips c ON c.id = b.clip_id
             WHERE b.script_id = ?1
             ORDER BY b.segment_index ASC",
        )?;
        let rows = stmt
            .query_map(params![script_id], |row| {
                Ok(SegmentRow {
                    voice_over_id: row.get("voice_over_id")?,
                    segment_id: row.get("segment_id")?,
                    segment_index: row.get("segment_index")?,
                    start_time: row.get("start_time")?,
                    end_time: row.get("end_time")?,
                    content: row.get("content")?,
                    clip: clip_from_row(row, "c_")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;

    let Some(first) = rows.first() else {
        return Ok(None);
    };
    let voice_over_id = first.voice_over_id.clone();

    let segments = rows
        .into_iter()
        .map(|row| {
            Ok(Segment {
                id: row.segment_id,
                index: row.segment_index as usize,
                start_time: row.start_time,
                end_time: row.end_time,
                content: row.content,
                clip: row.clip.map(ClipRow::into_clip).transpose()?,
            })
        })
        .collect::<Result<Vec<_>, DatabaseError>>()?;

    Ok(Some(StoredTimeline {
        voice_over_id,
        segments,
    }))
}
