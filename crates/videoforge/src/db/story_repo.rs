//! Story repository: user stories and their generated narratives.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, from_json, parse_timestamp, to_json, Database, DatabaseError};
use crate::models::{GeneratedStory, Story};

const STORY_COLUMNS: &str = "id, owner_id, topic, genre, target_audience, tone, \
                             additional_details, research_keywords, created_at";

struct StoryRow {
    id: String,
    owner_id: String,
    topic: String,
    genre: String,
    target_audience: String,
    tone: String,
    additional_details: Option<String>,
    research_keywords: String,
    created_at: String,
}

impl StoryRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            owner_id: row.get("owner_id")?,
            topic: row.get("topic")?,
            genre: row.get("genre")?,
            target_audience: row.get("target_audience")?,
            tone: row.get("tone")?,
            additional_details: row.get("additional_details")?,
            research_keywords: row.get("research_keywords")?,
            created_at: row.get("created_at")?,
        })
    }

    fn into_story(self) -> Result<Story, DatabaseError> {
        Ok(Story {
            research_keywords: from_json("research_keywords", &self.research_keywords)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            id: self.id,
            owner_id: self.owner_id,
            topic: self.topic,
            genre: self.genre,
            target_audience: self.target_audience,
            tone: self.tone,
            additional_details: self.additional_details,
        })
    }
}

pub fn insert(db: &Database, story: &Story) -> Result<(), DatabaseError> {
    let keywords = to_json("research_keywords", &story.research_keywords)?;
    db.with_conn(|conn| {
        conn.execute(
            &format!("INSERT INTO stories ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)", STORY_COLUMNS),
            params![
                story.id,
                story.owner_id,
                story.topic,
                story.genre,
                story.target_audience,
                story.tone,
                story.additional_details,
                keywords,
                format_timestamp(&story.created_at),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Story>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM stories WHERE id = ?1", STORY_COLUMNS),
                params![id],
                StoryRow::from_row,
            )
            .optional()?)
    })?;
    row.map(StoryRow::into_story).transpose()
}

/// Stories owned by `owner_id`, most recent first.
pub fn list_by_owner(db: &Database, owner_id: &str) -> Result<Vec<Story>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stories WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
            STORY_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![owner_id], StoryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(StoryRow::into_story).collect()
}

pub fn insert_generated(db: &Database, generated: &GeneratedStory) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO generated_stories (id, story_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                generated.id,
                generated.story_id,
                generated.content,
                format_timestamp(&generated.created_at),
            ],
        )?;
        Ok(())
    })
}

fn generated_from_row(row: &Row<'_>) -> Result<(String, String, String, String), rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_generated(raw: (String, String, String, String)) -> Result<GeneratedStory, DatabaseError> {
    let (id, story_id, content, created_at) = raw;
    Ok(GeneratedStory {
        id,
        story_id,
        content,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

pub fn find_generated(db: &Database, id: &str) -> Result<Option<GeneratedStory>, DatabaseError> {
    let raw = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT id, story_id, content, created_at FROM generated_stories WHERE id = ?1",
                params![id],
                generated_from_row,
            )
            .optional()?)
    })?;
    raw.map(into_generated).transpose()
}

/// Newest generated narrative for a story.
pub fn latest_generated(
    db: &Database,
    story_id: &str,
) -> Result<Option<GeneratedStory>, DatabaseError> {
    let raw = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT id, story_id, content, created_at FROM generated_stories
                 WHERE story_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![story_id],
                generated_from_row,
            )
            .optional()?)
    })?;
    raw.map(into_generated).transpose()
}
