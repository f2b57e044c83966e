//! Script repository.

use rusqlite::{params, OptionalExtension, Row};

use super::{format_timestamp, from_json, parse_timestamp, to_json, Database, DatabaseError};
use crate::models::Script;

struct ScriptRow {
    id: String,
    story_id: String,
    title: String,
    sections: String,
    options: String,
    approved: bool,
    created_at: String,
    modified_at: String,
}

impl ScriptRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            story_id: row.get("story_id")?,
            title: row.get("title")?,
            sections: row.get("sections")?,
            options: row.get("options")?,
            approved: row.get("approved")?,
            created_at: row.get("created_at")?,
            modified_at: row.get("modified_at")?,
        })
    }

    fn into_script(self) -> Result<Script, DatabaseError> {
        Ok(Script {
            sections: from_json("sections", &self.sections)?,
            options: from_json("options", &self.options)?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            modified_at: parse_timestamp("modified_at", &self.modified_at)?,
            id: self.id,
            story_id: self.story_id,
            title: self.title,
            approved: self.approved,
        })
    }
}

pub fn insert(db: &Database, script: &Script) -> Result<(), DatabaseError> {
    let sections = to_json("sections", &script.sections)?;
    let options = to_json("options", &script.options)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO scripts (id, story_id, title, sections, options, approved,
             created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                script.id,
                script.story_id,
                script.title,
                sections,
                options,
                script.approved,
                format_timestamp(&script.created_at),
                format_timestamp(&script.modified_at),
            ],
        )?;
        Ok(())
    })
}

/// Overwrites title, sections, approval and `modified_at`.
pub fn update(db: &Database, script: &Script) -> Result<(), DatabaseError> {
    let sections = to_json("sections", &script.sections)?;
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE scripts SET title = ?2, sections = ?3, approved = ?4, modified_at = ?5
             WHERE id = ?1",
            params![
                script.id,
                script.title,
                sections,
                script.approved,
                format_timestamp(&script.modified_at),
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Script>, DatabaseError> {
    let row = db.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT * FROM scripts WHERE id = ?1",
                params![id],
                ScriptRow::from_row,
            )
            .optional()?)
    })?;
    row.map(ScriptRow::into_script).transpose()
}

/// Scripts generated for a story, most recent first.
pub fn list_by_story(db: &Database, story_id: &str) -> Result<Vec<Script>, DatabaseError> {
    let rows = db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM scripts WHERE story_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(params![story_id], ScriptRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })?;
    rows.into_iter().map(ScriptRow::into_script).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::story_repo;
    use crate::models::{Section, SectionKind};
    use crate::test_support;

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        story_repo::insert(&db, &test_support::story("story-1")).unwrap();
        db
    }

    #[test]
    fn test_insert_and_find_preserves_section_order() {
        let db = db();
        let script = test_support::script("script-1", "story-1", test_support::three_sections());
        insert(&db, &script).unwrap();

        let found = find_by_id(&db, "script-1").unwrap().unwrap();
        let kinds: Vec<SectionKind> = found.sections.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SectionKind::Hook, SectionKind::MainContent, SectionKind::Outro]
        );
        assert!(found.approved);
        assert_eq!(found.options, script.options);
    }

    #[test]
    fn test_update() {
        let db = db();
        let mut script = test_support::script("script-1", "story-1", test_support::three_sections());
        insert(&db, &script).unwrap();

        script.title = "Reefs Reborn".to_string();
        script.sections.push(Section::new(SectionKind::CallToAction, "Subscribe"));
        script.approved = false;
        update(&db, &script).unwrap();

        let found = find_by_id(&db, "script-1").unwrap().unwrap();
        assert_eq!(found.title, "Reefs Reborn");
        assert_eq!(found.sections.len(), 4);
        assert!(!found.approved);
    }

    #[test]
    fn test_list_by_story() {
        let db = db();
        insert(&db, &test_support::script("s1", "story-1", test_support::three_sections())).unwrap();
        insert(&db, &test_support::script("s2", "story-1", test_support::three_sections())).unwrap();

        let ids: Vec<String> = list_by_story(&db, "story-1")
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["s2", "s1"]);
    }
}
