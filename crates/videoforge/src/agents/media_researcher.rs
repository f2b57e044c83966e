use std::sync::Arc;

use log::debug;

use crate::agents::keywords;
use crate::models::{ClipQuery, MediaClip, Segment};
use crate::tools::{MediaSearch, ToolError};

/// Finds license-safe clip candidates for one segment.
pub struct MediaResearcher {
    search: Arc<dyn MediaSearch>,
    safe_licenses: Vec<String>,
    per_page: u32,
    keywords_per_segment: usize,
}

impl MediaResearcher {
    pub fn new(
        search: Arc<dyn MediaSearch>,
        safe_licenses: Vec<String>,
        per_page: u32,
        keywords_per_segment: usize,
    ) -> Self {
        Self {
            search,
            safe_licenses,
            per_page,
            keywords_per_segment,
        }
    }

    /// Search query for a segment. Falls back to the story keywords when
    /// the segment text has no usable words.
    pub fn query_for(&self, segment: &Segment, story_keywords: &[String]) -> ClipQuery {
        let words = keywords::segment_keywords(&segment.content, self.keywords_per_segment);
        let query = if words.is_empty() {
            story_keywords
                .iter()
                .take(2)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            words.join(" ")
        };

        ClipQuery {
            query,
            per_page: self.per_page,
            ..Default::default()
        }
    }

    /// Ranked candidates, search order kept, with every clip whose license
    /// is not on the safe list removed.
    pub async fn research(
        &self,
        segment: &Segment,
        story_keywords: &[String],
    ) -> Result<Vec<MediaClip>, ToolError> {
        let query = self.query_for(segment, story_keywords);
        if query.query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let found = self.search.search(&query).await?;
        let total = found.len();
        let safe: Vec<MediaClip> = found
            .into_iter()
            .filter(|clip| is_license_safe(clip, &self.safe_licenses))
            .collect();

        debug!(
            "Segment {}: {} candidates for '{}', {} license-safe",
            segment.id,
            total,
            query.query,
            safe.len()
        );
        Ok(safe)
    }
}

pub fn is_license_safe(clip: &MediaClip, safe_licenses: &[String]) -> bool {
    let license = clip.license.trim();
    !license.is_empty() && safe_licenses.iter().any(|l| l.eq_ignore_ascii_case(license))
}
