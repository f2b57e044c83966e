use serde::{Deserialize, Serialize};

/// A visual asset returned by the search tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaClip {
    pub id: String,
    pub title: String,
    pub thumbnail_ref: Option<String>,
    /// Seconds.
    pub duration: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Provider name, e.g. `pexels`.
    pub source: String,
    /// License tag declared by the provider.
    pub license: String,
    pub remote_url: String,
    /// Local file once downloaded.
    #[serde(default)]
    pub asset_ref: Option<String>,
}

/// Search request for clip candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClipQuery {
    pub query: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub min_duration: Option<f64>,
    #[serde(default)]
    pub max_duration: Option<f64>,
    pub per_page: u32,
}

impl ClipQuery {
    /// Cache key; two queries with equal keys return the same candidates.
    pub fn cache_key(&self) -> String {
        let mut tags = self.tags.clone();
        tags.sort();
        format!(
            "{}|{}|{:?}|{:?}|{}",
            self.query.to_lowercase(),
            tags.join(","),
            self.min_duration,
            self.max_duration,
            self.per_page
        )
    }
}

/// One timed slice of the final video, tied to a script section.
///
/// Segments are derived from a script and a voice-over duration; a
/// segment with `clip: Some(..)` is a binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub id: String,
    pub index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub content: String,
    #[serde(default)]
    pub clip: Option<MediaClip>,
}

impl Segment {
    /// Stable id for the section at `index`.
    pub fn id_for(index: usize) -> String {
        format!("segment-{:03}", index + 1)
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn is_resolved(&self) -> bool {
        self.clip.is_some()
    }
}
