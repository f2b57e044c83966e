//! Clip search against the Pexels video API.
//!
//! Pexels does not return tags for videos, so tags are taken from the
//! words of the page slug (`/video/ocean-waves-at-dusk-1234/`).

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{check_status, MediaSearch, ToolError};
use crate::config::SearchConfig;
use crate::error::ConfigError;
use crate::models::{ClipQuery, MediaClip};

const TOOL: &str = "media search";

/// License Pexels attaches to all of its content.
pub const PEXELS_LICENSE: &str = "Pexels License";

pub struct PexelsSearch {
    client: Client,
    endpoint: String,
    api_key: SecretString,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Deserialize)]
struct PexelsVideo {
    id: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    image: Option<String>,
    duration: f64,
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Deserialize)]
struct VideoFile {
    link: String,
    #[serde(default)]
    quality: Option<String>,
    #[serde(default)]
    width: Option<u32>,
}

impl PexelsSearch {
    pub fn new(client: Client, config: &SearchConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .resolve()
            .map_err(|source| ConfigError::Credential { tool: TOOL, source })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

/// Words of the page slug, lowercased, numeric id removed.
fn slug_tags(page_url: &str) -> Vec<String> {
    let slug = page_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    slug.split('-')
        .filter(|w| !w.is_empty() && !w.chars().all(|c| c.is_ascii_digit()))
        .map(|w| w.to_lowercase())
        .collect()
}

/// Picks the HD rendition when present, else the widest file.
fn best_file(files: &[VideoFile]) -> Option<&VideoFile> {
    files
        .iter()
        .find(|f| f.quality.as_deref() == Some("hd"))
        .or_else(|| files.iter().max_by_key(|f| f.width.unwrap_or(0)))
}

fn parse_search_response(body: &str) -> Result<Vec<MediaClip>, ToolError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| ToolError::decode(TOOL, e))?;

    Ok(response
        .videos
        .into_iter()
        .filter_map(|video| {
            let file = best_file(&video.video_files)?;
            let tags = slug_tags(&video.url);
            let title = if tags.is_empty() {
                format!("Pexels video {}", video.id)
            } else {
                tags.join(" ")
            };
            Some(MediaClip {
                id: format!("pexels-{}", video.id),
                title,
                thumbnail_ref: video.image.clone(),
                duration: video.duration,
                tags,
                source: "pexels".to_string(),
                license: PEXELS_LICENSE.to_string(),
                remote_url: file.link.clone(),
                asset_ref: None,
            })
        })
        .collect())
}

#[async_trait]
impl MediaSearch for PexelsSearch {
    async fn search(&self, query: &ClipQuery) -> Result<Vec<MediaClip>, ToolError> {
        let mut text = query.query.clone();
        for tag in &query.tags {
            text.push(' ');
            text.push_str(tag);
        }

        let mut params: Vec<(&str, String)> = vec![
            ("query", text),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(min) = query.min_duration {
            params.push(("min_duration", (min.floor() as u64).to_string()));
        }
        if let Some(max) = query.max_duration {
            params.push(("max_duration", (max.ceil() as u64).to_string()));
        }

        let response = self
            .client
            .get(format!("{}/videos/search", self.endpoint))
            .header("Authorization", self.api_key.expose_secret())
            .query(&params)
            .send()
            .await
            .map_err(|e| ToolError::request(TOOL, e.without_url()))?;
        let response = check_status(TOOL, response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::request(TOOL, e.without_url()))?;

        let clips = parse_search_response(&body)?;
        log::debug!("Pexels returned {} clips for '{}'", clips.len(), query.query);
        Ok(clips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_tags() {
        assert_eq!(
            slug_tags("https://www.pexels.com/video/ocean-waves-at-dusk-1234/"),
            vec!["ocean", "waves", "at", "dusk"]
        );
        assert!(slug_tags("https://www.pexels.com/video/987/").is_empty());
    }

    #[test]
    fn test_parse_search_response() {
        let body = r#"{
            "page": 1,
            "videos": [
                {
                    "id": 42,
                    "url": "https://www.pexels.com/video/coral-reef-fish-42/",
                    "image": "https://images.pexels.com/videos/42/thumb.jpg",
                    "duration": 14,
                    "video_files": [
                        {"link": "https://cdn/sd.mp4", "quality": "sd", "width": 640},
                        {"link": "https://cdn/hd.mp4", "quality": "hd", "width": 1920}
                    ]
                },
                {"id": 43, "url": "", "duration": 5, "video_files": []}
            ]
        }"#;
        let clips = parse_search_response(body).unwrap();
        assert_eq!(clips.len(), 1);
        let clip = &clips[0];
        assert_eq!(clip.id, "pexels-42");
        assert_eq!(clip.title, "coral reef fish");
        assert_eq!(clip.duration, 14.0);
        assert_eq!(clip.remote_url, "https://cdn/hd.mp4");
        assert_eq!(clip.license, PEXELS_LICENSE);
    }

    #[test]
    fn test_parse_empty_result() {
        assert!(parse_search_response(r#"{"videos": []}"#).unwrap().is_empty());
        assert!(parse_search_response(r#"{}"#).unwrap().is_empty());
    }
}
