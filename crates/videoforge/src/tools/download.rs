//! Clip download over HTTP into the data directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use super::{check_status, MediaDownloader, ToolError};
use crate::models::MediaClip;
use crate::sanitize::redact_url;

const TOOL: &str = "media download";

pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Clip ids come from the provider; keep them filesystem-safe.
fn safe_stem(clip_id: &str) -> String {
    clip_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Picks a file extension from the response content type, falling back
/// to the URL path and finally `mp4`.
fn extension_for(content_type: Option<&str>, url: &str) -> String {
    let from_mime = content_type
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|exts| {
            exts.iter()
                .find(|e| matches!(**e, "mp4" | "webm" | "mov" | "mkv" | "m4v"))
                .or_else(|| exts.first())
        })
        .map(|e| e.to_string());
    if let Some(ext) = from_mime {
        return ext;
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::VIDEO)
        .and_then(|_| Path::new(path).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "mp4".to_string())
}

#[async_trait]
impl MediaDownloader for HttpDownloader {
    async fn download(&self, clip: &MediaClip, dest_dir: &Path) -> Result<PathBuf, ToolError> {
        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| ToolError::io(dest_dir, e))?;

        let mut response = self
            .client
            .get(&clip.remote_url)
            .send()
            .await
            .map_err(|e| ToolError::request(TOOL, e.without_url()))?;
        response = check_status(TOOL, response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let file_name = format!(
            "{}.{}",
            safe_stem(&clip.id),
            extension_for(content_type.as_deref(), &clip.remote_url)
        );
        let target = dest_dir.join(file_name);
        let partial = target.with_extension("part");

        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| ToolError::io(&partial, e))?;
        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ToolError::request(TOOL, e.without_url()))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| ToolError::io(&partial, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| ToolError::io(&partial, e))?;
        drop(file);

        tokio::fs::rename(&partial, &target)
            .await
            .map_err(|e| ToolError::io(&target, e))?;

        log::debug!(
            "Downloaded {} bytes for clip {} from {}",
            written,
            clip.id,
            redact_url(&clip.remote_url)
        );
        Ok(target)
    }
}
