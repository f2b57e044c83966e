use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::agents::keywords;
use crate::models::{MediaClip, Segment};
use crate::tools::{MediaDownloader, ToolError};

/// Binds one clip to a segment and fetches it.
pub struct MediaCurator {
    downloader: Arc<dyn MediaDownloader>,
    clips_dir: PathBuf,
}

impl MediaCurator {
    pub fn new(downloader: Arc<dyn MediaDownloader>, clips_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            clips_dir: clips_dir.into(),
        }
    }

    /// Picks the best candidate and downloads it. `None` when there are no
    /// candidates; the segment then stays unresolved.
    pub async fn curate(
        &self,
        segment: &Segment,
        candidates: &[MediaClip],
    ) -> Result<Option<MediaClip>, ToolError> {
        let words = keywords::segment_keywords(&segment.content, usize::MAX);
        let Some(index) = choose(&words, segment.duration(), candidates) else {
            return Ok(None);
        };

        let mut clip = candidates[index].clone();
        let local = clip
            .asset_ref
            .as_deref()
            .map(Path::new)
            .filter(|p| p.exists())
            .map(Path::to_path_buf);
        let path = match local {
            Some(path) => path,
            None => self.downloader.download(&clip, &self.clips_dir).await?,
        };

        debug!("Segment {} bound to clip {}", segment.id, clip.id);
        clip.asset_ref = Some(path.display().to_string());
        Ok(Some(clip))
    }
}

/// Index of the candidate with the largest tag overlap with `words`.
/// Ties go to the shortest clip that covers `needed` seconds, or the
/// longest one when none does. Remaining ties keep search order.
pub fn choose(words: &[String], needed: f64, candidates: &[MediaClip]) -> Option<usize> {
    let words: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
    let overlap = |clip: &MediaClip| {
        clip.tags
            .iter()
            .map(|t| t.to_lowercase())
            .collect::<HashSet<_>>()
            .intersection(&words)
            .count()
    };

    let scored: Vec<(usize, usize)> = candidates
        .iter()
        .enumerate()
        .map(|(i, clip)| (i, overlap(clip)))
        .collect();
    let best = scored.iter().map(|(_, score)| *score).max()?;
    let tied: Vec<usize> = scored
        .into_iter()
        .filter(|(_, score)| *score == best)
        .map(|(i, _)| i)
        .collect();

    let duration = |i: usize| candidates[i].duration;
    let covering = tied
        .iter()
        .copied()
        .filter(|&i| duration(i) >= needed)
        .min_by(|&a, &b| duration(a).total_cmp(&duration(b)));

    covering.or_else(|| {
        tied.iter()
            .copied()
            .min_by(|&a, &b| duration(b).total_cmp(&duration(a)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::clip;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_highest_overlap_wins() {
        let candidates = vec![
            clip("a", 30.0, &["ocean"]),
            clip("b", 5.0, &["coral", "reef"]),
        ];
        let chosen = choose(&words(&["coral", "reef"]), 10.0, &candidates);
        assert_eq!(chosen, Some(1));
    }

    #[test]
    fn test_tie_prefers_shortest_covering_clip() {
        let candidates = vec![
            clip("long", 60.0, &["reef"]),
            clip("short", 4.0, &["reef"]),
            clip("fits", 12.0, &["reef"]),
        ];
        assert_eq!(choose(&words(&["reef"]), 10.0, &candidates), Some(2));
    }

    #[test]
    fn test_tie_without_cover_prefers_longest() {
        let candidates = vec![
            clip("a", 3.0, &["reef"]),
            clip("b", 7.0, &["reef"]),
            clip("c", 7.0, &["reef"]),
        ];
        assert_eq!(choose(&words(&["reef"]), 10.0, &candidates), Some(1));
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(choose(&words(&["reef"]), 10.0, &[]), None);
    }

    struct CountingDownloader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaDownloader for CountingDownloader {
        async fn download(&self, clip: &MediaClip, dest_dir: &Path) -> Result<PathBuf, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(dest_dir.join(format!("{}.mp4", clip.id)))
        }
    }

    #[tokio::test]
    async fn test_curate_downloads_choice() {
        let downloader = Arc::new(CountingDownloader {
            calls: AtomicUsize::new(0),
        });
        let curator = MediaCurator::new(downloader.clone(), "/clips");
        let segment = Segment {
            id: "segment-001".to_string(),
            index: 0,
            start_time: 0.0,
            end_time: 6.0,
            content: "Reef fish gather at dawn".to_string(),
            clip: None,
        };

        let bound = curator
            .curate(&segment, &[clip("fish", 10.0, &["fish", "reef"])])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bound.asset_ref.as_deref(), Some("/clips/fish.mp4"));
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);

        assert!(curator.curate(&segment, &[]).await.unwrap().is_none());
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
    }
}
