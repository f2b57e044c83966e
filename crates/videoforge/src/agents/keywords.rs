use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Story;

/// Words of more than three letters that say nothing about the picture.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "been", "before", "being", "between", "both", "could",
    "does", "doing", "down", "during", "each", "even", "every", "from", "have", "having", "here",
    "into", "just", "like", "more", "most", "much", "must", "only", "other", "over", "really",
    "same", "should", "some", "such", "than", "that", "their", "them", "then", "there", "these",
    "they", "this", "those", "through", "under", "until", "very", "were", "what", "when",
    "where", "which", "while", "will", "with", "would", "your", "yours", "today", "let's",
];

const DETAIL_KEYWORD_LIMIT: usize = 5;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z'-]*[A-Za-z]").unwrap());

fn is_content_word(word: &str) -> bool {
    word.chars().count() > 3 && !STOPWORDS.contains(&word)
}

/// Keywords describing the story as a whole. The topic always comes first;
/// explicit keywords win over the story's own, which win over words taken
/// from the additional details.
pub fn research_keywords(story: &Story, explicit: &[String]) -> Vec<String> {
    let mut keywords = vec![story.topic.clone()];

    let chosen: Vec<String> = if explicit.iter().any(|k| !k.trim().is_empty()) {
        explicit.iter().map(|k| k.trim().to_string()).collect()
    } else if !story.research_keywords.is_empty() {
        story.research_keywords.clone()
    } else {
        story
            .additional_details
            .as_deref()
            .map(|details| {
                details
                    .split_whitespace()
                    .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                    .filter(|w| w.chars().count() > 3)
                    .take(DETAIL_KEYWORD_LIMIT)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    };

    for keyword in chosen {
        if keyword.is_empty() {
            continue;
        }
        if !keywords.iter().any(|k| k.eq_ignore_ascii_case(&keyword)) {
            keywords.push(keyword);
        }
    }
    keywords
}

/// The most frequent content words of a segment, lowercased. Ties keep the
/// order of first appearance.
pub fn segment_keywords(text: &str, max: usize) -> Vec<String> {
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (position, m) in WORD_RE.find_iter(text).enumerate() {
        let word = m.as_str().to_lowercase();
        if !is_content_word(&word) {
            continue;
        }
        counts
            .entry(word)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, position));
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(max).map(|(word, _)| word).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_topic_first_then_story_keywords() {
        let mut story = test_support::story("story-1");
        story.research_keywords = vec!["bleaching".to_string(), "coral reefs".to_string()];
        let keywords = research_keywords(&story, &[]);
        assert_eq!(keywords, vec!["Coral reefs", "bleaching"]);
    }

    #[test]
    fn test_explicit_keywords_win() {
        let mut story = test_support::story("story-1");
        story.research_keywords = vec!["bleaching".to_string()];
        let keywords = research_keywords(&story, &["parrotfish".to_string()]);
        assert_eq!(keywords, vec!["Coral reefs", "parrotfish"]);
    }

    #[test]
    fn test_detail_words_fallback() {
        let mut story = test_support::story("story-1");
        story.additional_details =
            Some("Show the glowing jellyfish, big squid and tiny shrimp near the reef".into());
        let keywords = research_keywords(&story, &[]);
        assert_eq!(
            keywords,
            vec!["Coral reefs", "Show", "glowing", "jellyfish", "squid", "tiny"]
        );
    }

    #[test]
    fn test_segment_keywords_rank_by_frequency() {
        let text = "The octopus hides. An octopus changes colour while the reef sleeps. Reef life!";
        let keywords = segment_keywords(text, 3);
        assert_eq!(keywords, vec!["octopus", "reef", "hides"]);
    }

    #[test]
    fn test_segment_keywords_skip_stopwords() {
        assert!(segment_keywords("this is what they would have been", 5).is_empty());
    }
}
