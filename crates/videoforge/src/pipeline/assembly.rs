//! Binding checks run before a VIDEO job is submitted and again when it
//! executes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AssemblyError;
use crate::models::{MediaClip, Segment};

/// Caller-supplied clip for one segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentBinding {
    pub segment_id: String,
    pub clip: MediaClip,
}

/// Largest start/end difference tolerated between a request and the
/// recomputed timeline.
const TIME_TOLERANCE: f64 = 1e-6;

/// Overlays `bindings` on `timeline` and checks that every segment ends up
/// with exactly one clip. A binding for an unknown segment is a
/// [`AssemblyError::TimelineMismatch`]; segments left without a clip are
/// listed in [`AssemblyError::IncompleteBinding`].
pub fn resolve_bindings(
    timeline: &[Segment],
    bindings: &[SegmentBinding],
) -> Result<Vec<Segment>, AssemblyError> {
    let mut overrides: HashMap<&str, &MediaClip> = HashMap::new();
    for binding in bindings {
        if !timeline.iter().any(|s| s.id == binding.segment_id) {
            return Err(AssemblyError::TimelineMismatch {
                segment_id: binding.segment_id.clone(),
            });
        }
        overrides.insert(binding.segment_id.as_str(), &binding.clip);
    }

    let resolved: Vec<Segment> = timeline
        .iter()
        .map(|segment| {
            let mut segment = segment.clone();
            if let Some(clip) = overrides.get(segment.id.as_str()) {
                segment.clip = Some((*clip).clone());
            }
            segment
        })
        .collect();

    let unresolved: Vec<String> = resolved
        .iter()
        .filter(|s| !s.is_resolved())
        .map(|s| s.id.clone())
        .collect();
    if !unresolved.is_empty() {
        return Err(AssemblyError::IncompleteBinding { unresolved });
    }
    Ok(resolved)
}

/// Checks that `requested` is exactly the `expected` timeline: same
/// segments in the same order, each bound. Used when a VIDEO job runs,
/// since the script or voice-over may have been replaced after
/// submission and a request may not come from [`resolve_bindings`].
pub fn verify_timeline(expected: &[Segment], requested: &[Segment]) -> Result<(), AssemblyError> {
    for (position, segment) in requested.iter().enumerate() {
        let matches = expected.get(position).is_some_and(|e| {
            e.id == segment.id
                && (e.start_time - segment.start_time).abs() <= TIME_TOLERANCE
                && (e.end_time - segment.end_time).abs() <= TIME_TOLERANCE
        });
        if !matches {
            return Err(AssemblyError::TimelineMismatch {
                segment_id: segment.id.clone(),
            });
        }
    }

    let unresolved: Vec<String> = expected
        .iter()
        .enumerate()
        .filter(|(position, _)| !requested.get(*position).is_some_and(Segment::is_resolved))
        .map(|(_, e)| e.id.clone())
        .collect();
    if !unresolved.is_empty() {
        return Err(AssemblyError::IncompleteBinding { unresolved });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use crate::timing;

    fn timeline() -> Vec<Segment> {
        timing::build_segments(&test_support::three_sections(), 100.0).unwrap()
    }

    fn binding(segment_id: &str, clip_id: &str) -> SegmentBinding {
        SegmentBinding {
            segment_id: segment_id.to_string(),
            clip: test_support::clip(clip_id, 30.0, &[]),
        }
    }

    #[test]
    fn test_all_bound() {
        let bindings = vec![
            binding("segment-001", "a"),
            binding("segment-002", "b"),
            binding("segment-003", "c"),
        ];
        let resolved = resolve_bindings(&timeline(), &bindings).unwrap();
        assert!(resolved.iter().all(Segment::is_resolved));
        assert_eq!(resolved[1].clip.as_ref().unwrap().id, "b");
    }

    #[test]
    fn test_unresolved_segments_listed() {
        let err = resolve_bindings(&timeline(), &[binding("segment-002", "b")]).unwrap_err();
        match err {
            AssemblyError::IncompleteBinding { unresolved } => {
                assert_eq!(unresolved, vec!["segment-001", "segment-003"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_existing_bindings_count() {
        let mut timeline = timeline();
        timeline[0].clip = Some(test_support::clip("stored", 10.0, &[]));
        timeline[2].clip = Some(test_support::clip("stored", 10.0, &[]));
        let resolved = resolve_bindings(&timeline, &[binding("segment-002", "b")]).unwrap();
        assert_eq!(resolved.len(), 3);
    }

    #[test]
    fn test_unknown_segment_is_mismatch() {
        let err = resolve_bindings(&timeline(), &[binding("segment-009", "x")]).unwrap_err();
        assert!(matches!(err, AssemblyError::TimelineMismatch { .. }));
    }

    #[test]
    fn test_verify_detects_shifted_times() {
        let expected = timeline();
        let mut requested = expected.clone();
        for segment in &mut requested {
            segment.clip = Some(test_support::clip("c", 30.0, &[]));
        }
        verify_timeline(&expected, &requested).unwrap();

        requested[1].end_time += 1.0;
        let err = verify_timeline(&expected, &requested).unwrap_err();
        assert!(matches!(err, AssemblyError::TimelineMismatch { segment_id } if segment_id == "segment-002"));
    }

    #[test]
    fn test_verify_requires_every_segment() {
        let expected = timeline();
        let mut requested = expected.clone();
        requested.truncate(2);
        for segment in &mut requested {
            segment.clip = Some(test_support::clip("c", 30.0, &[]));
        }
        let err = verify_timeline(&expected, &requested).unwrap_err();
        assert_eq!(err.to_string(), "Segments without a bound clip: segment-003");
    }

    fn bound_timeline() -> Vec<Segment> {
        let mut segments = timeline();
        for segment in &mut segments {
            segment.clip = Some(test_support::clip("c", 30.0, &[]));
        }
        segments
    }

    #[test]
    fn test_verify_rejects_reordered_segments() {
        let expected = timeline();
        let mut requested = bound_timeline();
        requested.reverse();
        let err = verify_timeline(&expected, &requested).unwrap_err();
        assert!(matches!(err, AssemblyError::TimelineMismatch { segment_id } if segment_id == "segment-003"));
    }

    #[test]
    fn test_verify_rejects_duplicate_segments() {
        let expected = timeline();
        let mut requested = bound_timeline();
        requested.push(requested[0].clone());
        let err = verify_timeline(&expected, &requested).unwrap_err();
        assert!(matches!(err, AssemblyError::TimelineMismatch { segment_id } if segment_id == "segment-001"));

        // A duplicate in place of its neighbour is caught by position too.
        let mut requested = bound_timeline();
        requested[1] = requested[0].clone();
        assert!(verify_timeline(&expected, &requested).is_err());
    }
}
