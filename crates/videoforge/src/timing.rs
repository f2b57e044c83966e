//! Segment timing: lays script sections out on the voice-over timeline.
//!
//! Time is shared out in proportion to each section's character count.
//! This approximates narration pacing without word-level timestamps from
//! the synthesis tool.

use serde::{Deserialize, Serialize};

use crate::error::TimingError;
use crate::models::{Section, Segment};

/// A `[start_time, end_time)` window in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start_time: f64,
    pub end_time: f64,
}

impl TimeSlot {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Allocates contiguous slots covering `[0, total_duration]`.
///
/// Boundaries are computed from cumulative weights rather than by summing
/// per-slot durations, so the result is deterministic and the last slot
/// ends exactly at `total_duration`. Empty content gets a zero-length
/// slot. When every section is empty the duration is split evenly.
pub fn allocate<S: AsRef<str>>(
    contents: &[S],
    total_duration: f64,
) -> Result<Vec<TimeSlot>, TimingError> {
    if contents.is_empty() {
        return Err(TimingError::InvalidInput(
            "at least one section is required".to_string(),
        ));
    }
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(TimingError::InvalidInput(format!(
            "total duration must be a positive number of seconds, got {}",
            total_duration
        )));
    }

    let mut weights: Vec<u64> = contents
        .iter()
        .map(|c| c.as_ref().chars().count() as u64)
        .collect();
    if weights.iter().all(|w| *w == 0) {
        weights.iter_mut().for_each(|w| *w = 1);
    }
    let total_weight: u64 = weights.iter().sum();

    let last = weights.len() - 1;
    let mut slots = Vec::with_capacity(weights.len());
    let mut cumulative = 0u64;
    let mut start = 0.0;

    for (i, weight) in weights.iter().enumerate() {
        cumulative += weight;
        let end = if i == last {
            total_duration
        } else {
            total_duration * cumulative as f64 / total_weight as f64
        };
        slots.push(TimeSlot {
            start_time: start,
            end_time: end,
        });
        start = end;
    }

    Ok(slots)
}

/// Builds unbound segments for a script's sections.
pub fn build_segments(
    sections: &[Section],
    total_duration: f64,
) -> Result<Vec<Segment>, TimingError> {
    let contents: Vec<&str> = sections.iter().map(|s| s.content.as_str()).collect();
    let slots = allocate(&contents, total_duration)?;

    Ok(sections
        .iter()
        .zip(slots)
        .enumerate()
        .map(|(index, (section, slot))| Segment {
            id: Segment::id_for(index),
            index,
            start_time: slot.start_time,
            end_time: slot.end_time,
            content: section.content.clone(),
            clip: None,
        })
        .collect())
}
