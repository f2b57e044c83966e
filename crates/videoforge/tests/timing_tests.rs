//! Table-driven tests for segment timing allocation.

use videoforge::models::{Section, SectionKind};
use videoforge::timing::{allocate, build_segments};
use videoforge::TimingError;

struct AllocationCase {
    name: &'static str,
    lengths: &'static [usize],
    total: f64,
    /// Expected boundaries: start of the first slot, then every end.
    boundaries: &'static [f64],
}

const ALLOCATION_CASES: &[AllocationCase] = &[
    AllocationCase {
        name: "proportional_three_sections",
        lengths: &[100, 300, 100],
        total: 100.0,
        boundaries: &[0.0, 20.0, 80.0, 100.0],
    },
    AllocationCase {
        name: "single_section_spans_everything",
        lengths: &[42],
        total: 37.5,
        boundaries: &[0.0, 37.5],
    },
    AllocationCase {
        name: "empty_section_gets_zero_length",
        lengths: &[50, 0, 50],
        total: 10.0,
        boundaries: &[0.0, 5.0, 5.0, 10.0],
    },
    AllocationCase {
        name: "all_empty_split_evenly",
        lengths: &[0, 0, 0, 0],
        total: 8.0,
        boundaries: &[0.0, 2.0, 4.0, 6.0, 8.0],
    },
    AllocationCase {
        name: "uneven_split",
        lengths: &[1, 2],
        total: 9.0,
        boundaries: &[0.0, 3.0, 9.0],
    },
];

#[test]
fn allocation_examples() {
    for case in ALLOCATION_CASES {
        let contents: Vec<String> = case.lengths.iter().map(|n| "a".repeat(*n)).collect();
        let slots = allocate(&contents, case.total)
            .unwrap_or_else(|e| panic!("{}: unexpected error {}", case.name, e));

        assert_eq!(slots.len(), case.lengths.len(), "{}", case.name);
        assert_eq!(slots[0].start_time, 0.0, "{}", case.name);
        for (i, slot) in slots.iter().enumerate() {
            assert!(
                (slot.end_time - case.boundaries[i + 1]).abs() < 1e-9,
                "{}: slot {} ends at {}",
                case.name,
                i,
                slot.end_time
            );
            if i > 0 {
                assert_eq!(slot.start_time, slots[i - 1].end_time, "{}", case.name);
            }
        }
        assert_eq!(slots[slots.len() - 1].end_time, case.total, "{}", case.name);
    }
}

#[test]
fn many_sections_partition_exactly() {
    let contents: Vec<String> = (1..=37).map(|n| "b".repeat(n * 7 % 23)).collect();
    let total = 61.3;
    let slots = allocate(&contents, total).unwrap();

    let sum: f64 = slots.iter().map(|s| s.duration()).sum();
    assert!((sum - total).abs() < 1e-9);
    assert_eq!(slots.last().unwrap().end_time, total);
    assert!(slots.iter().all(|s| s.duration() >= 0.0));
}

#[test]
fn invalid_inputs_are_rejected() {
    let none: Vec<String> = Vec::new();
    assert!(matches!(
        allocate(&none, 10.0),
        Err(TimingError::InvalidInput(_))
    ));
    for total in [0.0, -4.0, f64::NAN, f64::INFINITY] {
        assert!(
            matches!(allocate(&["text"], total), Err(TimingError::InvalidInput(_))),
            "total {} accepted",
            total
        );
    }
}

#[test]
fn segments_carry_ids_and_content() {
    let sections = vec![
        Section::new(SectionKind::Hook, "Dive in."),
        Section::new(SectionKind::Outro, "Surface."),
    ];
    let segments = build_segments(&sections, 16.0).unwrap();

    assert_eq!(segments[0].id, "segment-001");
    assert_eq!(segments[1].id, "segment-002");
    assert_eq!(segments[1].content, "Surface.");
    assert!(segments.iter().all(|s| s.clip.is_none()));
    assert_eq!(segments[1].end_time, 16.0);
}
