//! End-to-end stage runs through the worker pool with fake tools.

mod common;

use std::sync::Arc;

use common::{fakes, TestHarness};
use videoforge::models::{ScriptUpdate, Section, SectionKind, VoicePreferences};
use videoforge::{
    Artifact, ArtifactError, AssemblyError, Halt, JobStage, JobStatus, RunOptions,
    SegmentBinding, StageRequest, VideoForgeError,
};

#[test]
fn empty_research_leaves_segments_unresolved() {
    let harness = TestHarness::new();
    harness.seed_chain();
    let tools = fakes::tools("", Vec::new(), 100.0);
    let forge = harness.forge(tools.toolset);

    let job = forge.research_media("script-1", "vo-1").unwrap();
    let job = forge.await_job(&job.id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.message.as_deref(), Some("3 of 3 segments unresolved"));
    assert_eq!(tools.search.call_count(), 3);

    let timeline = forge.timeline("script-1").unwrap().unwrap();
    assert!(timeline.segments.iter().all(|s| s.clip.is_none()));

    match forge.assemble("script-1", "vo-1", &[]).unwrap_err() {
        VideoForgeError::Assembly(AssemblyError::IncompleteBinding { unresolved }) => {
            assert_eq!(unresolved, vec!["segment-001", "segment-002", "segment-003"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(forge
        .jobs("script-1")
        .unwrap()
        .iter()
        .all(|j| j.stage != JobStage::Video));
    assert!(forge.list_final_videos("story-1").unwrap().is_empty());
    assert!(tools.muxer.requests.lock().unwrap().is_empty());
    forge.shutdown();
}

#[test]
fn bound_segments_assemble_into_final_video() {
    let harness = TestHarness::new();
    harness.seed_chain();
    let tools = fakes::tools("", Vec::new(), 100.0);
    let forge = harness.forge(tools.toolset);

    let job = forge.research_media("script-1", "vo-1").unwrap();
    forge.await_job(&job.id).unwrap();
    forge
        .bind_clip("script-1", "segment-001", fakes::clip("a", 30.0, &["reef"]))
        .unwrap();

    // The remaining two segments come in as request bindings.
    let bindings = vec![
        SegmentBinding {
            segment_id: "segment-002".to_string(),
            clip: fakes::clip("b", 90.0, &["coral"]),
        },
        SegmentBinding {
            segment_id: "segment-003".to_string(),
            clip: fakes::clip("c", 5.0, &["ocean"]),
        },
    ];
    let job = forge.assemble("script-1", "vo-1", &bindings).unwrap();
    let job = forge.await_job(&job.id).unwrap();

    let Artifact::FinalVideo(video) = forge.artifact_for(&job).unwrap() else {
        panic!("VIDEO job must produce a final video");
    };
    assert_eq!(video.duration, 100.0);
    assert_eq!(video.resolution, "1280x720");
    let clips: Vec<&str> = video
        .segments
        .iter()
        .map(|s| s.clip.as_ref().unwrap().id.as_str())
        .collect();
    assert_eq!(clips, vec!["a", "b", "c"]);

    let requests = tools.muxer.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let windows = &requests[0].windows;
    assert_eq!(windows[0].start_time, 0.0);
    assert!((windows[1].start_time - 20.0).abs() < 1e-9);
    assert_eq!(windows[2].end_time, 100.0);
    assert!(windows.iter().all(|w| w.path.exists()));
    drop(requests);
    forge.shutdown();
}

#[test]
fn binding_for_unknown_segment_is_rejected() {
    let harness = TestHarness::new();
    harness.seed_chain();
    let forge = harness.forge(fakes::tools("", Vec::new(), 100.0).toolset);

    let err = forge
        .assemble(
            "script-1",
            "vo-1",
            &[SegmentBinding {
                segment_id: "segment-004".to_string(),
                clip: fakes::clip("x", 10.0, &[]),
            }],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        VideoForgeError::Assembly(AssemblyError::TimelineMismatch { .. })
    ));
    forge.shutdown();
}

#[test]
fn voice_over_duration_drives_the_timeline() {
    let harness = TestHarness::new();
    harness.seed_story("story-1");
    harness.seed_script("script-1", "story-1", true);
    let tools = fakes::tools("", vec![fakes::clip("reef", 60.0, &["coral"])], 42.0);
    let forge = harness.forge(tools.toolset);

    let job = forge
        .generate_voice_over("script-1", VoicePreferences::default())
        .unwrap();
    let job = forge.await_job(&job.id).unwrap();
    let voice_over = forge.get_voice_over(job.artifact_ref.as_deref().unwrap()).unwrap();
    assert_eq!(voice_over.status, JobStatus::Completed);
    assert_eq!(voice_over.total_duration, Some(42.0));

    let job = forge.research_media("script-1", &voice_over.id).unwrap();
    let job = forge.await_job(&job.id).unwrap();
    assert_eq!(job.message.as_deref(), Some("All 3 segments bound"));

    let timeline = forge.timeline("script-1").unwrap().unwrap();
    assert_eq!(timeline.voice_over_id, voice_over.id);
    assert_eq!(timeline.segments.last().unwrap().end_time, 42.0);
    assert!(timeline
        .segments
        .iter()
        .all(|s| s.clip.as_ref().and_then(|c| c.asset_ref.as_ref()).is_some()));
    forge.shutdown();
}

#[test]
fn search_outage_fails_the_media_job() {
    let harness = TestHarness::new();
    harness.seed_chain();
    let mut tools = fakes::tools("", Vec::new(), 100.0).toolset;
    tools.search = Arc::new(fakes::FakeSearch::unavailable(429));
    let forge = harness.forge(tools);

    let job = forge.research_media("script-1", "vo-1").unwrap();
    match forge.await_job(&job.id).unwrap_err() {
        VideoForgeError::StageFailed { stage, message, .. } => {
            assert_eq!(stage, JobStage::Media);
            assert!(message.contains("429"), "{}", message);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(forge.timeline("script-1").unwrap().is_none());
    forge.shutdown();
}

#[test]
fn approved_script_sections_are_locked() {
    let harness = TestHarness::new();
    harness.seed_chain();
    let forge = harness.forge(fakes::tools("", Vec::new(), 100.0).toolset);

    let err = forge
        .update_script(
            "script-1",
            ScriptUpdate {
                sections: Some(vec![Section::new(SectionKind::Hook, "New hook")]),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        VideoForgeError::Artifact(ArtifactError::ScriptLocked(_))
    ));

    let script = forge
        .update_script(
            "script-1",
            ScriptUpdate {
                sections: Some(vec![
                    Section::new(SectionKind::Hook, "New hook"),
                    Section::new(SectionKind::Outro, "New outro"),
                ]),
                approved: Some(false),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(!script.approved);
    assert!(matches!(
        forge.generate_voice_over("script-1", VoicePreferences::default()),
        Err(VideoForgeError::Artifact(ArtifactError::ScriptNotApproved(_)))
    ));
    forge.shutdown();
}

#[test]
fn full_pipeline_from_story_to_video() {
    let harness = TestHarness::new();
    harness.seed_story("story-1");
    let tools = fakes::tools(
        fakes::SCRIPT_JSON,
        vec![
            fakes::clip("wide", 12.0, &["coral", "reef"]),
            fakes::clip("close", 80.0, &["coral", "algae", "reefs"]),
        ],
        30.0,
    );
    let forge = harness.forge(tools.toolset);

    let run = forge
        .run_pipeline(
            "story-1",
            RunOptions {
                auto_approve: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(run.halted, None);

    let video = run.final_video().unwrap();
    assert_eq!(video.title, "Reefs in Peril");
    assert_eq!(video.duration, 30.0);
    assert_eq!(video.segments.len(), 3);
    assert!(std::path::Path::new(&video.asset_ref).exists());

    let stages: Vec<JobStage> = forge
        .jobs("story-1")
        .unwrap()
        .into_iter()
        .map(|j| j.stage)
        .collect();
    assert!(stages.contains(&JobStage::Story));
    assert!(stages.contains(&JobStage::Script));
    forge.shutdown();
}

#[test]
fn pipeline_halts_on_unresolved_segments() {
    let harness = TestHarness::new();
    harness.seed_story("story-1");
    let forge = harness.forge(fakes::tools(fakes::SCRIPT_JSON, Vec::new(), 30.0).toolset);

    let run = forge
        .run_pipeline(
            "story-1",
            RunOptions {
                auto_approve: true,
                ..Default::default()
            },
        )
        .unwrap();
    match &run.halted {
        Some(Halt::UnresolvedSegments { segment_ids, .. }) => assert_eq!(segment_ids.len(), 3),
        other => panic!("unexpected halt: {other:?}"),
    }
    assert!(run.final_video().is_none());
    assert!(forge.list_final_videos("story-1").unwrap().is_empty());
    forge.shutdown();
}

#[test]
fn queued_media_job_fails_once_script_is_edited() {
    let harness = TestHarness::new();
    harness.seed_chain();
    let tools = fakes::tools("", vec![fakes::clip("reef", 60.0, &["coral"])], 100.0);
    let forge = harness.forge(tools.toolset);

    forge
        .update_script(
            "script-1",
            ScriptUpdate {
                sections: Some(vec![
                    Section::new(SectionKind::Hook, "a".repeat(10)),
                    Section::new(SectionKind::Outro, "b".repeat(990)),
                ]),
                approved: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    // Submitted directly, as a job queued before the edit would be.
    let job = forge
        .submit(
            "script-1",
            StageRequest::Media {
                voice_over_id: "vo-1".to_string(),
            },
        )
        .unwrap();
    match forge.await_job(&job.id).unwrap_err() {
        VideoForgeError::StageFailed { stage, message, .. } => {
            assert_eq!(stage, JobStage::Media);
            assert!(message.contains("must be approved"), "{}", message);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(forge.timeline("script-1").unwrap().is_none());
    assert_eq!(tools.search.call_count(), 0);
    forge.shutdown();
}

#[test]
fn muxer_failure_leaves_no_final_video() {
    let harness = TestHarness::new();
    harness.seed_chain();
    let mut tools = fakes::tools("", vec![fakes::clip("reef", 60.0, &["coral"])], 100.0);
    let muxer = Arc::new(fakes::FakeMuxer::failing());
    tools.toolset.muxer = muxer.clone();
    let forge = harness.forge(tools.toolset);

    let job = forge.research_media("script-1", "vo-1").unwrap();
    forge.await_job(&job.id).unwrap();
    let job = forge.assemble("script-1", "vo-1", &[]).unwrap();
    match forge.await_job(&job.id).unwrap_err() {
        VideoForgeError::StageFailed { stage, message, .. } => {
            assert_eq!(stage, JobStage::Video);
            assert!(message.starts_with("Video stage"), "{}", message);
            assert!(!message.contains(harness.data_dir.to_str().unwrap()), "{}", message);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(muxer.requests.lock().unwrap().len(), 1);
    assert!(forge.list_final_videos("story-1").unwrap().is_empty());
    forge.shutdown();
}
