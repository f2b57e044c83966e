//! The crate's fake tools, bundled with handles the assertions need.

#![allow(dead_code)]

use std::sync::Arc;

use videoforge::models::MediaClip;
use videoforge::Toolset;

pub use videoforge::test_support::fakes::*;

pub struct Tools {
    pub toolset: Toolset,
    pub search: Arc<FakeSearch>,
    pub muxer: Arc<FakeMuxer>,
}

/// Generator answering `generated`, a search returning `clips`, and
/// `duration` seconds of synthesized audio.
pub fn tools(generated: &str, clips: Vec<MediaClip>, duration: f64) -> Tools {
    let search = Arc::new(FakeSearch::with(clips));
    let muxer = Arc::new(FakeMuxer::default());
    let toolset = Toolset {
        generator: Arc::new(FakeGenerator::new(generated)),
        search: search.clone(),
        synthesizer: Arc::new(FakeSynthesizer::with_duration(duration)),
        downloader: Arc::new(FakeDownloader),
        muxer: muxer.clone(),
    };
    Tools {
        toolset,
        search,
        muxer,
    }
}
