//! Role-scoped workers of the generation pipeline.
//!
//! Each agent wraps one external tool and owns the translation between
//! artifacts and that tool's prompt or query. Parsing and ranking are
//! plain functions so they can be tested without a tool.

pub mod keywords;
pub mod media_curator;
pub mod media_researcher;
pub mod script_architect;
pub mod story_writer;
pub mod voice_selector;

pub use media_curator::MediaCurator;
pub use media_researcher::MediaResearcher;
pub use script_architect::{ScriptArchitect, ScriptDraft};
pub use story_writer::StoryWriter;
pub use voice_selector::VoiceSelector;
