//! Artifact types passed between pipeline stages and persisted by the
//! repositories in `db`.

pub mod media;
pub mod script;
pub mod story;
pub mod video;
pub mod voice_over;

pub use media::{ClipQuery, MediaClip, Segment};
pub use script::{Script, ScriptOptions, ScriptStyle, ScriptUpdate, Section, SectionKind};
pub use story::{GeneratedStory, NewStory, Story};
pub use video::{FinalVideo, FinalVideoUpdate};
pub use voice_over::{VoiceOver, VoicePreferences, VoiceProfile, VoiceSettings};
