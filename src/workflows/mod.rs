pub mod matchers;
pub mod orchestrator;
pub mod renamer;
pub mod subtitle_match;
