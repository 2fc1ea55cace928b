//! Skills system - markdown skill discovery, loading and authoring.

mod loader;
mod types;

pub use loader::{validate_skill_name, SkillsLoader};
pub use types::{Skill, SkillMetadata};
