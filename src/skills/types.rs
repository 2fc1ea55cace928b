//! Skills type definitions.

use serde::{Deserialize, Serialize};

/// Loaded skill model.
#[derive(Debug, Clone)]
pub struct Skill {
    /// Skill name.
    pub name: String,
    /// Short description.
    pub description: String,
    /// Absolute path to `SKILL.md`.
    pub path: String,
    /// Full file content, frontmatter included.
    pub raw: String,
    /// Markdown body content.
    pub content: String,
}

/// Frontmatter metadata, also the listing entry returned to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillMetadata {
    pub name: String,
    pub description: String,
}
