//! Skills loader and parser.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{Skill, SkillMetadata};
use crate::error::{PicoError, Result};

const SKILL_FILE: &str = "SKILL.md";

/// Discover, load and author markdown skills under `<workspace>/skills`.
#[derive(Debug, Clone)]
pub struct SkillsLoader {
    skills_dir: PathBuf,
}

impl SkillsLoader {
    /// Create a loader for the given workspace.
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            skills_dir: workspace.as_ref().join("skills"),
        }
    }

    /// Skill directory.
    pub fn skills_dir(&self) -> &Path {
        &self.skills_dir
    }

    /// List skills that carry valid frontmatter, sorted by name.
    ///
    /// A missing skills directory yields an empty list; skills whose
    /// frontmatter cannot be parsed are skipped.
    pub fn list_skills(&self) -> Result<Vec<SkillMetadata>> {
        let entries = match std::fs::read_dir(&self.skills_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let skill_file = path.join(SKILL_FILE);
            let Ok(raw) = std::fs::read_to_string(&skill_file) else {
                continue;
            };
            match parse_frontmatter(&raw) {
                Some((meta, _)) => out.push(meta),
                None => debug!(path = %skill_file.display(), "Skipping skill with invalid frontmatter"),
            }
        }

        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    /// Load one skill by name.
    pub fn load_skill(&self, name: &str) -> Result<Skill> {
        validate_skill_name(name)?;
        let path = self.skills_dir.join(name).join(SKILL_FILE);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| PicoError::Tool(format!("skill '{}' not found: {}", name, e)))?;

        let (meta, body) =
            parse_frontmatter(&raw).unwrap_or_else(|| (SkillMetadata::default(), raw.clone()));
        let name = if meta.name.is_empty() {
            name.to_string()
        } else {
            meta.name
        };

        Ok(Skill {
            name,
            description: meta.description,
            path: path.to_string_lossy().to_string(),
            content: body,
            raw,
        })
    }

    /// Create (or overwrite) a skill with frontmatter and markdown body.
    pub fn create_skill(&self, name: &str, description: &str, content: &str) -> Result<PathBuf> {
        let name = name.trim();
        validate_skill_name(name)?;

        let dir = self.skills_dir.join(name);
        std::fs::create_dir_all(&dir)?;

        let meta = SkillMetadata {
            name: name.to_string(),
            description: description.to_string(),
        };
        let frontmatter = serde_yaml::to_string(&meta)
            .map_err(|e| PicoError::Tool(format!("invalid skill metadata: {}", e)))?;

        let path = dir.join(SKILL_FILE);
        let full = format!("---\n{}---\n\n{}", frontmatter, content);
        std::fs::write(&path, full)?;
        Ok(path)
    }

    /// Remove a skill directory. Removing a missing skill is not an error.
    pub fn delete_skill(&self, name: &str) -> Result<()> {
        validate_skill_name(name)?;
        let dir = self.skills_dir.join(name);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Build summary XML block for prompt context. Empty when no skills exist.
    pub fn build_skills_summary(&self) -> String {
        let skills = match self.list_skills() {
            Ok(skills) if !skills.is_empty() => skills,
            _ => return String::new(),
        };

        let mut lines = vec!["<skills>".to_string()];
        for skill in skills {
            lines.push("  <skill>".to_string());
            lines.push(format!("    <name>{}</name>", escape_xml(&skill.name)));
            lines.push(format!(
                "    <description>{}</description>",
                escape_xml(&skill.description)
            ));
            lines.push("  </skill>".to_string());
        }
        lines.push("</skills>".to_string());
        lines.join("\n")
    }
}

/// Reject skill names that could address anything outside their own directory.
pub fn validate_skill_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PicoError::Tool("skill name is required".into()));
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(PicoError::Tool(format!("invalid skill name: {}", name)));
    }
    Ok(())
}

/// Split `---` delimited YAML frontmatter from the body.
///
/// Returns `None` when the delimiters are missing, the YAML does not parse,
/// or no name is declared.
fn parse_frontmatter(content: &str) -> Option<(SkillMetadata, String)> {
    let mut lines = content.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }

    let mut frontmatter = Vec::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        frontmatter.push(line);
    }
    if !closed {
        return None;
    }

    let meta = match serde_yaml::from_str::<SkillMetadata>(&frontmatter.join("\n")) {
        Ok(meta) => meta,
        Err(e) => {
            debug!(error = %e, "Failed to parse skill frontmatter");
            return None;
        }
    };
    if meta.name.trim().is_empty() {
        return None;
    }

    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    Some((meta, body))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
