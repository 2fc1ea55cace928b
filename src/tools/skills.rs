//! Skill management tools: create, list, read and delete workspace skills.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{PicoError, Result};
use crate::skills::SkillsLoader;

use super::{Tool, ToolContext};

fn required_string<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| PicoError::Tool(format!("{} (string) is required", key)))
}

fn name_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": description}
        },
        "required": ["name"]
    })
}

/// Create a new skill in the workspace skills directory.
pub struct CreateSkillTool {
    loader: SkillsLoader,
}

impl CreateSkillTool {
    pub fn new(loader: SkillsLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Tool for CreateSkillTool {
    fn name(&self) -> &str {
        "create_skill"
    }

    fn description(&self) -> &str {
        "Create a new skill in the skills directory with markdown content"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "The skill name (alphanumeric, no special chars)"},
                "description": {"type": "string", "description": "Brief description of what the skill does"},
                "content": {"type": "string", "description": "The markdown content for the skill (instructions, examples, etc.)"}
            },
            "required": ["name", "description", "content"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let name = required_string(&args, "name")?;
        let description = required_string(&args, "description")?;
        let content = required_string(&args, "content")?;

        self.loader.create_skill(name, description, content)?;
        Ok(format!("Skill '{}' created successfully", name.trim()))
    }
}

/// List available skills with their names and descriptions.
pub struct ListSkillsTool {
    loader: SkillsLoader,
}

impl ListSkillsTool {
    pub fn new(loader: SkillsLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Tool for ListSkillsTool {
    fn name(&self) -> &str {
        "list_skills"
    }

    fn description(&self) -> &str {
        "List all available skills with their names and descriptions"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<String> {
        let skills = self.loader.list_skills()?;
        if skills.is_empty() {
            return Ok("No skills found".to_string());
        }
        Ok(serde_json::to_string_pretty(&skills)?)
    }
}

/// Read a skill's full `SKILL.md`.
pub struct ReadSkillTool {
    loader: SkillsLoader,
}

impl ReadSkillTool {
    pub fn new(loader: SkillsLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Tool for ReadSkillTool {
    fn name(&self) -> &str {
        "read_skill"
    }

    fn description(&self) -> &str {
        "Read the full content of a skill by name"
    }

    fn parameters(&self) -> Value {
        name_schema("The name of the skill to read")
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let name = required_string(&args, "name")?;
        Ok(self.loader.load_skill(name)?.raw)
    }
}

/// Delete a skill directory.
pub struct DeleteSkillTool {
    loader: SkillsLoader,
}

impl DeleteSkillTool {
    pub fn new(loader: SkillsLoader) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl Tool for DeleteSkillTool {
    fn name(&self) -> &str {
        "delete_skill"
    }

    fn description(&self) -> &str {
        "Delete a skill from the skills directory"
    }

    fn parameters(&self) -> Value {
        name_schema("The name of the skill to delete")
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<String> {
        let name = required_string(&args, "name")?;
        self.loader.delete_skill(name)?;
        Ok(format!("Skill '{}' deleted successfully", name))
    }
}
