//! Onboard command handler.

use anyhow::{Context, Result};

use picobot::config::Config;

/// Write the default config (if absent) and bootstrap the workspace.
pub(crate) fn cmd_onboard() -> Result<()> {
    let (config_path, workspace) =
        Config::onboard().with_context(|| "Failed to initialize picobot")?;

    println!("Config:    {}", config_path.display());
    println!("Workspace: {}", workspace.display());
    println!();
    println!("Next steps:");
    println!("  1. Set PICOBOT_OPENAI_API_KEY (or add providers.openai.api_key to the config)");
    println!("  2. Try it: picobot agent -m \"Hello\"");
    Ok(())
}
