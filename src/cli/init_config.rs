use anyhow::Result;
use console::style;
use nivuus_core::config::NivuusConfig;
use nivuus_core::config::constants::files;
use std::path::{Path, PathBuf};

/// Handle the init-config command
pub fn handle_init_config_command(workspace: &Path, output: Option<&Path>, force: bool) -> Result<()> {
    let output: PathBuf = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| workspace.join(files::CONFIG_FILE_NAME));

    NivuusConfig::create_sample_config(&output, force)?;
    println!(
        "{} {}",
        style("Configuration written to").green().bold(),
        output.display()
    );
    Ok(())
}
