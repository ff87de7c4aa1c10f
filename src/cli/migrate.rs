use anyhow::Result;
use console::style;
use nivuus_core::config::NivuusConfig;
use nivuus_core::memory::{MigrationOutcome, migrate_memory_file};

/// Handle the migrate-memory command
pub fn handle_migrate_memory_command(config: &NivuusConfig) -> Result<()> {
    let path = config.storage.memory_path();
    match migrate_memory_file(&path)? {
        MigrationOutcome::Migrated { backup } => {
            println!(
                "{} {}",
                style("Migrated").green().bold(),
                path.display()
            );
            println!("Original kept at {}", backup.display());
        }
        MigrationOutcome::AlreadyCurrent => {
            println!("{} is already in the current format", path.display());
        }
        MigrationOutcome::Missing => {
            println!("No memory file at {}", path.display());
        }
    }
    Ok(())
}
