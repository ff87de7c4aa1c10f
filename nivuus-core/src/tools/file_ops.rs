//! File tools: confirmed writes, bounded reads, directory listings

use super::ToolOutput;
use crate::agent::session::Session;
use crate::config::constants::{action_types, messages};
use crate::memory::ActionStatus;
use crate::ui::UserInteraction;
use crate::utils::truncate_chars;
use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

const WRITE_PREVIEW_CHARS: usize = 200;

pub struct FileTools {
    session: Session,
    interaction: Arc<dyn UserInteraction>,
    max_read_bytes: usize,
}

impl FileTools {
    pub fn new(
        session: Session,
        interaction: Arc<dyn UserInteraction>,
        max_read_bytes: usize,
    ) -> Self {
        Self {
            session,
            interaction,
            max_read_bytes,
        }
    }

    /// Read a file, cutting it at `max_read_bytes`
    pub async fn read_file(&self, filepath: &str) -> Result<ToolOutput> {
        let path = Path::new(filepath);
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {filepath}"))?;
        let size = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {filepath}"))?
            .len();

        let mut bytes = Vec::new();
        file.take(self.max_read_bytes as u64)
            .read_to_end(&mut bytes)
            .await
            .with_context(|| format!("Failed to read {filepath}"))?;

        let truncated = size > self.max_read_bytes as u64;
        // The cut may land inside a multi-byte character
        if truncated
            && let Err(err) = std::str::from_utf8(&bytes)
            && err.error_len().is_none()
        {
            bytes.truncate(err.valid_up_to());
        }
        let mut content = String::from_utf8_lossy(&bytes).into_owned();
        if truncated {
            content.push_str(&format!(
                "\n\n[File truncated: showing the first {} of {size} bytes]",
                bytes.len()
            ));
        }
        debug!(filepath, size, truncated, "file read");

        Ok(ToolOutput::success(json!({
            "filepath": filepath,
            "size": size,
            "truncated": truncated,
            "content": content,
        })))
    }

    /// Overwrite a file after the user confirms
    pub async fn write_file(&self, filepath: &str, content: &str) -> Result<ToolOutput> {
        let preview = truncate_chars(content, WRITE_PREVIEW_CHARS);
        let ellipsis = if preview.len() < content.len() { "..." } else { "" };
        let prompt = format!(
            "Write {} characters to {filepath}?\n{preview}{ellipsis}",
            content.chars().count()
        );
        let confirmed = self.interaction.confirm(&prompt).await.unwrap_or_else(|err| {
            warn!("Confirmation prompt failed, treating as declined: {err:#}");
            false
        });
        if !confirmed {
            self.session.record_action(
                action_types::FILE_WRITE,
                filepath,
                ActionStatus::Cancelled,
                None,
            );
            return Ok(ToolOutput::new(
                ActionStatus::Cancelled,
                json!({ "status": "cancelled", "message": messages::WRITE_CANCELLED }),
            ));
        }

        let path = Path::new(filepath);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {filepath}"))?;

        Ok(ToolOutput::success(json!({
            "filepath": filepath,
            "bytes_written": content.len(),
        })))
    }

    /// Sorted entry names, directories suffixed with `/`
    pub async fn list_directory(&self, dir: &str) -> Result<ToolOutput> {
        let mut reader = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to list {dir}"))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .with_context(|| format!("Failed to list {dir}"))?
        {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_dir())
                .unwrap_or(false);
            if is_dir {
                name.push('/');
            }
            entries.push(name);
        }
        entries.sort();

        Ok(ToolOutput::success(json!({
            "path": dir,
            "entries": entries,
        })))
    }
}
