use crate::config::constants::memory_paths::ROOT_SENTINELS;
use std::fmt;

/// A hierarchical memory address.
///
/// `system/info/os`, `system.info.os` and `/system/info/os/` all parse to the
/// same three segments. `""`, `"/"` and `"root"` address the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct MemoryPath {
    segments: Vec<String>,
}

impl MemoryPath {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if ROOT_SENTINELS.contains(&trimmed) {
            return Self::default();
        }

        let segments = trimmed
            .split(['/', '.'])
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for MemoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("root")
        } else {
            f.write_str(&self.segments.join("/"))
        }
    }
}
