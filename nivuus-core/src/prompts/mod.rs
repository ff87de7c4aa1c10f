//! System prompt construction

pub mod system;

pub use system::{SYSTEM_PROMPT_TEMPLATE, render_system_prompt};
