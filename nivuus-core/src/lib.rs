//! # nivuus-core
//!
//! Conversation orchestration for a terminal system agent driven by an
//! OpenAI-compatible chat model with function calling.
//!
//! ## Architecture
//!
//! - **Conversation loop** ([`agent::ConversationLoop`]): alternates between the
//!   user, the model and the tools until the user quits
//! - **History hygiene** ([`history`]): every tool request reaches the model with
//!   its results, and long transcripts are folded into summaries
//! - **Tools** ([`tools`]): shell commands in their own process group with a hard
//!   timeout, file access, web search and memory access, all behind one dispatcher
//! - **Memory** ([`memory`]): a path-addressed JSON document with a bounded action log
//!
//! Transcript and memory live in one [`agent::Session`] that is persisted as
//! pretty-printed JSON and can be flushed synchronously from signal handlers.

pub mod agent;
pub mod config;
pub mod history;
pub mod llm;
pub mod memory;
pub mod prompts;
pub mod tools;
pub mod ui;
pub mod utils;

pub use agent::{ConversationLoop, ExitReason, LoopState, Session};
pub use config::{ConfigManager, NivuusConfig};
pub use llm::{LLMError, LLMProvider};
pub use memory::MemoryStore;
