//! Transcript hygiene applied before every model call
//!
//! [`sanitize`] restores the request/result pairing the chat protocol demands and
//! [`HistoryCompactor`] keeps the transcript under its configured length.

pub mod compactor;
pub mod sanitizer;
pub mod summarizer;

pub use compactor::{HistoryCompactor, fallback_summary};
pub use sanitizer::sanitize;
pub use summarizer::{LLMSummarizer, Summarizer};
