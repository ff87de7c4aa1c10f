//! Terminal interaction
//!
//! The conversation loop only sees the [`UserInteraction`] trait; the console
//! implementation renders with `console` and prompts through `dialoguer`.

pub mod interaction;

pub use interaction::{ConsoleInteraction, LoopEvent, UserInteraction};
