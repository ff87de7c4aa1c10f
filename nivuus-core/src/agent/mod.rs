//! Conversation orchestration: the loop, its shared session and the helpers it
//! uses to talk to the user

pub mod choices;
pub mod memory_summary;
pub mod runloop;
pub mod session;

pub use choices::parse_numbered_choices;
pub use memory_summary::build_memory_summary;
pub use runloop::{
    ConversationLoop, ExitReason, LoopSettings, LoopState, initial_state, prepare_transcript,
    retry_delay, rollback_to_last_user,
};
pub use session::{FlushReport, Session, SessionState};
