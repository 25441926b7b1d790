//! Chat surface: answer orchestration and conversation history.

pub mod engine;
pub mod session;

pub use engine::{
    chat_prompt, dashboard_context, select_answer, AnswerOrchestrator, RemoteOutcome,
};
pub use session::{ChatMessage, ChatSession, Sender, GREETING};
