//! Conversation orchestration for Marquee.
//!
//! The orchestrator owns the transcript and runs one turn at a time:
//! dispatch the user's message through the function pipeline, inject the
//! returned context as a system message, then stream the final answer.

pub mod orchestrator;

pub use orchestrator::{DEFAULT_SYSTEM_PROMPT, Orchestrator};
