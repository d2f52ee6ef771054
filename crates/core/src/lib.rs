//! # Marquee Core
//!
//! Domain types, traits, and error definitions for the Marquee movie
//! assistant. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in
//! their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod function;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, FunctionError, ProviderError, Result};
pub use function::{FunctionRegistry, FunctionSpec, MovieFunction};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
