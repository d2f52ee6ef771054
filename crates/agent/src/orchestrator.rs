//! The per-session conversation orchestrator.

use marquee_core::error::Error;
use marquee_core::message::{Conversation, Message};
use marquee_core::provider::{Provider, ProviderRequest};
use marquee_dispatch::Dispatcher;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// The assistant's default persona.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a movie guru. You don't provide awkward \
qualifiers like, \"According to TMDB API...\" because no one talks like that and you should \
speak as if you already know what you know.";

/// Owns one conversation and processes it turn by turn.
///
/// Exactly one turn runs at a time; the transcript is only touched by
/// the running turn.
pub struct Orchestrator {
    conversation: Conversation,
    provider: Arc<dyn Provider>,
    dispatcher: Dispatcher,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    token_sink: Option<mpsc::Sender<String>>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: Dispatcher,
        model: impl Into<String>,
    ) -> Self {
        let mut conversation = Conversation::new();
        conversation.push(Message::system(DEFAULT_SYSTEM_PROMPT));

        Self {
            conversation,
            provider,
            dispatcher,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            token_sink: None,
        }
    }

    /// Replace the persona prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.conversation.messages[0] = Message::system(prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Forward answer tokens as they stream in (e.g. to a terminal).
    pub fn with_token_sink(mut self, sink: mpsc::Sender<String>) -> Self {
        self.token_sink = Some(sink);
        self
    }

    /// The transcript so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Process one user turn and return the assistant's full reply.
    ///
    /// Dispatch failures degrade silently — the reply is generated
    /// without grounding context. Provider failures on the final answer
    /// are real errors.
    pub async fn respond(&mut self, user_text: &str) -> Result<String, Error> {
        info!(
            conversation_id = %self.conversation.id,
            turn = self.conversation.messages.len(),
            "Processing user turn"
        );

        self.conversation.push(Message::user(user_text));

        if let Some(context) = self.dispatcher.dispatch(&self.conversation).await {
            debug!(bytes = context.len(), "Injecting function context");
            self.conversation.push(Message::system(context));
        } else {
            debug!("No function context for this turn");
        }

        let request = ProviderRequest {
            model: self.model.clone(),
            messages: self.conversation.messages.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let mut rx = self.provider.stream(request).await?;
        let mut reply = String::new();

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(content) = chunk.content {
                reply.push_str(&content);
                if let Some(sink) = &self.token_sink {
                    // Receiver gone means no one is watching; keep going.
                    let _ = sink.send(content).await;
                }
            }
            if chunk.done {
                break;
            }
        }

        self.conversation.push(Message::assistant(&reply));
        Ok(reply)
    }
}
