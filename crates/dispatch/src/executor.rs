//! Call executor and context accumulator.
//!
//! Executes a validated call list in order against the registry,
//! concatenating each call's textual result into one accumulated context
//! string for the turn. The `callback()` pseudo-call re-enters the whole
//! pipeline: the model is shown the context gathered so far and asked to
//! decide the next function(s), and the nested result is spliced back
//! into the outer accumulation.

use crate::detector::detect_missing;
use crate::parser::{CALLBACK_FUNCTION, ParseError, parse_completion};
use crate::prompt::{render_transcript, routing_prompt};
use futures::future::BoxFuture;
use marquee_core::error::ProviderError;
use marquee_core::function::FunctionRegistry;
use marquee_core::message::{Conversation, Message};
use marquee_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors internal to one dispatch turn. Never escape [`Dispatcher::dispatch`];
/// any of these degrades the turn to "no context".
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Per-turn dispatch state: the routing message history and the current
/// callback recursion depth. One instance per turn, passed through every
/// pipeline stage — nothing leaks across turns or sessions.
struct TurnState {
    history: Vec<Message>,
    depth: u32,
}

/// The function-dispatch pipeline entry point.
pub struct Dispatcher {
    provider: Arc<dyn Provider>,
    registry: Arc<FunctionRegistry>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_callback_depth: u32,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<FunctionRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            registry,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            max_callback_depth: 4,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Bound the callback recursion; past it the turn fails closed with
    /// a request for a more specific question instead of looping.
    pub fn with_max_callback_depth(mut self, max: u32) -> Self {
        self.max_callback_depth = max;
        self
    }

    /// Run one full dispatch turn over the conversation.
    ///
    /// Returns the accumulated context to inject as a system message, or
    /// `None` when there is nothing to inject — either because the model
    /// decided no function call is needed, or because something in the
    /// pipeline failed and the turn degrades. Failures never escape:
    /// the caller proceeds to answer without grounding context.
    pub async fn dispatch(&self, conversation: &Conversation) -> Option<String> {
        let mut state = TurnState {
            history: vec![
                Message::system(routing_prompt(&self.registry)),
                Message::system(render_transcript(conversation)),
            ],
            depth: 0,
        };

        let completion = match self.request_plan(&state).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Routing request failed; turn proceeds without context");
                return None;
            }
        };

        match self.run_plan(&mut state, completion).await {
            Ok(context) if context.is_empty() => {
                debug!("No function context gathered this turn");
                None
            }
            Ok(context) => Some(context),
            Err(e) => {
                warn!(error = %e, "Dispatch failed; turn proceeds without context");
                None
            }
        }
    }

    /// One routing round-trip: ask the model which function(s) to call.
    async fn request_plan(&self, state: &TurnState) -> Result<String, DispatchError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: state.history.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }

    /// Parse a routing completion and execute its plan, recursing into
    /// callback follow-ups. Returns the context accumulated by this plan
    /// (and everything nested under it).
    fn run_plan<'a>(
        &'a self,
        state: &'a mut TurnState,
        completion: String,
    ) -> BoxFuture<'a, Result<String, DispatchError>> {
        Box::pin(async move {
            state.history.push(Message::assistant(&completion));

            let calls = parse_completion(&completion)?;
            if calls.is_empty() {
                debug!("Model requested no function calls");
                return Ok(String::new());
            }

            info!(count = calls.len(), "Functions to call");

            // All-or-nothing: if anything in the batch needs more input,
            // nothing executes and the clarification becomes the context.
            if let Some(clarification) = detect_missing(&calls, &self.registry) {
                info!("Batch incomplete; requesting clarification from the user");
                return Ok(clarification);
            }

            let mut context = String::new();

            for call in &calls {
                if call.name == CALLBACK_FUNCTION {
                    if context.is_empty() {
                        debug!("No context gathered yet; ignoring callback request");
                        continue;
                    }

                    if state.depth >= self.max_callback_depth {
                        warn!(
                            depth = state.depth,
                            "Callback depth limit reached; failing closed"
                        );
                        push_line(
                            &mut context,
                            "The lookup chain went too deep without resolving. \
                             Ask the user for a more specific request.",
                        );
                        continue;
                    }

                    state.depth += 1;
                    debug!(depth = state.depth, "Invoking callback with gathered context");
                    state.history.push(Message::system(format!(
                        "Here's the requested callback with additional information: {context}\n\n\
                         Please use this information to decide the next function(s) to call."
                    )));

                    let follow_up = self.request_plan(state).await?;
                    let nested = self.run_plan(state, follow_up).await?;
                    context.push_str(&nested);
                    continue;
                }

                // The detector guarantees no placeholders at this point.
                let Some(args) = call
                    .args
                    .iter()
                    .map(|a| a.as_literal().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                else {
                    continue;
                };

                let Some(function) = self.registry.resolve(&call.name) else {
                    warn!(function = %call.name, "Model requested an unknown function; skipping");
                    continue;
                };

                debug!(function = %call.name, "Executing function");

                match function.call(&args).await {
                    Ok(result) => push_line(&mut context, &result),
                    Err(e) => {
                        // One failing lookup doesn't abort the batch; the
                        // other calls still contribute their context.
                        warn!(function = %call.name, error = %e, "Function execution failed");
                        push_line(
                            &mut context,
                            &format!("No result from {} right now.", call.name),
                        );
                    }
                }
            }

            Ok(context)
        })
    }
}

/// Append a result block, keeping blocks newline-separated.
fn push_line(context: &mut String, text: &str) {
    context.push_str(text);
    if !text.ends_with('\n') {
        context.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use marquee_core::error::FunctionError;
    use marquee_core::function::{FunctionSpec, MovieFunction};
    use marquee_core::provider::ProviderResponse;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A provider that replays scripted routing completions in order.
    struct ScriptedProvider {
        completions: Mutex<Vec<String>>,
        requests: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(completions: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                completions: Mutex::new(completions.iter().rev().map(|s| s.to_string()).collect()),
                requests: AtomicUsize::new(0),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let completion = self
                .completions
                .lock()
                .unwrap()
                .pop()
                .expect("scripted provider ran out of completions");
            Ok(ProviderResponse {
                message: Message::assistant(completion),
                usage: None,
                model: "scripted".into(),
            })
        }
    }

    /// A function stub that records invocations and returns fixed text.
    struct StubFunction {
        name: &'static str,
        parameters: &'static [&'static str],
        output: &'static str,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl StubFunction {
        fn new(name: &'static str, parameters: &'static [&'static str], output: &'static str) -> Self {
            Self {
                name,
                parameters,
                output,
                calls: Arc::new(AtomicUsize::new(0)),
                fail: false,
            }
        }

        fn failing(name: &'static str) -> Self {
            Self {
                name,
                parameters: &[],
                output: "",
                calls: Arc::new(AtomicUsize::new(0)),
                fail: true,
            }
        }

        fn counter(&self) -> Arc<AtomicUsize> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl MovieFunction for StubFunction {
        fn name(&self) -> &str {
            self.name
        }
        fn parameters(&self) -> &[&str] {
            self.parameters
        }
        fn description(&self) -> &str {
            "stub"
        }
        async fn call(&self, _args: &[String]) -> Result<String, FunctionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FunctionError::ExecutionFailed {
                    name: self.name.to_string(),
                    reason: "stub failure".into(),
                });
            }
            Ok(self.output.to_string())
        }
    }

    fn registry_with(functions: Vec<StubFunction>) -> Arc<FunctionRegistry> {
        let mut registry = FunctionRegistry::new();
        for f in functions {
            registry.register(Box::new(f));
        }
        registry.register_pseudo(FunctionSpec::new("callback", &[]));
        Arc::new(registry)
    }

    fn conversation() -> Conversation {
        let mut conv = Conversation::new();
        conv.push(Message::user("what's playing and where?"));
        conv
    }

    #[tokio::test]
    async fn executes_calls_in_order_and_accumulates() {
        let provider =
            ScriptedProvider::new(&[r#"{"functions": ["now_playing()", "top_pick()"]}"#]);
        let registry = registry_with(vec![
            StubFunction::new("now_playing", &[], "Dune is playing."),
            StubFunction::new("top_pick", &[], "Critics pick: Dune."),
        ]);

        let dispatcher = Dispatcher::new(provider.clone(), registry, "test-model");
        let context = dispatcher.dispatch(&conversation()).await.unwrap();

        assert_eq!(context, "Dune is playing.\nCritics pick: Dune.\n");
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn empty_plan_yields_no_context() {
        let provider = ScriptedProvider::new(&[r#"{"functions": []}"#]);
        let registry = registry_with(vec![]);

        let dispatcher = Dispatcher::new(provider.clone(), registry, "test-model");
        assert!(dispatcher.dispatch(&conversation()).await.is_none());
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn malformed_completion_degrades_turn() {
        let provider = ScriptedProvider::new(&["Sure! I'd call get_now_playing_movies."]);
        let registry = registry_with(vec![]);

        let dispatcher = Dispatcher::new(provider, registry, "test-model");
        assert!(dispatcher.dispatch(&conversation()).await.is_none());
    }

    #[tokio::test]
    async fn unknown_function_is_skipped() {
        let provider =
            ScriptedProvider::new(&[r#"{"functions": ["teleport('home')", "now_playing()"]}"#]);
        let registry = registry_with(vec![StubFunction::new("now_playing", &[], "Dune.")]);

        let dispatcher = Dispatcher::new(provider, registry, "test-model");
        let context = dispatcher.dispatch(&conversation()).await.unwrap();
        assert_eq!(context, "Dune.\n");
    }

    #[tokio::test]
    async fn placeholder_batch_executes_nothing() {
        let provider = ScriptedProvider::new(&[
            r#"{"functions": ["now_playing()", "showtimes('Dune', callback())"]}"#,
        ]);
        let now_playing = StubFunction::new("now_playing", &[], "Dune.");
        let showtimes = StubFunction::new("showtimes", &["title", "location"], "7pm");
        let np_calls = now_playing.counter();
        let st_calls = showtimes.counter();
        let registry = registry_with(vec![now_playing, showtimes]);

        let dispatcher = Dispatcher::new(provider, registry, "test-model");
        let context = dispatcher.dispatch(&conversation()).await.unwrap();

        assert!(context.contains("`location`"));
        assert_eq!(np_calls.load(Ordering::SeqCst), 0, "nothing may execute");
        assert_eq!(st_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_function_does_not_abort_batch() {
        let provider = ScriptedProvider::new(&[r#"{"functions": ["broken()", "now_playing()"]}"#]);
        let registry = registry_with(vec![
            StubFunction::failing("broken"),
            StubFunction::new("now_playing", &[], "Dune."),
        ]);

        let dispatcher = Dispatcher::new(provider, registry, "test-model");
        let context = dispatcher.dispatch(&conversation()).await.unwrap();

        assert!(context.contains("No result from broken"));
        assert!(context.contains("Dune."));
    }

    #[tokio::test]
    async fn callback_with_empty_context_is_noop() {
        let provider = ScriptedProvider::new(&[r#"{"functions": ["callback()"]}"#]);
        let registry = registry_with(vec![]);

        let dispatcher = Dispatcher::new(provider.clone(), registry, "test-model");
        assert!(dispatcher.dispatch(&conversation()).await.is_none());
        // No follow-up round-trip was issued.
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn callback_recursion_appends_after_prior_context() {
        let provider = ScriptedProvider::new(&[
            r#"{"functions": ["now_playing()", "callback()"]}"#,
            r#"{"functions": ["showtimes('Dune', '95112')"]}"#,
        ]);
        let registry = registry_with(vec![
            StubFunction::new("now_playing", &[], "Dune is playing."),
            StubFunction::new("showtimes", &["title", "location"], "Dune at 7pm."),
        ]);

        let dispatcher = Dispatcher::new(provider.clone(), registry, "test-model");
        let context = dispatcher.dispatch(&conversation()).await.unwrap();

        assert_eq!(context, "Dune is playing.\nDune at 7pm.\n");
        assert_eq!(provider.request_count(), 2, "exactly one follow-up");
    }

    #[tokio::test]
    async fn callback_depth_is_bounded() {
        let provider = ScriptedProvider::new(&[
            r#"{"functions": ["now_playing()", "callback()"]}"#,
            r#"{"functions": ["now_playing()", "callback()"]}"#,
        ]);
        let registry = registry_with(vec![StubFunction::new("now_playing", &[], "Dune.")]);

        let dispatcher =
            Dispatcher::new(provider.clone(), registry, "test-model").with_max_callback_depth(1);
        let context = dispatcher.dispatch(&conversation()).await.unwrap();

        assert!(context.contains("more specific request"));
        // Initial plan + one follow-up; the second callback fails closed.
        assert_eq!(provider.request_count(), 2);
    }

    #[tokio::test]
    async fn nested_clarification_splices_into_outer_context() {
        let provider = ScriptedProvider::new(&[
            r#"{"functions": ["now_playing()", "callback()"]}"#,
            r#"{"functions": ["showtimes('Dune', callback())"]}"#,
        ]);
        let registry = registry_with(vec![
            StubFunction::new("now_playing", &[], "Dune is playing."),
            StubFunction::new("showtimes", &["title", "location"], "Dune at 7pm."),
        ]);

        let dispatcher = Dispatcher::new(provider, registry, "test-model");
        let context = dispatcher.dispatch(&conversation()).await.unwrap();

        let playing = context.find("Dune is playing.").unwrap();
        let ask = context.find("`location`").unwrap();
        assert!(playing < ask, "nested result appended after prior context");
    }

    #[tokio::test]
    async fn malformed_follow_up_degrades_whole_turn() {
        let provider = ScriptedProvider::new(&[
            r#"{"functions": ["now_playing()", "callback()"]}"#,
            "let me think about that",
        ]);
        let registry = registry_with(vec![StubFunction::new("now_playing", &[], "Dune.")]);

        let dispatcher = Dispatcher::new(provider, registry, "test-model");
        assert!(dispatcher.dispatch(&conversation()).await.is_none());
    }
}
