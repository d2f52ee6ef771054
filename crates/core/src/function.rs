//! MovieFunction trait and registry — the catalog of callable operations.
//!
//! Functions are what ground the assistant's answers: now-playing
//! listings, showtimes, reviews, ticket purchase. Each takes positional
//! string arguments matching its spec and returns a formatted text block
//! (or a human-readable "not found" string — never a structured error).

use crate::error::FunctionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The static shape of a callable function: its name and ordered
/// parameter names. Defined once at process start, immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// The model-facing function name (e.g., "get_showtimes")
    pub name: String,

    /// Ordered parameter names (e.g., ["title", "location"])
    pub parameters: Vec<String>,
}

impl FunctionSpec {
    pub fn new(name: impl Into<String>, parameters: &[&str]) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Render the spec as a call signature, e.g. `get_showtimes(title, location)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameters.join(", "))
    }

    /// Number of parameters this function expects.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

/// The core MovieFunction trait.
///
/// Each lookup or action (now-playing, showtimes, reviews, ticket
/// purchase) implements this trait. Functions are registered in the
/// FunctionRegistry and invoked by the dispatch executor.
#[async_trait]
pub trait MovieFunction: Send + Sync {
    /// The unique model-facing name (e.g., "get_reviews").
    fn name(&self) -> &str;

    /// Ordered parameter names, matching positional call arguments.
    fn parameters(&self) -> &[&str];

    /// A description of what this function does (rendered into the
    /// function-routing prompt).
    fn description(&self) -> &str;

    /// Execute the function with positional string arguments.
    async fn call(&self, args: &[String]) -> std::result::Result<String, FunctionError>;

    /// Derive this function's spec.
    fn spec(&self) -> FunctionSpec {
        FunctionSpec::new(self.name(), self.parameters())
    }
}

/// A registry of callable functions.
///
/// The dispatch pipeline uses this to:
/// 1. Render the function-routing prompt from registered specs
/// 2. Annotate clarification requests with parameter names
/// 3. Look up and execute functions the model requests
///
/// Pure lookup — the registry has no side effects of its own.
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn MovieFunction>>,
    // Specs in registration order, so prompt rendering is stable.
    // Includes pseudo-function specs that never resolve to an implementation.
    specs: Vec<FunctionSpec>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            specs: Vec::new(),
        }
    }

    /// Register a function. Replaces any existing function with the same name.
    pub fn register(&mut self, function: Box<dyn MovieFunction>) {
        let spec = function.spec();
        self.specs.retain(|s| s.name != spec.name);
        self.specs.push(spec);
        self.functions.insert(function.name().to_string(), function);
    }

    /// Register a spec with no implementation behind it.
    ///
    /// Used for the `callback()` pseudo-function: it appears in the
    /// routing prompt but is handled by the executor, never resolved here.
    pub fn register_pseudo(&mut self, spec: FunctionSpec) {
        self.specs.retain(|s| s.name != spec.name);
        self.specs.push(spec);
    }

    /// Resolve a function implementation by name.
    pub fn resolve(&self, name: &str) -> Option<&dyn MovieFunction> {
        self.functions.get(name).map(|f| f.as_ref())
    }

    /// Look up the spec for a name (covers pseudo-functions too).
    pub fn spec(&self, name: &str) -> Option<&FunctionSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// All registered specs, in registration order.
    pub fn specs(&self) -> &[FunctionSpec] {
        &self.specs
    }

    /// Execute a function by name with positional arguments.
    pub async fn call(
        &self,
        name: &str,
        args: &[String],
    ) -> std::result::Result<String, FunctionError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| FunctionError::NotFound(name.to_string()))?;
        function.call(args).await
    }

    /// List all names with a real implementation.
    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test function for unit tests.
    struct EchoFunction;

    #[async_trait]
    impl MovieFunction for EchoFunction {
        fn name(&self) -> &str {
            "echo"
        }
        fn parameters(&self) -> &[&str] {
            &["text"]
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        async fn call(&self, args: &[String]) -> Result<String, FunctionError> {
            Ok(args.first().cloned().unwrap_or_default())
        }
    }

    #[test]
    fn spec_signature_rendering() {
        let spec = FunctionSpec::new("get_showtimes", &["title", "location"]);
        assert_eq!(spec.signature(), "get_showtimes(title, location)");
        assert_eq!(spec.arity(), 2);

        let nullary = FunctionSpec::new("get_now_playing_movies", &[]);
        assert_eq!(nullary.signature(), "get_now_playing_movies()");
    }

    #[test]
    fn registry_register_and_resolve() {
        let mut registry = FunctionRegistry::new();
        registry.register(Box::new(EchoFunction));
        assert!(registry.resolve("echo").is_some());
        assert!(registry.resolve("nonexistent").is_none());
    }

    #[test]
    fn pseudo_spec_never_resolves() {
        let mut registry = FunctionRegistry::new();
        registry.register_pseudo(FunctionSpec::new("callback", &[]));

        assert!(registry.resolve("callback").is_none());
        assert_eq!(registry.spec("callback").unwrap().signature(), "callback()");
    }

    #[test]
    fn specs_keep_registration_order() {
        let mut registry = FunctionRegistry::new();
        registry.register(Box::new(EchoFunction));
        registry.register_pseudo(FunctionSpec::new("callback", &[]));

        let names: Vec<_> = registry.specs().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["echo", "callback"]);
    }

    #[tokio::test]
    async fn registry_call_function() {
        let mut registry = FunctionRegistry::new();
        registry.register(Box::new(EchoFunction));

        let result = registry.call("echo", &["hello".to_string()]).await.unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn registry_call_missing_function() {
        let registry = FunctionRegistry::new();
        let err = registry.call("nonexistent", &[]).await.unwrap_err();
        assert!(matches!(err, FunctionError::NotFound(_)));
    }
}
