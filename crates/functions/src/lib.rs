//! Movie function implementations for Marquee.
//!
//! Functions are what ground the assistant's answers: now-playing
//! listings and reviews from TMDB, showtimes from SerpAPI's Google
//! showtimes engine, and the two-phase ticket purchase.
//!
//! Every function returns a formatted text block, or a human-readable
//! "not found" string — both pass through to the conversation context
//! identically.

pub mod now_playing;
pub mod reviews;
pub mod showtimes;
pub mod ticket;

use marquee_config::AppConfig;
use marquee_core::error::FunctionError;
use marquee_core::function::{FunctionRegistry, FunctionSpec};
use std::sync::Arc;

pub use ticket::{PurchaseGateway, StubPurchaseGateway};

pub(crate) const HTTP_TIMEOUT_SECS: u64 = 30;

pub(crate) fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
}

/// Map a transport error onto the function error taxonomy.
pub(crate) fn http_error(name: &str, e: reqwest::Error) -> FunctionError {
    if e.is_timeout() {
        FunctionError::Timeout {
            name: name.to_string(),
            timeout_secs: HTTP_TIMEOUT_SECS,
        }
    } else {
        FunctionError::ExecutionFailed {
            name: name.to_string(),
            reason: e.to_string(),
        }
    }
}

/// Create the default function registry from configuration.
///
/// Registers all movie functions plus the spec of the `callback()`
/// pseudo-function, which the dispatch executor handles itself.
pub fn default_registry(config: &AppConfig) -> FunctionRegistry {
    let tmdb_token = config.tmdb.access_token.clone().unwrap_or_default();
    let serp_key = config.serpapi.api_key.clone().unwrap_or_default();

    let mut registry = FunctionRegistry::new();
    registry.register(Box::new(now_playing::NowPlayingFunction::new(&tmdb_token)));
    registry.register(Box::new(showtimes::ShowtimesFunction::new(&serp_key)));
    registry.register(Box::new(reviews::ReviewsFunction::new(&tmdb_token)));

    let gateway: Arc<dyn PurchaseGateway> = Arc::new(StubPurchaseGateway);
    registry.register(Box::new(ticket::ProposeTicketPurchase));
    registry.register(Box::new(ticket::ConfirmTicketPurchase::new(gateway)));

    registry.register_pseudo(FunctionSpec::new("callback", &[]));
    registry
}
