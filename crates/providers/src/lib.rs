//! LLM provider implementations for Marquee.
//!
//! The dispatch pipeline and the orchestrator talk to the
//! `marquee_core::Provider` trait; this crate supplies the real
//! OpenAI-compatible HTTP implementation.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use marquee_config::AppConfig;
use marquee_core::error::ProviderError;

/// Build the configured provider.
///
/// Fails with `NotConfigured` when no API key is available, so callers
/// can print setup instructions instead of failing on the first request.
pub fn build_from_config(config: &AppConfig) -> Result<OpenAiCompatProvider, ProviderError> {
    let api_key = config
        .openai
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("no OpenAI API key".into()))?;

    Ok(OpenAiCompatProvider::new(
        "openai",
        &config.openai.api_url,
        api_key,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_key_fails() {
        let config = AppConfig::default();
        let err = build_from_config(&config).unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn build_with_key_succeeds() {
        let mut config = AppConfig::default();
        config.openai.api_key = Some("sk-test".into());
        let provider = build_from_config(&config).unwrap();
        use marquee_core::Provider;
        assert_eq!(provider.name(), "openai");
    }
}
