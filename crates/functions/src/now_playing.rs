//! Now-playing listings from TMDB.

use async_trait::async_trait;
use marquee_core::error::FunctionError;
use marquee_core::function::MovieFunction;
use serde::Deserialize;
use tracing::debug;

const TMDB_NOW_PLAYING_URL: &str =
    "https://api.themoviedb.org/3/movie/now_playing?language=en-US&page=1";

pub struct NowPlayingFunction {
    access_token: String,
    client: reqwest::Client,
}

impl NowPlayingFunction {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            client: crate::default_client(),
        }
    }
}

#[async_trait]
impl MovieFunction for NowPlayingFunction {
    fn name(&self) -> &str {
        "get_now_playing_movies"
    }

    fn parameters(&self) -> &[&str] {
        &[]
    }

    fn description(&self) -> &str {
        "List movies currently playing in theaters, with their TMDB ids, release dates, and overviews."
    }

    async fn call(&self, _args: &[String]) -> Result<String, FunctionError> {
        debug!("Fetching now-playing movies from TMDB");

        let response = self
            .client
            .get(TMDB_NOW_PLAYING_URL)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await
            .map_err(|e| crate::http_error("get_now_playing_movies", e))?;

        let status = response.status();
        if !status.is_success() {
            // Informative text, not an error: the conversation degrades
            // gracefully and the model can tell the user.
            return Ok(format!(
                "Error fetching data: {} - {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ));
        }

        let listing: NowPlayingResponse =
            response
                .json()
                .await
                .map_err(|e| FunctionError::ExecutionFailed {
                    name: "get_now_playing_movies".into(),
                    reason: format!("failed to parse TMDB response: {e}"),
                })?;

        Ok(format_now_playing(&listing))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct NowPlayingResponse {
    #[serde(default)]
    results: Vec<MovieSummary>,
}

#[derive(Debug, Deserialize)]
struct MovieSummary {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    overview: Option<String>,
}

fn format_now_playing(listing: &NowPlayingResponse) -> String {
    if listing.results.is_empty() {
        return "No movies are currently playing.".to_string();
    }

    let mut formatted = String::from("The TMDb API returned these movies:\n\n");

    for movie in &listing.results {
        formatted.push_str(&format!(
            "**Title:** {}\n**Movie ID:** {}\n**Release Date:** {}\n**Overview:** {}\n\n",
            movie.title.as_deref().unwrap_or("N/A"),
            movie
                .id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "N/A".into()),
            movie.release_date.as_deref().unwrap_or("N/A"),
            movie.overview.as_deref().unwrap_or("N/A"),
        ));
    }

    formatted
}
