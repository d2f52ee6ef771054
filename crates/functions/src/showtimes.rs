//! Showtime search via SerpAPI's Google showtimes engine.

use async_trait::async_trait;
use marquee_core::error::FunctionError;
use marquee_core::function::MovieFunction;
use serde::Deserialize;
use tracing::debug;

const SERPAPI_URL: &str = "https://serpapi.com/search.json";

pub struct ShowtimesFunction {
    api_key: String,
    client: reqwest::Client,
}

impl ShowtimesFunction {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: crate::default_client(),
        }
    }
}

#[async_trait]
impl MovieFunction for ShowtimesFunction {
    fn name(&self) -> &str {
        "get_showtimes"
    }

    fn parameters(&self) -> &[&str] {
        &["title", "location"]
    }

    fn description(&self) -> &str {
        "Look up showtimes for a movie title near a location (city name or zip code)."
    }

    async fn call(&self, args: &[String]) -> Result<String, FunctionError> {
        let [title, location] = args else {
            return Err(FunctionError::InvalidArguments(format!(
                "get_showtimes expects (title, location), got {} argument(s)",
                args.len()
            )));
        };

        debug!(%title, %location, "Searching showtimes");

        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("engine", "google"),
                ("q", &format!("showtimes for {title}")),
                ("location", location),
                ("google_domain", "google.com"),
                ("gl", "us"),
                ("hl", "en"),
            ])
            .send()
            .await
            .map_err(|e| crate::http_error("get_showtimes", e))?;

        let results: ShowtimesResponse =
            response
                .json()
                .await
                .map_err(|e| FunctionError::ExecutionFailed {
                    name: "get_showtimes".into(),
                    reason: format!("failed to parse SerpAPI response: {e}"),
                })?;

        Ok(format_showtimes(title, location, &results))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShowtimesResponse {
    #[serde(default)]
    showtimes: Vec<ShowtimesDay>,
}

#[derive(Debug, Deserialize)]
struct ShowtimesDay {
    #[serde(default)]
    day: Option<String>,
    #[serde(default)]
    theaters: Vec<Theater>,
}

#[derive(Debug, Deserialize)]
struct Theater {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    showing: Vec<Showing>,
}

#[derive(Debug, Deserialize)]
struct Showing {
    #[serde(default)]
    time: Vec<String>,
}

fn format_showtimes(title: &str, location: &str, results: &ShowtimesResponse) -> String {
    let Some(day) = results.showtimes.first() else {
        return format!("No showtimes found for {title} in {location}.");
    };

    let mut formatted = format!("Showtimes for {title} in {location}:\n\n");

    if let Some(theater) = day.theaters.first() {
        formatted.push_str(&format!(
            "**{}**\n",
            theater.name.as_deref().unwrap_or("Unknown Theater")
        ));
        formatted.push_str(&format!(
            "  {}:\n",
            day.day.as_deref().unwrap_or("Unknown Date")
        ));

        for showing in &theater.showing {
            for time in &showing.time {
                formatted.push_str(&format!("    - {time}\n"));
            }
        }
    }

    formatted.push('\n');
    formatted
}
