//! Movie reviews from TMDB.

use async_trait::async_trait;
use marquee_core::error::FunctionError;
use marquee_core::function::MovieFunction;
use serde::Deserialize;
use tracing::debug;

pub struct ReviewsFunction {
    access_token: String,
    client: reqwest::Client,
}

impl ReviewsFunction {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            client: crate::default_client(),
        }
    }
}

#[async_trait]
impl MovieFunction for ReviewsFunction {
    fn name(&self) -> &str {
        "get_reviews"
    }

    fn parameters(&self) -> &[&str] {
        &["movie_id"]
    }

    fn description(&self) -> &str {
        "Fetch audience reviews for a movie by its TMDB movie id."
    }

    async fn call(&self, args: &[String]) -> Result<String, FunctionError> {
        let [movie_id] = args else {
            return Err(FunctionError::InvalidArguments(format!(
                "get_reviews expects (movie_id), got {} argument(s)",
                args.len()
            )));
        };

        debug!(%movie_id, "Fetching reviews from TMDB");

        let url = format!(
            "https://api.themoviedb.org/3/movie/{movie_id}/reviews?language=en-US&page=1"
        );

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await
            .map_err(|e| crate::http_error("get_reviews", e))?;

        let reviews: ReviewsResponse =
            response
                .json()
                .await
                .map_err(|e| FunctionError::ExecutionFailed {
                    name: "get_reviews".into(),
                    reason: format!("failed to parse TMDB response: {e}"),
                })?;

        Ok(format_reviews(&reviews))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewsResponse {
    #[serde(default)]
    results: Vec<Review>,
}

#[derive(Debug, Deserialize)]
struct Review {
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    author_details: AuthorDetails,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct AuthorDetails {
    #[serde(default)]
    rating: Option<f64>,
}

fn format_reviews(reviews: &ReviewsResponse) -> String {
    if reviews.results.is_empty() {
        return "No reviews found.".to_string();
    }

    let mut formatted = String::new();
    for review in &reviews.results {
        formatted.push_str(&format!(
            "**Author:** {}\n**Rating:** {}\n**Content:** {}\n**Created At:** {}\n**URL:** {}\n\
             ----------------------------------------\n",
            review.author.as_deref().unwrap_or("N/A"),
            review
                .author_details
                .rating
                .map(|r| r.to_string())
                .unwrap_or_else(|| "N/A".into()),
            review.content.as_deref().unwrap_or("N/A"),
            review.created_at.as_deref().unwrap_or("N/A"),
            review.url.as_deref().unwrap_or("N/A"),
        ));
    }

    formatted
}
