use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use super::dto::MealDbSearchResponse;
use crate::{config::RecipeSearchConfig, error::PipelineError, models::Recipe};

/// Recipe lookup exposed to the model as a tool. Implementations hold no
/// per-request state and may be called concurrently.
#[async_trait]
pub trait RecipeSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Recipe>, PipelineError>;
}

/// TheMealDB `search.php` client.
#[derive(Clone)]
pub struct MealDbClient {
    client: Client,
    base_url: String,
    max_results: usize,
}

impl MealDbClient {
    pub fn new(client: Client, cfg: &RecipeSearchConfig) -> Self {
        Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            max_results: cfg.max_results,
        }
    }
}

#[async_trait]
impl RecipeSearch for MealDbClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Recipe>, PipelineError> {
        let url = format!("{}/search.php", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("s", query)])
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "recipe search request failed");
                PipelineError::UpstreamUnavailable(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "recipe search returned an error status");
            return Err(PipelineError::UpstreamUnavailable(format!(
                "recipe search returned {status}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            PipelineError::UpstreamUnavailable(format!("failed to read response: {e}"))
        })?;

        let recipes = parse_search_body(&body, self.max_results);
        debug!(count = recipes.len(), "recipe search finished");
        Ok(recipes)
    }
}

/// Untrusted body -> at most `max_results` recipes in upstream order. Any
/// schema mismatch degrades to an empty list.
pub(crate) fn parse_search_body(body: &[u8], max_results: usize) -> Vec<Recipe> {
    let parsed: MealDbSearchResponse = match serde_json::from_slice(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "recipe search response failed validation");
            return Vec::new();
        }
    };

    let Some(meals) = parsed.meals else {
        debug!("recipe search found no meals");
        return Vec::new();
    };

    match meals
        .into_iter()
        .map(|m| m.into_recipe())
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(mut recipes) => {
            recipes.truncate(max_results);
            recipes
        }
        Err(e) => {
            warn!(error = %e, "recipe search response failed validation");
            Vec::new()
        }
    }
}
