use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    llm::{FunctionCall, FunctionDeclaration, FunctionResponse},
    recipes::RecipeSearch,
};

pub const SEARCH_RECIPES: &str = "searchRecipes";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

pub fn declarations() -> Vec<FunctionDeclaration> {
    vec![FunctionDeclaration {
        name: SEARCH_RECIPES.into(),
        description: "Search for recipes on TheMealDB. Can be used to find meals based on a \
                      query string such as a dish name or main ingredient."
            .into(),
        parameters: Some(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Free-text recipe search, e.g. \"Vegetarian Lasagna\""
                }
            },
            "required": ["query"]
        })),
    }]
}

/// Runs every call of one model turn concurrently. Failures become
/// `{"error": ...}` payloads so the model can try something else.
pub async fn execute_all(search: &dyn RecipeSearch, calls: &[FunctionCall]) -> Vec<FunctionResponse> {
    join_all(calls.iter().map(|call| execute(search, call))).await
}

async fn execute(search: &dyn RecipeSearch, call: &FunctionCall) -> FunctionResponse {
    let response = match call.name.as_str() {
        SEARCH_RECIPES => run_search(search, &call.args).await,
        other => {
            warn!(tool = %other, "model requested an unknown tool");
            json!({ "error": format!("unknown tool `{other}`; only `{SEARCH_RECIPES}` is available") })
        }
    };
    FunctionResponse {
        name: call.name.clone(),
        response,
    }
}

async fn run_search(search: &dyn RecipeSearch, args: &Value) -> Value {
    let query = match serde_json::from_value::<SearchArgs>(args.clone()) {
        Ok(SearchArgs { query }) if !query.trim().is_empty() => query,
        _ => {
            warn!(%args, "invalid searchRecipes arguments");
            return json!({ "error": "`query` must be a non-empty string" });
        }
    };

    match search.search(query.trim()).await {
        Ok(recipes) => {
            debug!(query = %query, count = recipes.len(), "tool search finished");
            json!({ "recipes": recipes })
        }
        Err(e) => {
            warn!(error = %e, query = %query, "tool search failed");
            json!({ "error": e.to_string() })
        }
    }
}
