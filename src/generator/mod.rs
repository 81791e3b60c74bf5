mod output;
mod prompt;
mod tools;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument};

use crate::{
    error::PipelineError,
    llm::{ChatRequest, LlmClient, ModelReply, Turn},
    models::{Meal, MealPlanRequest},
    recipes::RecipeSearch,
};

/// Produces exactly `request.number_of_meals()` distinct meals, or fails.
#[async_trait]
pub trait MealPlanGenerator: Send + Sync {
    async fn generate(&self, request: &MealPlanRequest) -> Result<Vec<Meal>, PipelineError>;
}

/// Drives the model through search tool calls until it returns a final plan.
pub struct ToolAugmentedGenerator {
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn RecipeSearch>,
    max_iterations: usize,
    temperature: Option<f32>,
}

impl ToolAugmentedGenerator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn RecipeSearch>,
        max_iterations: usize,
        temperature: Option<f32>,
    ) -> Self {
        Self {
            llm,
            search,
            max_iterations,
            temperature,
        }
    }
}

#[async_trait]
impl MealPlanGenerator for ToolAugmentedGenerator {
    #[instrument(skip_all, fields(meals = request.number_of_meals()))]
    async fn generate(&self, request: &MealPlanRequest) -> Result<Vec<Meal>, PipelineError> {
        let tools = tools::declarations();
        let mut chat = ChatRequest::new(prompt::system_instruction()).with_temperature(self.temperature);
        chat.push(Turn::User(prompt::render(request)));

        let mut tool_calls = 0usize;
        for iteration in 0..self.max_iterations {
            let reply = self
                .llm
                .complete_with_tools(&chat, &tools)
                .await
                .map_err(|e| {
                    error!(error = %e, iteration, "model call failed");
                    PipelineError::GenerationFailed(e.to_string())
                })?;

            match reply {
                ModelReply::FunctionCalls(calls) => {
                    info!(iteration, count = calls.len(), "executing tool calls");
                    tool_calls += calls.len();
                    let responses = tools::execute_all(self.search.as_ref(), &calls).await;
                    chat.push(Turn::FunctionCalls(calls));
                    chat.push(Turn::FunctionResponses(responses));
                }
                ModelReply::Text(text) => {
                    let meals = output::parse_meal_plan(&text, request.number_of_meals())
                        .map_err(|e| {
                            error!(error = %e, "final answer rejected");
                            e
                        })?;
                    info!(
                        meals = meals.len(),
                        model_calls = iteration + 1,
                        tool_calls,
                        "meal plan generated"
                    );
                    return Ok(meals);
                }
            }
        }

        error!(max = self.max_iterations, tool_calls, "model never produced a final answer");
        Err(PipelineError::GenerationFailed(format!(
            "no final answer after {} model calls",
            self.max_iterations
        )))
    }
}
