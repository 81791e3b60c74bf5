use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;

use crate::{error::PipelineError, models::Meal};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MealPlanOutput {
    meal_plan: Vec<Meal>,
}

/// Parses the model's final answer and enforces the plan invariants.
pub fn parse_meal_plan(text: &str, expected: usize) -> Result<Vec<Meal>, PipelineError> {
    let output: MealPlanOutput = serde_json::from_str(extract_json(text)).map_err(|e| {
        PipelineError::GenerationFailed(format!("final answer is not a valid meal plan: {e}"))
    })?;
    validate_meals(&output.meal_plan, expected)?;
    Ok(output.meal_plan)
}

// Models like to wrap JSON in a ```json fence even when told not to.
fn extract_json(text: &str) -> &str {
    lazy_static! {
        static ref FENCED: Regex = Regex::new(r"(?s)```(?i:json)?\s*(.*?)\s*```").unwrap();
    }
    FENCED
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or_else(|| text.trim())
}

pub fn validate_meals(meals: &[Meal], expected: usize) -> Result<(), PipelineError> {
    if meals.len() != expected {
        return Err(PipelineError::GenerationFailed(format!(
            "expected {expected} meals, got {}",
            meals.len()
        )));
    }

    let mut seen = HashSet::with_capacity(meals.len());
    for meal in meals {
        let key = meal.name.trim().to_lowercase();
        if key.is_empty() {
            return Err(PipelineError::GenerationFailed(
                "meal with an empty name".into(),
            ));
        }
        if !seen.insert(key) {
            return Err(PipelineError::GenerationFailed(format!(
                "meal `{}` appears more than once",
                meal.name.trim()
            )));
        }
        for (field, value) in [("imageUrl", &meal.image_url), ("sourceUrl", &meal.source_url)] {
            if let Some(value) = value {
                Url::parse(value).map_err(|e| {
                    PipelineError::GenerationFailed(format!(
                        "meal `{}` has an invalid {field} `{value}`: {e}",
                        meal.name
                    ))
                })?;
            }
        }
    }
    Ok(())
}
