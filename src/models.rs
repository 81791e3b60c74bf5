use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const MIN_MEALS: i64 = 1;
pub const MAX_MEALS: i64 = 10;

/// What the caller asked for. Only constructible through [`MealPlanRequest::new`],
/// deserialization included, so a value in hand is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawMealPlanRequest")]
pub struct MealPlanRequest {
    dietary_restrictions: String,
    cuisine_preferences: String,
    number_of_meals: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMealPlanRequest {
    dietary_restrictions: String,
    cuisine_preferences: String,
    number_of_meals: i64,
}

impl TryFrom<RawMealPlanRequest> for MealPlanRequest {
    type Error = PipelineError;

    fn try_from(raw: RawMealPlanRequest) -> Result<Self, Self::Error> {
        Self::new(
            raw.dietary_restrictions,
            raw.cuisine_preferences,
            raw.number_of_meals,
        )
    }
}

impl MealPlanRequest {
    pub fn new(
        dietary_restrictions: impl Into<String>,
        cuisine_preferences: impl Into<String>,
        number_of_meals: i64,
    ) -> Result<Self, PipelineError> {
        let dietary_restrictions = dietary_restrictions.into().trim().to_string();
        let cuisine_preferences = cuisine_preferences.into().trim().to_string();

        let mut problems = Vec::new();
        if dietary_restrictions.is_empty() {
            problems.push(
                "dietaryRestrictions: Please specify at least one dietary preference or restriction.",
            );
        }
        if cuisine_preferences.is_empty() {
            problems.push("cuisinePreferences: Please specify at least one cuisine preference.");
        }
        if number_of_meals < MIN_MEALS {
            problems.push("numberOfMeals: Please select the number of meals.");
        } else if number_of_meals > MAX_MEALS {
            problems.push("numberOfMeals: Please select 10 or fewer meals.");
        }
        if !problems.is_empty() {
            return Err(PipelineError::InvalidRequest(problems.join("\n")));
        }

        Ok(Self {
            dietary_restrictions,
            cuisine_preferences,
            number_of_meals: number_of_meals as usize,
        })
    }

    pub fn dietary_restrictions(&self) -> &str {
        &self.dietary_restrictions
    }

    pub fn cuisine_preferences(&self) -> &str {
        &self.cuisine_preferences
    }

    pub fn number_of_meals(&self) -> usize {
        self.number_of_meals
    }
}

/// A recipe as returned by the search adapter, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// One entry of a generated plan: a recipe plus estimated nutrition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macros: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}
