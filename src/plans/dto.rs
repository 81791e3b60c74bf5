use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{MealPlanRow, SavedRecipeRow};
use crate::models::{Meal, MealPlanRequest};

/// POST /meal-plans body. Fields are optional here so that missing values
/// surface as validation messages rather than a JSON rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMealPlanBody {
    #[serde(default)]
    pub dietary_restrictions: String,
    #[serde(default)]
    pub cuisine_preferences: String,
    #[serde(default)]
    pub number_of_meals: i64,
    pub credential_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanResponse {
    pub meal_plan: Vec<Meal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanListItem {
    pub id: Uuid,
    pub request: MealPlanRequest,
    pub meal_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<MealPlanRow> for MealPlanListItem {
    fn from(row: MealPlanRow) -> Self {
        Self {
            id: row.id,
            meal_count: row.meals.0.len(),
            request: row.request.0,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanDetails {
    pub id: Uuid,
    pub request: MealPlanRequest,
    pub preferences: Value,
    pub meal_plan: Vec<Meal>,
    pub saved_recipes: Vec<SavedRecipeItem>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl MealPlanDetails {
    pub fn new(plan: MealPlanRow, saved: Vec<SavedRecipeRow>) -> Self {
        Self {
            id: plan.id,
            request: plan.request.0,
            preferences: plan.preferences.0,
            meal_plan: plan.meals.0,
            saved_recipes: saved.into_iter().map(SavedRecipeItem::from).collect(),
            created_at: plan.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipeItem {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub position: i32,
    pub meal: Meal,
    pub user_notes: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<SavedRecipeRow> for SavedRecipeItem {
    fn from(row: SavedRecipeRow) -> Self {
        Self {
            id: row.id,
            plan_id: row.plan_id,
            position: row.position,
            meal: row.meal.0,
            user_notes: row.user_notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesBody {
    #[serde(default)]
    pub dietary_restrictions: String,
    #[serde(default)]
    pub cuisine_preferences: String,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

pub const MAX_PAGE: i64 = 100;

impl Pagination {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_PAGE), self.offset.max(0))
    }
}
