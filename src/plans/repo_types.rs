use serde::Serialize;
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{Meal, MealPlanRequest};

/// Row of `meal_plans`.
#[derive(Debug, Clone, FromRow)]
pub struct MealPlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meals: Json<Vec<Meal>>,
    pub request: Json<MealPlanRequest>,
    pub preferences: Json<Value>,
    pub created_at: OffsetDateTime,
}

/// Row of `saved_recipes`; `plan_id` references `meal_plans.id` and
/// `position` is the meal's index within that plan.
#[derive(Debug, Clone, FromRow)]
pub struct SavedRecipeRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub user_id: Uuid,
    pub position: i32,
    pub meal: Json<Meal>,
    pub user_notes: String,
    pub created_at: OffsetDateTime,
}

/// Row of `user_preferences`, one per user.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferencesRow {
    #[serde(skip)]
    pub user_id: Uuid,
    pub dietary_restrictions: String,
    pub cuisine_preferences: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Insert payload for a plan; the id is generated by the writer.
#[derive(Debug, Clone)]
pub struct NewMealPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meals: Vec<Meal>,
    pub request: MealPlanRequest,
    pub preferences: Value,
}
