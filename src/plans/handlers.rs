use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::dto::{
    GenerateMealPlanBody, MealPlanDetails, MealPlanListItem, MealPlanResponse, Pagination,
    PreferencesBody, SavedRecipeItem,
};
use super::repo_types::UserPreferencesRow;
use crate::{
    auth::{AuthUser, BearerToken},
    error::PipelineError,
    models::MealPlanRequest,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/meal-plans", get(list_meal_plans).post(generate_meal_plan))
        .route("/meal-plans/:id", get(get_meal_plan))
        .route("/saved-recipes", get(list_saved_recipes))
        .route("/me/preferences", get(get_preferences).put(put_preferences))
}

/// POST /meal-plans
/// The credential comes from `credentialToken`, else from the Authorization header.
#[instrument(skip_all)]
pub async fn generate_meal_plan(
    State(state): State<AppState>,
    BearerToken(header_token): BearerToken,
    body: Result<Json<GenerateMealPlanBody>, JsonRejection>,
) -> Result<Json<MealPlanResponse>, PipelineError> {
    let Json(body) = body.map_err(|e| PipelineError::InvalidRequest(e.body_text()))?;
    let request = MealPlanRequest::new(
        body.dietary_restrictions,
        body.cuisine_preferences,
        body.number_of_meals,
    )?;

    let token = body
        .credential_token
        .filter(|t| !t.trim().is_empty())
        .or(header_token)
        .unwrap_or_default();

    let outcome = state.orchestrator.run(&token, &request).await?;
    info!(meals = outcome.meals.len(), "meal plan returned");
    Ok(Json(MealPlanResponse {
        meal_plan: outcome.meals,
    }))
}

#[instrument(skip(state))]
pub async fn list_meal_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<MealPlanListItem>>, PipelineError> {
    let (limit, offset) = p.clamped();
    let plans = state
        .store
        .list_plans(user_id, limit, offset)
        .await
        .map_err(storage)?;
    Ok(Json(plans.into_iter().map(MealPlanListItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_meal_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealPlanDetails>, PipelineError> {
    let plan = state
        .store
        .get_plan(user_id, id)
        .await
        .map_err(storage)?
        .ok_or(PipelineError::NotFound)?;
    let saved = state
        .store
        .list_saved_recipes_by_plan(user_id, id)
        .await
        .map_err(storage)?;
    Ok(Json(MealPlanDetails::new(plan, saved)))
}

#[instrument(skip(state))]
pub async fn list_saved_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<SavedRecipeItem>>, PipelineError> {
    let (limit, offset) = p.clamped();
    let rows = state
        .store
        .list_saved_recipes(user_id, limit, offset)
        .await
        .map_err(storage)?;
    Ok(Json(rows.into_iter().map(SavedRecipeItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_preferences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserPreferencesRow>, PipelineError> {
    state
        .store
        .load_preferences(user_id)
        .await
        .map_err(storage)?
        .map(Json)
        .ok_or(PipelineError::NotFound)
}

#[instrument(skip(state, body))]
pub async fn put_preferences(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Result<Json<PreferencesBody>, JsonRejection>,
) -> Result<Json<UserPreferencesRow>, PipelineError> {
    let Json(body) = body.map_err(|e| PipelineError::InvalidRequest(e.body_text()))?;
    let dietary = body.dietary_restrictions.trim();
    let cuisine = body.cuisine_preferences.trim();
    if dietary.is_empty() || cuisine.is_empty() {
        return Err(PipelineError::InvalidRequest(
            "dietaryRestrictions and cuisinePreferences must not be empty".into(),
        ));
    }

    let row = state
        .store
        .upsert_preferences(user_id, dietary, cuisine)
        .await
        .map_err(storage)?;
    Ok(Json(row))
}

fn storage(e: anyhow::Error) -> PipelineError {
    error!(error = %e, "plan store failed");
    PipelineError::Persistence(e.to_string())
}
