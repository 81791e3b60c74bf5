use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::repo_types::{MealPlanRow, NewMealPlan, SavedRecipeRow, UserPreferencesRow};
use crate::models::Meal;

/// Document store for plans, saved recipes and profile preferences.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn load_preferences(&self, user_id: Uuid) -> anyhow::Result<Option<UserPreferencesRow>>;

    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        dietary_restrictions: &str,
        cuisine_preferences: &str,
    ) -> anyhow::Result<UserPreferencesRow>;

    async fn insert_plan(&self, plan: &NewMealPlan) -> anyhow::Result<MealPlanRow>;

    async fn insert_saved_recipe(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        position: i32,
        meal: &Meal,
    ) -> anyhow::Result<SavedRecipeRow>;

    async fn list_plans(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanRow>>;

    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<MealPlanRow>>;

    async fn list_saved_recipes(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<SavedRecipeRow>>;

    async fn list_saved_recipes_by_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> anyhow::Result<Vec<SavedRecipeRow>>;
}

#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn load_preferences(&self, user_id: Uuid) -> anyhow::Result<Option<UserPreferencesRow>> {
        let row = sqlx::query_as::<_, UserPreferencesRow>(
            r#"
            SELECT user_id, dietary_restrictions, cuisine_preferences, updated_at
              FROM user_preferences
             WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("load user preferences")?;
        Ok(row)
    }

    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        dietary_restrictions: &str,
        cuisine_preferences: &str,
    ) -> anyhow::Result<UserPreferencesRow> {
        let row = sqlx::query_as::<_, UserPreferencesRow>(
            r#"
            INSERT INTO user_preferences (user_id, dietary_restrictions, cuisine_preferences)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE
               SET dietary_restrictions = EXCLUDED.dietary_restrictions,
                   cuisine_preferences  = EXCLUDED.cuisine_preferences,
                   updated_at           = now()
            RETURNING user_id, dietary_restrictions, cuisine_preferences, updated_at
            "#,
        )
        .bind(user_id)
        .bind(dietary_restrictions)
        .bind(cuisine_preferences)
        .fetch_one(&self.db)
        .await
        .context("upsert user preferences")?;
        Ok(row)
    }

    async fn insert_plan(&self, plan: &NewMealPlan) -> anyhow::Result<MealPlanRow> {
        let row = sqlx::query_as::<_, MealPlanRow>(
            r#"
            INSERT INTO meal_plans (id, user_id, meals, request, preferences)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, meals, request, preferences, created_at
            "#,
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(Json(&plan.meals))
        .bind(Json(&plan.request))
        .bind(Json(&plan.preferences))
        .fetch_one(&self.db)
        .await
        .context("insert meal plan")?;
        Ok(row)
    }

    async fn insert_saved_recipe(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        position: i32,
        meal: &Meal,
    ) -> anyhow::Result<SavedRecipeRow> {
        let row = sqlx::query_as::<_, SavedRecipeRow>(
            r#"
            INSERT INTO saved_recipes (id, plan_id, user_id, position, meal, user_notes)
            VALUES ($1, $2, $3, $4, $5, '')
            RETURNING id, plan_id, user_id, position, meal, user_notes, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(plan_id)
        .bind(user_id)
        .bind(position)
        .bind(Json(meal))
        .fetch_one(&self.db)
        .await
        .with_context(|| format!("insert saved recipe for plan {plan_id}"))?;
        Ok(row)
    }

    async fn list_plans(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanRow>> {
        let rows = sqlx::query_as::<_, MealPlanRow>(
            r#"
            SELECT id, user_id, meals, request, preferences, created_at
              FROM meal_plans
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list meal plans")?;
        Ok(rows)
    }

    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<MealPlanRow>> {
        let row = sqlx::query_as::<_, MealPlanRow>(
            r#"
            SELECT id, user_id, meals, request, preferences, created_at
              FROM meal_plans
             WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get meal plan")?;
        Ok(row)
    }

    async fn list_saved_recipes(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<SavedRecipeRow>> {
        let rows = sqlx::query_as::<_, SavedRecipeRow>(
            r#"
            SELECT id, plan_id, user_id, position, meal, user_notes, created_at
              FROM saved_recipes
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list saved recipes")?;
        Ok(rows)
    }

    async fn list_saved_recipes_by_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> anyhow::Result<Vec<SavedRecipeRow>> {
        let rows = sqlx::query_as::<_, SavedRecipeRow>(
            r#"
            SELECT id, plan_id, user_id, position, meal, user_notes, created_at
              FROM saved_recipes
             WHERE plan_id = $1 AND user_id = $2
             ORDER BY position ASC
            "#,
        )
        .bind(plan_id)
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list saved recipes by plan")?;
        Ok(rows)
    }
}
