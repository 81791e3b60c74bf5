use std::sync::Arc;

use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{repo::PlanStore, repo_types::NewMealPlan};
use crate::{
    error::PipelineError,
    models::{Meal, MealPlanRequest},
};

/// Records a generated plan, then each of its meals as a saved recipe.
/// The two steps are independent writes, not one transaction.
#[derive(Clone)]
pub struct PlanWriter {
    store: Arc<dyn PlanStore>,
}

impl PlanWriter {
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self { store }
    }

    /// Writes a new `meal_plans` record. Every call creates a new id.
    #[instrument(skip(self, request, meals), fields(user_id = %user_id, meals = meals.len()))]
    pub async fn persist(
        &self,
        user_id: Uuid,
        request: &MealPlanRequest,
        meals: &[Meal],
    ) -> Result<Uuid, PipelineError> {
        let plan = NewMealPlan {
            id: Uuid::new_v4(),
            user_id,
            meals: meals.to_vec(),
            request: request.clone(),
            preferences: self.preferences_snapshot(user_id).await,
        };

        let row = self.store.insert_plan(&plan).await.map_err(|e| {
            error!(error = %e, "meal plan write failed");
            PipelineError::Persistence(e.to_string())
        })?;

        info!(plan_id = %row.id, "meal plan saved");
        Ok(row.id)
    }

    /// Writes one saved recipe per meal, concurrently. A failed write is
    /// logged and skipped; returns how many were written.
    #[instrument(skip(self, meals), fields(plan_id = %plan_id, user_id = %user_id))]
    pub async fn persist_recipes(&self, plan_id: Uuid, user_id: Uuid, meals: &[Meal]) -> usize {
        let store = self.store.as_ref();
        let results = join_all(meals.iter().zip(0i32..).map(|(meal, position)| async move {
            (
                meal,
                store
                    .insert_saved_recipe(plan_id, user_id, position, meal)
                    .await,
            )
        }))
        .await;

        let mut saved = 0;
        for (meal, result) in results {
            match result {
                Ok(_) => saved += 1,
                Err(e) => warn!(error = %e, meal = %meal.name, "saved recipe write failed; skipping"),
            }
        }
        info!(saved, total = meals.len(), "saved recipes written");
        saved
    }

    async fn preferences_snapshot(&self, user_id: Uuid) -> Value {
        match self.store.load_preferences(user_id).await {
            Ok(Some(prefs)) => serde_json::to_value(&prefs).unwrap_or_else(|_| json!({})),
            Ok(None) => json!({}),
            Err(e) => {
                warn!(error = %e, "could not read user preferences; using empty snapshot");
                json!({})
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{meal, MemoryPlanStore};

    fn request() -> MealPlanRequest {
        MealPlanRequest::new("vegan", "ethiopian", 2).unwrap()
    }

    #[tokio::test]
    async fn persists_plan_with_request_snapshot() {
        let store = Arc::new(MemoryPlanStore::default());
        let writer = PlanWriter::new(store.clone());
        let user_id = Uuid::new_v4();
        let meals = vec![meal("Misir Wot"), meal("Gomen")];

        let plan_id = writer.persist(user_id, &request(), &meals).await.unwrap();

        let plans = store.plans();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].id, plan_id);
        assert_eq!(plans[0].user_id, user_id);
        assert_eq!(plans[0].meals.0, meals);
        assert_eq!(plans[0].request.0, request());
        assert_eq!(plans[0].preferences.0, json!({}));
    }

    #[tokio::test]
    async fn same_payload_twice_creates_two_plans() {
        let store = Arc::new(MemoryPlanStore::default());
        let writer = PlanWriter::new(store.clone());
        let user_id = Uuid::new_v4();
        let meals = vec![meal("Misir Wot"), meal("Gomen")];

        let first = writer.persist(user_id, &request(), &meals).await.unwrap();
        let second = writer.persist(user_id, &request(), &meals).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.plans().len(), 2);
    }

    #[tokio::test]
    async fn stored_preferences_are_snapshotted() {
        let store = Arc::new(MemoryPlanStore::default());
        let user_id = Uuid::new_v4();
        store
            .upsert_preferences(user_id, "pescatarian", "greek")
            .await
            .unwrap();

        PlanWriter::new(store.clone())
            .persist(user_id, &request(), &[meal("Misir Wot"), meal("Gomen")])
            .await
            .unwrap();

        let prefs = &store.plans()[0].preferences.0;
        assert_eq!(prefs["dietaryRestrictions"], "pescatarian");
        assert_eq!(prefs["cuisinePreferences"], "greek");
    }

    #[tokio::test]
    async fn unreadable_preferences_fall_back_to_empty() {
        let store = Arc::new(MemoryPlanStore::default());
        store.fail_preferences();

        PlanWriter::new(store.clone())
            .persist(Uuid::new_v4(), &request(), &[meal("Misir Wot"), meal("Gomen")])
            .await
            .unwrap();

        assert_eq!(store.plans()[0].preferences.0, json!({}));
    }

    #[tokio::test]
    async fn plan_write_failure_is_persistence_error() {
        let store = Arc::new(MemoryPlanStore::default());
        store.fail_plans();

        let err = PlanWriter::new(store.clone())
            .persist(Uuid::new_v4(), &request(), &[meal("Misir Wot")])
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Persistence(_)));
        assert!(store.plans().is_empty());
    }

    #[tokio::test]
    async fn one_failed_recipe_does_not_stop_siblings() {
        let store = Arc::new(MemoryPlanStore::default());
        store.fail_recipe_named("Gomen");
        let writer = PlanWriter::new(store.clone());
        let user_id = Uuid::new_v4();
        let meals = vec![meal("Misir Wot"), meal("Gomen"), meal("Injera")];

        let plan_id = writer.persist(user_id, &request(), &meals).await.unwrap();
        let saved = writer.persist_recipes(plan_id, user_id, &meals).await;

        assert_eq!(saved, 2);
        let recipes = store.saved_recipes();
        assert_eq!(recipes.len(), 2);
        assert!(recipes.iter().all(|r| r.plan_id == plan_id && r.user_notes.is_empty()));
        assert!(recipes.iter().all(|r| r.meal.0.name != "Gomen"));
    }

    #[tokio::test]
    async fn saved_recipes_carry_their_meal_position() {
        let store = Arc::new(MemoryPlanStore::default());
        store.stagger_recipe_writes();
        let writer = PlanWriter::new(store.clone());
        let user_id = Uuid::new_v4();
        let meals = vec![meal("Misir Wot"), meal("Gomen"), meal("Injera")];

        let plan_id = writer.persist(user_id, &request(), &meals).await.unwrap();
        writer.persist_recipes(plan_id, user_id, &meals).await;

        let ordered = store.list_saved_recipes_by_plan(user_id, plan_id).await.unwrap();
        let names: Vec<_> = ordered.iter().map(|r| r.meal.0.name.as_str()).collect();
        assert_eq!(names, vec!["Misir Wot", "Gomen", "Injera"]);
        assert_eq!(ordered.iter().map(|r| r.position).collect::<Vec<_>>(), vec![0, 1, 2]);
    }
}
