//! In-memory doubles for the pipeline seams, shared by unit tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::IdentityVerifier,
    error::PipelineError,
    generator::MealPlanGenerator,
    llm::{ChatRequest, FunctionDeclaration, LlmClient, LlmError, ModelReply},
    models::{Meal, MealPlanRequest, Recipe},
    plans::{MealPlanRow, NewMealPlan, PlanStore, SavedRecipeRow, UserPreferencesRow},
    recipes::RecipeSearch,
};

fn slug(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

pub fn meal(name: &str) -> Meal {
    Meal {
        name: name.to_string(),
        ingredients: vec!["200g rice".into(), "1 onion".into()],
        instructions: format!("Cook the {name}."),
        calories: Some(550.0),
        macros: Some("P 20g / C 70g / F 15g".into()),
        image_url: Some(format!("https://img.example.com/{}.jpg", slug(name))),
        source_url: Some(format!("https://recipes.example.com/{}", slug(name))),
    }
}

pub fn recipe(name: &str) -> Recipe {
    Recipe {
        name: name.to_string(),
        ingredients: vec!["1 tbsp oil".into()],
        instructions: format!("Make the {name}."),
        image_url: Some(format!("https://img.example.com/{}.jpg", slug(name))),
        source_url: None,
    }
}

/// Final model answer listing the given meals.
pub fn plan_reply(names: &[&str]) -> ModelReply {
    let meals: Vec<Meal> = names.iter().map(|n| meal(n)).collect();
    ModelReply::Text(json!({ "mealPlan": meals }).to_string())
}

/// Polls `check` until it holds, for work finishing on spawned tasks.
pub async fn eventually(check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

/// Replays a fixed script of replies and records every request it saw.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<ModelReply, &'static str>>>,
    seen: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<Result<ModelReply, &'static str>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete_with_tools(
        &self,
        request: &ChatRequest,
        _tools: &[FunctionDeclaration],
    ) -> Result<ModelReply, LlmError> {
        self.seen.lock().unwrap().push(request.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(msg)) => Err(LlmError::RequestFailed(msg.into())),
            None => Err(LlmError::RequestFailed("script exhausted".into())),
        }
    }
}

/// Returns the same recipes for every query, or always fails.
pub struct StubSearch {
    recipes: Vec<Recipe>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl StubSearch {
    pub fn with_recipes(names: &[&str]) -> Self {
        Self {
            recipes: names.iter().map(|n| recipe(n)).collect(),
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_recipes(&[])
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipeSearch for StubSearch {
    async fn search(&self, query: &str) -> Result<Vec<Recipe>, PipelineError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(PipelineError::UpstreamUnavailable("stub search down".into()));
        }
        Ok(self.recipes.clone())
    }
}

/// Accepts exactly one token.
pub struct StaticVerifier {
    token: String,
    user_id: Uuid,
    calls: AtomicUsize,
}

impl StaticVerifier {
    pub fn accepting(token: &str) -> Self {
        Self {
            token: token.to_string(),
            user_id: Uuid::new_v4(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<Uuid, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if token == self.token {
            Ok(self.user_id)
        } else {
            Err(PipelineError::Authentication("unknown token".into()))
        }
    }
}

/// Returns a canned plan, or a canned error once then `GenerationFailed`.
pub struct FixedGenerator {
    meals: Option<Vec<Meal>>,
    error: Mutex<Option<PipelineError>>,
    calls: AtomicUsize,
}

impl FixedGenerator {
    pub fn returning(meals: Vec<Meal>) -> Self {
        Self {
            meals: Some(meals),
            error: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::erroring(PipelineError::GenerationFailed("model gave up".into()))
    }

    pub fn erroring(error: PipelineError) -> Self {
        Self {
            meals: None,
            error: Mutex::new(Some(error)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MealPlanGenerator for FixedGenerator {
    async fn generate(&self, _request: &MealPlanRequest) -> Result<Vec<Meal>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.meals {
            Some(meals) => Ok(meals.clone()),
            None => Err(self
                .error
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| PipelineError::GenerationFailed("model gave up".into()))),
        }
    }
}

/// `PlanStore` over plain vectors, with switches to make writes fail.
#[derive(Default)]
pub struct MemoryPlanStore {
    plans: Mutex<Vec<MealPlanRow>>,
    recipes: Mutex<Vec<SavedRecipeRow>>,
    preferences: Mutex<HashMap<Uuid, UserPreferencesRow>>,
    fail_preferences: AtomicBool,
    fail_plans: AtomicBool,
    failing_recipes: Mutex<Vec<String>>,
    stall: Mutex<Option<Duration>>,
    stagger_recipes: AtomicBool,
}

impl MemoryPlanStore {
    pub fn plans(&self) -> Vec<MealPlanRow> {
        self.plans.lock().unwrap().clone()
    }

    pub fn saved_recipes(&self) -> Vec<SavedRecipeRow> {
        self.recipes.lock().unwrap().clone()
    }

    pub fn fail_preferences(&self) {
        self.fail_preferences.store(true, Ordering::SeqCst);
    }

    pub fn fail_plans(&self) {
        self.fail_plans.store(true, Ordering::SeqCst);
    }

    pub fn fail_recipe_named(&self, name: &str) {
        self.failing_recipes.lock().unwrap().push(name.to_string());
    }

    /// Preference reads and plan writes sleep this long before answering.
    pub fn stall(&self, delay: Duration) {
        *self.stall.lock().unwrap() = Some(delay);
    }

    /// Later positions finish first, so rows land in reverse meal order.
    pub fn stagger_recipe_writes(&self) {
        self.stagger_recipes.store(true, Ordering::SeqCst);
    }

    async fn wait_if_stalled(&self) {
        let delay = *self.stall.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

fn page<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    rows.rev()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn load_preferences(&self, user_id: Uuid) -> anyhow::Result<Option<UserPreferencesRow>> {
        self.wait_if_stalled().await;
        if self.fail_preferences.load(Ordering::SeqCst) {
            return Err(anyhow!("preferences table unavailable"));
        }
        Ok(self.preferences.lock().unwrap().get(&user_id).cloned())
    }

    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        dietary_restrictions: &str,
        cuisine_preferences: &str,
    ) -> anyhow::Result<UserPreferencesRow> {
        if self.fail_preferences.load(Ordering::SeqCst) {
            return Err(anyhow!("preferences table unavailable"));
        }
        let row = UserPreferencesRow {
            user_id,
            dietary_restrictions: dietary_restrictions.to_string(),
            cuisine_preferences: cuisine_preferences.to_string(),
            updated_at: OffsetDateTime::now_utc(),
        };
        self.preferences.lock().unwrap().insert(user_id, row.clone());
        Ok(row)
    }

    async fn insert_plan(&self, plan: &NewMealPlan) -> anyhow::Result<MealPlanRow> {
        self.wait_if_stalled().await;
        if self.fail_plans.load(Ordering::SeqCst) {
            return Err(anyhow!("meal_plans insert refused"));
        }
        let row = MealPlanRow {
            id: plan.id,
            user_id: plan.user_id,
            meals: Json(plan.meals.clone()),
            request: Json(plan.request.clone()),
            preferences: Json(plan.preferences.clone()),
            created_at: OffsetDateTime::now_utc(),
        };
        self.plans.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn insert_saved_recipe(
        &self,
        plan_id: Uuid,
        user_id: Uuid,
        position: i32,
        meal: &Meal,
    ) -> anyhow::Result<SavedRecipeRow> {
        if self.stagger_recipes.load(Ordering::SeqCst) {
            let wait = 10u64.saturating_sub(position.max(0) as u64) * 15;
            tokio::time::sleep(Duration::from_millis(wait)).await;
        }
        if self.failing_recipes.lock().unwrap().contains(&meal.name) {
            return Err(anyhow!("saved_recipes insert refused for {}", meal.name));
        }
        let row = SavedRecipeRow {
            id: Uuid::new_v4(),
            plan_id,
            user_id,
            position,
            meal: Json(meal.clone()),
            user_notes: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.recipes.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list_plans(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealPlanRow>> {
        let plans = self.plans.lock().unwrap();
        let mine: Vec<_> = plans.iter().filter(|p| p.user_id == user_id).cloned().collect();
        Ok(page(mine.into_iter(), limit, offset))
    }

    async fn get_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<MealPlanRow>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == plan_id && p.user_id == user_id)
            .cloned())
    }

    async fn list_saved_recipes(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<SavedRecipeRow>> {
        let recipes = self.recipes.lock().unwrap();
        let mine: Vec<_> = recipes.iter().filter(|r| r.user_id == user_id).cloned().collect();
        Ok(page(mine.into_iter(), limit, offset))
    }

    async fn list_saved_recipes_by_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> anyhow::Result<Vec<SavedRecipeRow>> {
        let mut rows: Vec<_> = self
            .recipes
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.plan_id == plan_id && r.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.position);
        Ok(rows)
    }
}
