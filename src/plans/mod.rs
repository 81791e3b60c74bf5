//! Meal plan pipeline entry point, storage and history endpoints.

mod dto;
mod handlers;
mod orchestrator;
mod repo;
mod repo_types;
mod writer;

pub use handlers::router;
pub use orchestrator::Orchestrator;
pub use repo::{PgPlanStore, PlanStore};
pub use repo_types::{MealPlanRow, NewMealPlan, SavedRecipeRow, UserPreferencesRow};
pub use writer::PlanWriter;
