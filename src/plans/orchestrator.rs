use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, Instrument, Span};
use uuid::Uuid;

use super::writer::PlanWriter;
use crate::{
    auth::IdentityVerifier,
    error::PipelineError,
    generator::MealPlanGenerator,
    models::{Meal, MealPlanRequest},
};

/// Pipeline stages, in order. Any stage may exit to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authenticating,
    Generating,
    Persisting,
    Done,
}

/// Result of a successful run. The meals are final; saving them continues
/// on a background task whose result is in `persistence`.
#[derive(Debug)]
pub struct PlanOutcome {
    pub meals: Vec<Meal>,
    pub persistence: JoinHandle<PersistOutcome>,
}

/// What the background save managed to write. `plan_id` is `None` when the
/// plan row could not be saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOutcome {
    pub plan_id: Option<Uuid>,
    pub recipes_saved: usize,
}

pub struct Orchestrator {
    verifier: Arc<dyn IdentityVerifier>,
    generator: Arc<dyn MealPlanGenerator>,
    writer: PlanWriter,
}

impl Orchestrator {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        generator: Arc<dyn MealPlanGenerator>,
        writer: PlanWriter,
    ) -> Self {
        Self {
            verifier,
            generator,
            writer,
        }
    }

    /// Verify, generate, then hand persistence to a spawned task and return.
    /// Authentication and generation failures abort; persistence failures
    /// only log, and never delay the meals.
    #[instrument(skip_all, fields(meals = request.number_of_meals()))]
    pub async fn run(
        &self,
        token: &str,
        request: &MealPlanRequest,
    ) -> Result<PlanOutcome, PipelineError> {
        debug!(stage = ?Stage::Authenticating, "pipeline stage");
        let user_id = self.verifier.verify(token).await.map_err(|e| {
            let e = match e {
                PipelineError::Authentication(_) => e,
                other => PipelineError::Authentication(other.to_string()),
            };
            error!(stage = ?Stage::Authenticating, error = %e, "pipeline failed");
            e
        })?;

        debug!(stage = ?Stage::Generating, %user_id, "pipeline stage");
        let meals = self.generator.generate(request).await.map_err(|e| {
            let e = match e {
                PipelineError::GenerationFailed(_) => e,
                other => PipelineError::GenerationFailed(other.to_string()),
            };
            error!(stage = ?Stage::Generating, %user_id, error = %e, "pipeline failed");
            e
        })?;

        debug!(stage = ?Stage::Persisting, %user_id, "pipeline stage");
        let persistence = tokio::spawn(
            persist(self.writer.clone(), user_id, request.clone(), meals.clone())
                .instrument(Span::current()),
        );

        info!(
            stage = ?Stage::Done,
            %user_id,
            meals = meals.len(),
            "meal plan ready"
        );
        Ok(PlanOutcome { meals, persistence })
    }
}

// Runs detached from the request, so a dropped connection does not cancel it.
async fn persist(
    writer: PlanWriter,
    user_id: Uuid,
    request: MealPlanRequest,
    meals: Vec<Meal>,
) -> PersistOutcome {
    let outcome = match writer.persist(user_id, &request, &meals).await {
        Ok(plan_id) => PersistOutcome {
            plan_id: Some(plan_id),
            recipes_saved: writer.persist_recipes(plan_id, user_id, &meals).await,
        },
        Err(e) => {
            error!(
                stage = ?Stage::Persisting,
                %user_id,
                error = %e,
                "meal plan not saved"
            );
            PersistOutcome {
                plan_id: None,
                recipes_saved: 0,
            }
        }
    };
    info!(
        %user_id,
        plan_id = ?outcome.plan_id,
        recipes_saved = outcome.recipes_saved,
        "meal plan persistence finished"
    );
    outcome
}
