use std::{sync::Arc, time::Duration};

use anyhow::Context;
use reqwest::Client;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    auth::{IdentityVerifier, JwtVerifier},
    config::{AppConfig, HttpClientConfig},
    generator::{MealPlanGenerator, ToolAugmentedGenerator},
    llm::GeminiClient,
    plans::{Orchestrator, PgPlanStore, PlanStore, PlanWriter},
    recipes::MealDbClient,
};

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn IdentityVerifier>,
    pub store: Arc<dyn PlanStore>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Builds every client once. Any failure here aborts startup.
    pub fn init(config: &AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let http = build_http_client(&config.http)?;

        let verifier = Arc::new(JwtVerifier::new(&config.jwt)) as Arc<dyn IdentityVerifier>;
        let search = Arc::new(MealDbClient::new(http.clone(), &config.recipe_search));
        let llm = Arc::new(GeminiClient::new(http, &config.llm));
        let generator = Arc::new(ToolAugmentedGenerator::new(
            llm,
            search,
            config.llm.max_tool_iterations,
            config.llm.temperature,
        )) as Arc<dyn MealPlanGenerator>;
        let store = Arc::new(PgPlanStore::new(db)) as Arc<dyn PlanStore>;

        Ok(Self::from_parts(verifier, generator, store))
    }

    pub fn from_parts(
        verifier: Arc<dyn IdentityVerifier>,
        generator: Arc<dyn MealPlanGenerator>,
        store: Arc<dyn PlanStore>,
    ) -> Self {
        let orchestrator = Orchestrator::new(
            verifier.clone(),
            generator,
            PlanWriter::new(store.clone()),
        );
        Self {
            verifier,
            store,
            orchestrator: Arc::new(orchestrator),
        }
    }
}

pub async fn connect_database(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

fn build_http_client(cfg: &HttpClientConfig) -> anyhow::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .timeout(Duration::from_secs(cfg.request_timeout_secs))
        .build()
        .context("build HTTP client")
}
