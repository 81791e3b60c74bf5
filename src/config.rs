use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tool_iterations: usize,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeSearchConfig {
    pub base_url: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_acquire_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub llm: LlmConfig,
    pub recipe_search: RecipeSearchConfig,
    pub http: HttpClientConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: env_or("JWT_ISSUER", "mealplanner"),
            audience: env_or("JWT_AUDIENCE", "mealplanner-users"),
        };
        let llm = LlmConfig {
            api_key: std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?,
            model: env_or("GEMINI_MODEL", "gemini-2.5-pro"),
            base_url: env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            max_tool_iterations: env_parse("LLM_MAX_TOOL_ITERATIONS", 8usize).max(1),
            temperature: std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f32>().ok()),
        };
        let recipe_search = RecipeSearchConfig {
            base_url: env_or(
                "RECIPE_SEARCH_BASE_URL",
                "https://www.themealdb.com/api/json/v1/1",
            ),
            max_results: env_parse("RECIPE_SEARCH_MAX_RESULTS", 5usize).max(1),
        };
        let http = HttpClientConfig {
            connect_timeout_secs: env_parse("HTTP_CONNECT_TIMEOUT_SECS", 10),
            request_timeout_secs: env_parse("HTTP_REQUEST_TIMEOUT_SECS", 120),
        };
        Ok(Self {
            host: env_or("APP_HOST", "0.0.0.0"),
            port: env_parse("APP_PORT", 8080),
            database_url,
            db_acquire_timeout_secs: env_parse("DB_ACQUIRE_TIMEOUT_SECS", 5),
            jwt,
            llm,
            recipe_search,
            http,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
