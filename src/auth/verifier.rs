use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::{Claims, TokenKind};
use crate::{config::JwtConfig, error::PipelineError};

/// Turns a caller credential into a stable user id, or fails closed.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Uuid, PipelineError>;
}

/// Verifies HS256 access tokens minted by the identity provider.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(cfg: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        Self {
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Uuid, PipelineError> {
        let token = token.trim();
        if token.is_empty() {
            warn!("missing credential token");
            return Err(PipelineError::Authentication("missing credential".into()));
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            PipelineError::Authentication(e.to_string())
        })?;

        if data.claims.kind != TokenKind::Access {
            warn!(user_id = %data.claims.sub, kind = ?data.claims.kind, "non-access token presented");
            return Err(PipelineError::Authentication("access token required".into()));
        }

        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}
