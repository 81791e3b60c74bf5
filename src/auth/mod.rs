mod claims;
pub(crate) mod extractors;
mod verifier;

pub use extractors::{AuthUser, BearerToken};
pub use verifier::{IdentityVerifier, JwtVerifier};
