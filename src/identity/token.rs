use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::storage::Document;

/// Lifetime of a freshly minted token.
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

/// Verified caller: the `email` claim plus whatever else was embedded at issuance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(flatten)]
    pub claims: serde_json::Map<String, Value>,
}

impl Identity {
    pub fn claim(&self, name: &str) -> Option<&Value> { self.claims.get(name) }

    /// `exp` as seconds since the epoch.
    pub fn expires_at(&self) -> Option<i64> { self.claims.get("exp").and_then(|v| v.as_i64()) }
}

/// Second single-space-separated segment of an `Authorization` value,
/// i.e. the token of `"Bearer <token>"`. An empty segment is no token.
pub fn bearer_token(header: &str) -> Option<&str> {
    header.split(' ').nth(1).filter(|t| !t.is_empty())
}

/// HS256 signer/verifier keyed by the process-wide secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // profiles are embedded as claims, so a profile `aud` is just data
        validation.validate_aud = false;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs: TOKEN_TTL_SECS,
        }
    }

    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Sign `payload` as the claim set, stamped with `iat` and `exp`.
    pub fn mint(&self, payload: &Document) -> AppResult<String> {
        let now = chrono::Utc::now().timestamp();
        let mut claims = payload.clone();
        claims.insert("iat".into(), Value::from(now));
        claims.insert("exp".into(), Value::from(now + self.ttl_secs));
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal("token_mint".to_string(), e.to_string()))
    }

    /// Verify a bare token.
    pub fn decode(&self, token: &str) -> AppResult<Identity> {
        match decode::<Identity>(token, &self.decoding, &self.validation) {
            Ok(data) => {
                debug!(target: "auth", claims = ?data.claims, "decoded token");
                Ok(data.claims)
            }
            Err(e) => {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "expired",
                    ErrorKind::InvalidSignature => "bad_signature",
                    _ => "malformed",
                };
                debug!(target: "auth", reason, "token rejected: {}", e);
                Err(AppError::invalid_credential())
            }
        }
    }

    /// Verify a raw `Authorization` header value.
    pub fn verify(&self, header: Option<&str>) -> AppResult<Identity> {
        let Some(header) = header else { return Err(AppError::missing_credential()); };
        let Some(token) = bearer_token(header) else { return Err(AppError::invalid_credential()); };
        self.decode(token)
    }
}
