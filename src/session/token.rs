use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

/// Claims the console reads out of an access token for display purposes.
///
/// The signature is NOT verified; the server remains the only authority on
/// whether a token is valid.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl TokenClaims {
    /// Read claims from a JWT access token; `None` for opaque tokens
    pub fn inspect(token: &str) -> Option<Self> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        match decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("access token is not an inspectable JWT: {}", e);
                None
            }
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|iat| Utc.timestamp_opt(iat, 0).single())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }
}
