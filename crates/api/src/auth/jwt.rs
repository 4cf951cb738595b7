//! Bearer tokens.
//!
//! Two kinds of HS256 tokens reach the API and both are verified the same
//! way against `JWT_SECRET`:
//!
//! - tokens minted by the corporate identity provider, which shares the
//!   secret and may carry claims of its own;
//! - service-account tokens issued by `POST /admin/users/{id}/token`.
//!
//! Only the subject matters. Roles never travel in the token; the auth
//! extractor loads them from the database on every request.

use appflow_core::types::DbId;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims this service reads from, and writes into, a token.
///
/// Anything else an identity provider adds is ignored.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Id of the `users` row the token speaks for.
    pub sub: DbId,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    /// Set on service-account tokens so an issued token can be traced in logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: String,
    /// Lifetime of service-account tokens, in minutes.
    pub service_token_ttl_mins: i64,
}

const DEFAULT_SERVICE_TOKEN_TTL_MINS: i64 = 60;

impl JwtConfig {
    /// `JWT_SECRET` (required) and `JWT_SERVICE_TOKEN_TTL_MINS` (default 60).
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or the TTL is not a
    /// positive integer.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let service_token_ttl_mins: i64 = std::env::var("JWT_SERVICE_TOKEN_TTL_MINS")
            .unwrap_or_else(|_| DEFAULT_SERVICE_TOKEN_TTL_MINS.to_string())
            .parse()
            .expect("JWT_SERVICE_TOKEN_TTL_MINS must be a valid i64");
        assert!(
            service_token_ttl_mins > 0,
            "JWT_SERVICE_TOKEN_TTL_MINS must be positive"
        );

        Self {
            secret,
            service_token_ttl_mins,
        }
    }

    pub fn service_token_ttl_secs(&self) -> i64 {
        self.service_token_ttl_mins * 60
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

/// Mint a token for a service account. The caller has already checked that
/// the account exists and is active.
pub fn issue_service_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        exp: now + config.service_token_ttl_secs(),
        iat: Some(now),
        jti: Some(Uuid::new_v4().to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry of a bearer token and return its claims.
pub fn verify_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &JwtConfig::validation(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "shared-with-the-identity-provider".to_string(),
            service_token_ttl_mins: 15,
        }
    }

    fn sign(payload: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn service_token_names_the_account_and_expires_after_ttl() {
        let config = config();
        let token = issue_service_token(42, &config).unwrap();

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.exp - claims.iat.unwrap(), 15 * 60);
        assert!(claims.jti.is_some());
    }

    #[test]
    fn service_token_carries_no_roles() {
        let config = config();
        let token = issue_service_token(7, &config).unwrap();

        let payload = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(config.secret.as_bytes()),
            &JwtConfig::validation(),
        )
        .unwrap()
        .claims;
        let mut keys: Vec<&str> = payload
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["exp", "iat", "jti", "sub"]);
    }

    #[test]
    fn identity_provider_token_with_extra_claims_is_accepted() {
        let config = config();
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = sign(
            json!({
                "sub": 3,
                "exp": exp,
                "iss": "https://sso.corp.test",
                "preferred_username": "alice",
                "groups": ["integration"],
            }),
            &config.secret,
        );

        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, 3);
        assert!(claims.iat.is_none());
        assert!(claims.jti.is_none());
    }

    #[test]
    fn token_without_subject_is_rejected() {
        let config = config();
        let exp = chrono::Utc::now().timestamp() + 600;
        let token = sign(json!({"exp": exp, "preferred_username": "alice"}), &config.secret);
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        // Past the default 60-second leeway.
        let exp = chrono::Utc::now().timestamp() - 300;
        let token = sign(json!({"sub": 1, "exp": exp}), &config.secret);
        assert!(verify_token(&token, &config).is_err());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = issue_service_token(1, &config()).unwrap();
        let other = JwtConfig {
            secret: "some-other-secret".to_string(),
            ..config()
        };
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(verify_token("not.a.jwt", &config()).is_err());
    }
}
