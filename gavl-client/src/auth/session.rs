//! Identity provider sessions and access token claims.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

/// Account record held by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
    /// Profile fields supplied at sign-up
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Signed-in session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Claims carried by the access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user id)
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Expiration
    pub exp: i64,
    /// Issued at
    #[serde(default)]
    pub iat: Option<i64>,
}

impl Session {
    /// Decode the access token payload.
    ///
    /// The signature is not checked: the identity provider verifies its own
    /// tokens, and this is only used to read expiry and subject.
    pub fn claims(&self) -> Result<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;

        let key = DecodingKey::from_secret(b"unverified");

        decode::<SessionClaims>(&self.access_token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Validation(format!("Failed to decode access token: {}", e)))
    }

    /// Expiry in Unix seconds, from `expires_at` or the token's `exp` claim.
    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
            .or_else(|| self.claims().ok().map(|claims| claims.exp))
    }

    /// Sessions with no known expiry never read as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at()
            .map(|exp| exp <= now.timestamp())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn user() -> User {
        serde_json::from_value(json!({
            "id": "5f0c7c1e-8d2a-4c39-9f53-0a1b2c3d4e5f",
            "email": "judge@example.com",
            "aud": "authenticated"
        }))
        .unwrap()
    }

    fn token(exp: i64) -> String {
        let claims = json!({
            "sub": "5f0c7c1e-8d2a-4c39-9f53-0a1b2c3d4e5f",
            "email": "judge@example.com",
            "role": "authenticated",
            "aud": "authenticated",
            "exp": exp,
            "iat": exp - 3600
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"project-secret")).unwrap()
    }

    #[test]
    fn test_decode_claims_without_secret() {
        let session = Session {
            access_token: token(1_900_000_000),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            refresh_token: None,
            user: user(),
        };

        let claims = session.claims().unwrap();
        assert_eq!(claims.sub, "5f0c7c1e-8d2a-4c39-9f53-0a1b2c3d4e5f");
        assert_eq!(claims.role.as_deref(), Some("authenticated"));
        assert_eq!(session.expires_at(), Some(1_900_000_000));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut session: Session = serde_json::from_value(json!({
            "access_token": token(now.timestamp() - 10),
            "user": user()
        }))
        .unwrap();
        assert_eq!(session.token_type, "bearer");
        assert!(session.is_expired(now));

        session.expires_at = Some(now.timestamp() + 3600);
        assert!(!session.is_expired(now));

        session.expires_at = None;
        session.access_token = "opaque".to_string();
        assert!(session.claims().is_err());
        assert!(!session.is_expired(now));
    }

    #[test]
    fn test_user_keeps_unknown_fields() {
        let user = user();
        assert_eq!(user.extra["aud"], "authenticated");
        assert_eq!(user.user_metadata, Value::Null);
    }
}
