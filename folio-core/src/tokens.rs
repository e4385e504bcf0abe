//! Signed bearer and email-verification tokens (HS256 JWT).

use crate::{models::TokenPurpose, FolioError, FolioResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
    pub purpose: TokenPurpose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyClaims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub purpose: TokenPurpose,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: AuthClaims,
}

#[derive(Clone)]
pub struct TokenService {
    secret: String,
    auth_ttl: Duration,
    verify_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            auth_ttl: Duration::hours(1),
            verify_ttl: Duration::hours(24),
        }
    }

    pub fn with_auth_ttl(mut self, ttl: Duration) -> Self {
        self.auth_ttl = ttl;
        self
    }

    pub fn with_verify_ttl(mut self, ttl: Duration) -> Self {
        self.verify_ttl = ttl;
        self
    }

    pub fn generate_auth_token(&self, user_id: &str) -> FolioResult<IssuedToken> {
        let now = Utc::now();
        let claims = AuthClaims {
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.auth_ttl).timestamp(),
            purpose: TokenPurpose::Auth,
        };
        debug!(user_id, exp = claims.exp, "Issuing auth token");
        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    pub fn generate_verify_token(&self, email: &str) -> FolioResult<String> {
        let now = Utc::now();
        let claims = VerifyClaims {
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.verify_ttl).timestamp(),
            purpose: TokenPurpose::Verify,
        };
        debug!(email, "Issuing verify token");
        self.sign(&claims)
    }

    pub fn validate_auth_token(&self, token: &str) -> FolioResult<AuthClaims> {
        let claims: AuthClaims = self.decode_checked(token)?;
        expect_purpose(claims.purpose, TokenPurpose::Auth)?;
        Ok(claims)
    }

    pub fn validate_verify_token(&self, token: &str) -> FolioResult<VerifyClaims> {
        let claims: VerifyClaims = self.decode_checked(token)?;
        expect_purpose(claims.purpose, TokenPurpose::Verify)?;
        Ok(claims)
    }

    /// Decodes the claims without checking signature or expiry.
    /// Only for displaying what a token says, never for authorization.
    pub fn read_auth_token(token: &str) -> FolioResult<AuthClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        let data = decode::<AuthClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
        Ok(data.claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> FolioResult<String> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| FolioError::TokenSigning(e.to_string()))
    }

    fn decode_checked<T: DeserializeOwned>(&self, token: &str) -> FolioResult<T> {
        let data = decode::<T>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &strict_validation(),
        )?;
        Ok(data.claims)
    }
}

/// HS256 with expiry enforced to the second.
fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn expect_purpose(actual: TokenPurpose, expected: TokenPurpose) -> FolioResult<()> {
    if actual != expected {
        return Err(FolioError::InvalidToken(format!(
            "expected {} token, got {}",
            expected, actual
        )));
    }
    Ok(())
}
