//! Mock user table and bearer-token issuance.
//!
//! Users are hardcoded. Tokens are HS256 JWTs carrying the username in `sub` and an expiry
//! in `exp`; verification checks both and maps the subject back onto the user table.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Default access token lifetime.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Value of `token_type` in token responses.
pub const TOKEN_TYPE: &str = "bearer";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Clinician,
    Admin,
}

#[derive(Debug)]
pub struct MockUser {
    pub username: &'static str,
    password: &'static str,
    pub role: Role,
    pub full_name: &'static str,
}

static MOCK_USERS: [MockUser; 2] = [
    MockUser {
        username: "clinician",
        password: "password123",
        role: Role::Clinician,
        full_name: "Dr. Jane Smith",
    },
    MockUser {
        username: "admin",
        password: "admin123",
        role: Role::Admin,
        full_name: "System Admin",
    },
];

pub fn find_user(username: &str) -> Option<&'static MockUser> {
    MOCK_USERS.iter().find(|u| u.username == username)
}

/// Checks a username/password pair against the mock table.
pub fn authenticate_user(username: &str, password: &str) -> Option<&'static MockUser> {
    find_user(username).filter(|u| u.password == password)
}

/// The authenticated caller, as returned by `/oauth/userinfo`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub username: String,
    pub role: Role,
    pub full_name: String,
}

impl From<&MockUser> for UserInfo {
    fn from(user: &MockUser) -> Self {
        Self {
            username: user.username.to_string(),
            role: user.role,
            full_name: user.full_name.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error("Not authenticated")]
    MissingToken,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("User not found")]
    UnknownUser,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// A freshly issued access token.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: i64,
}

/// Issues and verifies access tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Authenticates against the mock table and issues a token.
    pub fn login(&self, username: &str, password: &str) -> AuthResult<IssuedToken> {
        let user = authenticate_user(username, password).ok_or(AuthError::InvalidCredentials)?;
        let token = self.issue(user)?;
        tracing::info!(user = user.username, "access token issued");
        Ok(token)
    }

    pub fn issue(&self, user: &MockUser) -> AuthResult<IssuedToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(AuthError::Signing)?;
        Ok(IssuedToken {
            access_token,
            expires_at: claims.exp,
        })
    }

    /// Verifies a token and resolves its subject.
    pub fn verify(&self, token: &str) -> AuthResult<UserInfo> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("token validation failed: {e}");
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })?;

        find_user(&data.claims.sub)
            .map(UserInfo::from)
            .ok_or(AuthError::UnknownUser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"unit-test-secret", Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES))
    }

    #[test]
    fn mock_credentials() {
        assert!(authenticate_user("clinician", "password123").is_some());
        assert!(authenticate_user("admin", "admin123").is_some());
        assert!(authenticate_user("clinician", "admin123").is_none());
        assert!(authenticate_user("nobody", "password123").is_none());
    }

    #[test]
    fn login_then_verify() {
        let tokens = service();
        let issued = tokens.login("clinician", "password123").unwrap();
        let user = tokens.verify(&issued.access_token).unwrap();
        assert_eq!(
            user,
            UserInfo {
                username: "clinician".into(),
                role: Role::Clinician,
                full_name: "Dr. Jane Smith".into(),
            }
        );
        assert!(issued.expires_at > Utc::now().timestamp());
    }

    #[test]
    fn bad_password_is_rejected() {
        assert!(matches!(
            service().login("admin", "wrong"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = TokenService::new(b"unit-test-secret", Duration::minutes(-5));
        let token = expired.issue(find_user("admin").unwrap()).unwrap();
        assert!(matches!(
            service().verify(&token.access_token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = TokenService::new(b"another-secret", Duration::minutes(5));
        let token = other.issue(find_user("clinician").unwrap()).unwrap();
        assert!(matches!(
            service().verify(&token.access_token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service().verify("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn debug_hides_keys() {
        let rendered = format!("{:?}", service());
        assert!(!rendered.contains("unit-test-secret"));
    }
}
