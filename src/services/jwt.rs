use crate::errors::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub struct JwtManager {
    secret: String,
}

impl JwtManager {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::ConfigError("JWT_SECRET must be set".to_string()))?;
        Ok(Self::new(secret))
    }

    /// Issues a token for an actor. The platform's identity provider normally
    /// does this; kept here for tooling and tests.
    pub fn generate_token(&self, actor_id: &Uuid, role: &str, email: Option<&str>) -> Result<String> {
        let now = Utc::now();
        let expiration = now + Duration::hours(24);
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: actor_id.to_string(),
            role: role.to_string(),
            email: email.map(str::to_string),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            jti,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Failed to generate token: {}", e)))?;

        Ok(token)
    }

    pub fn validate_token(&self, token: &str) -> Result<TokenData<Claims>> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

        Ok(token_data)
    }
}

/// The authenticated identity attached to a request by the bearer-token
/// extractor. `actor_id` is what the route handlers scope queries by.
#[derive(Debug, Clone)]
pub struct Actor {
    pub actor_id: Uuid,
    pub role: String,
    pub email: Option<String>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

impl TryFrom<Claims> for Actor {
    type Error = AppError;

    fn try_from(claims: Claims) -> Result<Self> {
        let actor_id = Uuid::parse_str(&claims.sub)
            .map_err(|e| AppError::ValidationError(format!("Invalid actor ID in token: {}", e)))?;

        Ok(Self {
            actor_id,
            role: claims.role,
            email: claims.email,
        })
    }
}
