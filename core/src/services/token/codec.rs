//! JWT token codec

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sg_shared::config::JwtConfig;
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::entities::token::{Claims, TokenPair, TokenType};
use crate::errors::{DomainError, TokenError};

/// Signs and verifies access and refresh tokens with a shared HMAC secret
pub struct TokenCodec {
    config: JwtConfig,
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Creates a new codec
    ///
    /// # Arguments
    ///
    /// * `config` - JWT configuration with secret, algorithm and lifetimes
    ///
    /// # Returns
    ///
    /// * `Err(DomainError::Config)` - No secret configured, a non-HMAC
    ///   algorithm was requested, or a lifetime is not positive
    pub fn new(config: JwtConfig) -> Result<Self, DomainError> {
        let secret = config
            .secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| DomainError::Config {
                message: "JWT secret is not configured".to_string(),
            })?;

        let algorithm = parse_hmac_algorithm(&config.algorithm)?;

        if config.access_token_expiry <= 0
            || config.refresh_token_expiry <= 0
            || config.remember_refresh_token_expiry <= 0
        {
            return Err(DomainError::Config {
                message: "Token lifetimes must be positive".to_string(),
            });
        }

        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Ok(Self {
            header: Header::new(algorithm),
            config,
            encoding_key,
            decoding_key,
            validation,
        })
    }

    /// JWT configuration this codec was built from
    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Lifetime in seconds of a token of the given type
    pub fn ttl_seconds(&self, token_type: TokenType, remember: bool) -> i64 {
        match token_type {
            TokenType::Access => self.config.access_token_expiry,
            TokenType::Refresh => self.config.refresh_expiry_for(remember),
        }
    }

    /// Issues a signed token with a fresh `jti`
    ///
    /// # Returns
    ///
    /// * `Ok((String, Claims))` - The encoded token and the claims it carries
    pub fn issue(
        &self,
        subject: &str,
        remember: bool,
        token_type: TokenType,
    ) -> Result<(String, Claims), DomainError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            nbf: now,
            exp: now + self.ttl_seconds(token_type, remember),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            jti: Uuid::new_v4().to_string(),
            typ: token_type,
            remember,
        };

        let token = encode(&self.header, &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, token_type = %token_type, "Failed to sign token");
            DomainError::Token(TokenError::TokenGenerationFailed)
        })?;

        Ok((token, claims))
    }

    /// Verifies signature, expiry, not-before, issuer, audience and type
    ///
    /// Every failure collapses to `TokenError::InvalidToken`.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            debug!(error = %e, expected = %expected, "Token rejected");
            TokenError::InvalidToken
        })?;

        if data.claims.typ != expected {
            debug!(
                expected = %expected,
                actual = %data.claims.typ,
                "Token rejected: wrong token type"
            );
            return Err(TokenError::InvalidToken);
        }

        Ok(data.claims)
    }

    /// Issues an access token and a refresh token for the same session
    pub fn issue_pair(&self, subject: &str, remember: bool) -> Result<TokenPair, DomainError> {
        let (access_token, _) = self.issue(subject, remember, TokenType::Access)?;
        let (refresh_token, _) = self.issue(subject, remember, TokenType::Refresh)?;

        Ok(TokenPair::new(
            access_token,
            refresh_token,
            self.ttl_seconds(TokenType::Access, remember),
            self.ttl_seconds(TokenType::Refresh, remember),
            remember,
        ))
    }
}

fn parse_hmac_algorithm(name: &str) -> Result<Algorithm, DomainError> {
    match name.to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(DomainError::Config {
            message: format!(
                "Unsupported JWT algorithm '{}', expected HS256, HS384 or HS512",
                other
            ),
        }),
    }
}
