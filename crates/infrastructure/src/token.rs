//! JWT 签发与验证
//!
//! 访问令牌与刷新令牌各用一把密钥，互不相通。

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use application::token::{TokenClaims, TokenError, TokenIssuer};
use config::AuthConfig;
use domain::{UserEmail, UserId};

pub struct JwtTokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtTokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_ref()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_ref()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_ref()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_ref()),
            access_ttl: Duration::minutes(config.access_token_ttl_minutes),
            refresh_ttl: Duration::hours(config.refresh_token_ttl_hours),
        }
    }

    fn claims(user_id: UserId, email: &UserEmail, ttl: Duration) -> TokenClaims {
        let now = Utc::now();
        TokenClaims {
            sub: user_id.into(),
            email: email.as_str().to_owned(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    fn sign(claims: &TokenClaims, key: &EncodingKey) -> Result<String, TokenError> {
        encode(&Header::default(), claims, key)
            .map_err(|err| TokenError::Generation(err.to_string()))
    }

    fn decode_with(token: &str, key: &DecodingKey) -> Result<TokenClaims, TokenError> {
        decode::<TokenClaims>(token, key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

impl TokenIssuer for JwtTokenIssuer {
    fn issue_access_token(
        &self,
        user_id: UserId,
        email: &UserEmail,
    ) -> Result<String, TokenError> {
        let claims = Self::claims(user_id, email, self.access_ttl);
        Self::sign(&claims, &self.access_encoding)
    }

    fn issue_refresh_token(
        &self,
        user_id: UserId,
        email: &UserEmail,
    ) -> Result<String, TokenError> {
        let claims = Self::claims(user_id, email, self.refresh_ttl);
        Self::sign(&claims, &self.refresh_encoding)
    }

    fn verify_access_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        Self::decode_with(token, &self.access_decoding)
    }

    fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        Self::decode_with(token, &self.refresh_decoding)
    }
}
