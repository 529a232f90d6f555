use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::principal::Claims;
use crate::error::{AppError, AppResult};
use crate::tprintln;

/// Issues and verifies HMAC-signed bearer tokens.
///
/// The secret is supplied at construction; nothing here falls back to a
/// built-in value.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl_secs", &self.ttl_secs).finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_secs: i64) -> AppResult<Self> {
        if secret.is_empty() {
            return Err(AppError::internal("missing_token_secret", "token secret must not be empty"));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; no grace window.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        })
    }

    pub fn issue(&self, email: &str) -> AppResult<String> {
        let now = chrono::Utc::now().timestamp();
        let exp = now.checked_add(self.ttl_secs).ok_or_else(|| {
            AppError::internal("token_ttl_overflow".to_string(), format!("token lifetime {}s overflows expiry", self.ttl_secs))
        })?;
        let claims = Claims { email: email.to_string(), iat: now, exp };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal("token_sign_failed".to_string(), format!("token encode: {}", e)))?;
        tprintln!("token.issue email={} exp={}", email, claims.exp);
        Ok(token)
    }

    /// Fails with an `Auth` error when the signature, format or expiry check fails.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::auth("invalid_token".to_string(), format!("invalid token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify() {
        let svc = TokenService::new("test-secret", 3600).unwrap();
        let token = svc.issue("test@example.com").unwrap();
        let claims = svc.verify(&token).unwrap();
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn verify_invalid_token_rejected() {
        let svc = TokenService::new("test-secret", 3600).unwrap();
        let err = svc.verify("invalid.token.here").unwrap_err();
        assert_eq!(err.http_status(), 401);
        assert_eq!(err.code_str(), "invalid_token");
    }

    #[test]
    fn verify_wrong_secret_rejected() {
        let issuer = TokenService::new("secret-a", 3600).unwrap();
        let verifier = TokenService::new("secret-b", 3600).unwrap();
        let token = issuer.issue("alice@example.com").unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn verify_expired_token_rejected() {
        let svc = TokenService::new("test-secret", -10).unwrap();
        let token = svc.issue("alice@example.com").unwrap();
        assert!(svc.verify(&token).is_err());
    }

    #[test]
    fn verify_tampered_payload_rejected() {
        let svc = TokenService::new("test-secret", 3600).unwrap();
        let token = svc.issue("alice@example.com").unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let other = svc.issue("mallory@example.com").unwrap();
        parts[1] = other.split('.').nth(1).unwrap().to_string();
        let forged = parts.join(".");
        assert!(svc.verify(&forged).is_err());
    }

    #[test]
    fn oversized_ttl_is_an_error() {
        let svc = TokenService::new("test-secret", i64::MAX).unwrap();
        let err = svc.issue("alice@example.com").unwrap_err();
        assert_eq!(err.code_str(), "token_ttl_overflow");
    }

    #[test]
    fn empty_secret_refused() {
        assert!(TokenService::new("", 3600).is_err());
    }
}
