use std::sync::Arc;

use tracing::{debug, info};

use super::principal::Claims;
use super::token::TokenService;
use crate::error::{AppError, AppResult};
use crate::model::{Credentials, LoginOutcome, UserRecord};
use crate::security::CredentialHasher;
use crate::storage::{run_blocking, UserStore};
use crate::tprintln;

/// Registration, login and token validation over a `UserStore`.
///
/// Bad credentials at login are a `LoginOutcome::Rejected` value. Duplicate
/// registration and invalid tokens are errors.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    tokens: TokenService,
    hasher: CredentialHasher,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenService, hasher: CredentialHasher) -> Self {
        Self { users, tokens, hasher }
    }

    /// Register an account and return its email.
    ///
    /// Uniqueness is a lookup before the insert, so two concurrent registrations
    /// of the same email can both succeed.
    pub async fn create_user(&self, creds: &Credentials) -> AppResult<String> {
        if self.users.find_by_email(&creds.email).await?.is_some() {
            debug!(target: "policyhub::auth", email = %creds.email, "registration refused: already registered");
            return Err(AppError::duplicate("duplicate_user", "This email is already registred"));
        }
        let hasher = self.hasher.clone();
        let password = creds.password.clone();
        let hash = run_blocking(move || hasher.hash_password(&password).map_err(AppError::from)).await?;
        self.users.insert(UserRecord { email: creds.email.clone(), password: hash }).await?;
        info!(target: "policyhub::auth", email = %creds.email, "user registered");
        Ok(creds.email.clone())
    }

    pub async fn login(&self, creds: &Credentials) -> AppResult<LoginOutcome> {
        let Some(user) = self.users.find_by_email(&creds.email).await? else {
            tprintln!("auth.login unknown email={}", creds.email);
            return Ok(LoginOutcome::Rejected);
        };
        let hasher = self.hasher.clone();
        let (stored, password) = (user.password.clone(), creds.password.clone());
        let matches = run_blocking(move || Ok(hasher.verify_password(&stored, &password))).await?;
        if !matches {
            tprintln!("auth.login bad password email={}", creds.email);
            return Ok(LoginOutcome::Rejected);
        }
        let access_token = self.tokens.issue(&user.email)?;
        debug!(target: "policyhub::auth", email = %user.email, "login succeeded");
        Ok(LoginOutcome::Authenticated { access_token })
    }

    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        self.tokens.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryUserStore, Stores};
    use tempfile::tempdir;

    fn service() -> AuthService {
        let stores = Stores::memory();
        AuthService::new(stores.users, TokenService::new("test-secret", 3600).unwrap(), CredentialHasher::new(1).unwrap())
    }

    fn creds(email: &str, pw: &str) -> Credentials { Credentials::new(email, pw) }

    #[tokio::test]
    async fn create_user_returns_email_and_stores_hash() {
        let users = Arc::new(MemoryUserStore::default());
        let svc = AuthService::new(users.clone(), TokenService::new("s", 60).unwrap(), CredentialHasher::new(1).unwrap());
        let email = svc.create_user(&creds("test@example.com", "password123")).await.unwrap();
        assert_eq!(email, "test@example.com");
        let stored = users.find_by_email("test@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password, "password123");
        assert!(stored.password.starts_with("$argon2id$"));
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn registering_twice_fails_with_duplicate() {
        let svc = service();
        svc.create_user(&creds("existing@example.com", "password123")).await.unwrap();
        let err = svc.create_user(&creds("existing@example.com", "other")).await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));
        assert_eq!(err.message(), "This email is already registred");
    }

    #[tokio::test]
    async fn login_unknown_email_is_soft_failure() {
        let out = service().login(&creds("nonexistent@example.com", "password123")).await.unwrap();
        assert_eq!(out, LoginOutcome::Rejected);
        assert_eq!(out.access_token(), "");
    }

    #[tokio::test]
    async fn login_wrong_password_is_soft_failure() {
        let svc = service();
        svc.create_user(&creds("test@example.com", "password123")).await.unwrap();
        let out = svc.login(&creds("test@example.com", "wrongpassword")).await.unwrap();
        assert_eq!(out, LoginOutcome::Rejected);
    }

    #[tokio::test]
    async fn login_token_validates_to_same_email() {
        let svc = service();
        svc.create_user(&creds("test@example.com", "password123")).await.unwrap();
        let out = svc.login(&creds("test@example.com", "password123")).await.unwrap();
        assert!(out.is_authenticated());
        let claims = svc.validate_token(out.access_token()).unwrap();
        assert_eq!(claims.email, "test@example.com");
    }

    #[tokio::test]
    async fn tampered_and_expired_tokens_are_invalid() {
        let svc = service();
        svc.create_user(&creds("test@example.com", "password123")).await.unwrap();
        let out = svc.login(&creds("test@example.com", "password123")).await.unwrap();
        let mut tampered = out.access_token().to_string();
        tampered.push('x');
        assert!(matches!(svc.validate_token(&tampered).unwrap_err(), AppError::Auth { .. }));

        let expired = TokenService::new("test-secret", -5).unwrap().issue("test@example.com").unwrap();
        assert!(matches!(svc.validate_token(&expired).unwrap_err(), AppError::Auth { .. }));
    }

    #[tokio::test]
    async fn long_email_register_and_login_on_document_store() {
        let tmp = tempdir().unwrap();
        let stores = Stores::open_documents(tmp.path(), "testdb").unwrap();
        let svc = AuthService::new(stores.users, TokenService::new("s", 60).unwrap(), CredentialHasher::new(1).unwrap());
        let long = format!("{}@example.com", "a".repeat(188));
        assert_eq!(long.len(), 200);

        let unknown = svc.login(&creds(&long, "password123")).await.unwrap();
        assert_eq!(unknown, LoginOutcome::Rejected);

        assert_eq!(svc.create_user(&creds(&long, "password123")).await.unwrap(), long);
        let out = svc.login(&creds(&long, "password123")).await.unwrap();
        assert!(out.is_authenticated());
        assert_eq!(svc.validate_token(out.access_token()).unwrap().email, long);
    }
}
