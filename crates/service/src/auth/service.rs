use std::sync::Arc;

use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use rand::rngs::OsRng;
use tracing::{info, debug, instrument};
use uuid::Uuid;

use super::domain::{RegisterInput, LoginInput, AuthUser, AuthSession, Claims, NewAccount};
use super::errors::AuthError;
use super::repository::AuthRepository;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub password_algorithm: String,
    pub token_ttl_hours: i64,
}

impl AuthConfig {
    pub fn from_config(cfg: &configs::AuthConfig) -> Self {
        let secret = cfg.jwt_secret.trim();
        Self {
            jwt_secret: (!secret.is_empty()).then(|| secret.to_string()),
            password_algorithm: "argon2".into(),
            token_ttl_hours: cfg.token_ttl_hours,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self { Self { jwt_secret: None, password_algorithm: "argon2".into(), token_ttl_hours: 12 } }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Register a new user with a hashed password.
    ///
    /// The first registrant of an unknown tenant creates it and becomes its admin.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::RegisterInput;
    /// use models::user::Role;
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo, AuthConfig::default());
    /// let tid = uuid::Uuid::new_v4();
    /// let input = RegisterInput { tenant_id: tid, tenant_name: None, email: "User@Example.com".into(), name: "Test".into(), password: "Secret123".into() };
    /// let first = tokio_test::block_on(svc.register(input)).unwrap();
    /// assert_eq!(first.email, "user@example.com");
    /// assert_eq!(first.role, Role::Admin);
    /// let second = tokio_test::block_on(svc.register(RegisterInput { tenant_id: tid, tenant_name: None, email: "b@example.com".into(), name: "B".into(), password: "Secret123".into() })).unwrap();
    /// assert_eq!(second.role, Role::User);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, tenant_id = %input.tenant_id))]
    pub async fn register(&self, input: RegisterInput) -> Result<AuthUser, AuthError> {
        if input.password.len() < 8 {
            return Err(AuthError::Validation("password too short (>=8)".into()));
        }
        let email = input.email.trim().to_ascii_lowercase();
        models::user::validate_email(&email).map_err(|e| AuthError::Validation(e.to_string()))?;
        models::user::validate_name(&input.name).map_err(|e| AuthError::Validation(e.to_string()))?;

        if let Some(existing) = self.repo.find_user_by_tenant_email(input.tenant_id, &email).await? {
            debug!("user exists: {}", existing.email);
            return Err(AuthError::Conflict);
        }

        let tenant_name = input
            .tenant_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("tenant-{}", input.tenant_id));
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let (user, created_tenant) = self.repo.register_account(NewAccount {
            tenant_id: input.tenant_id,
            tenant_name,
            email,
            name: input.name,
            password_hash: hash,
            password_algorithm: self.cfg.password_algorithm.clone(),
        }).await?;
        info!(user_id = %user.id, tenant_id = %user.tenant_id, role = %user.role, created_tenant, "user_registered");
        Ok(user)
    }

    /// Authenticate a user and optionally issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{service::{AuthService, AuthConfig, decode_token}, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{RegisterInput, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let cfg = AuthConfig { jwt_secret: Some("secret".into()), ..AuthConfig::default() };
    /// let svc = AuthService::new(repo.clone(), cfg);
    /// let tid = uuid::Uuid::new_v4();
    /// let _ = tokio_test::block_on(svc.register(RegisterInput { tenant_id: tid, tenant_name: None, email: "u@e.com".into(), name: "N".into(), password: "Passw0rd".into() }));
    /// let session = tokio_test::block_on(svc.login(LoginInput { tenant_id: tid, email: "u@e.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.email, "u@e.com");
    /// let claims = decode_token("secret", session.token.as_deref().unwrap()).unwrap();
    /// assert_eq!(claims.actor().unwrap().tenant_id, tid);
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email, tenant_id = %input.tenant_id))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let email = input.email.trim().to_ascii_lowercase();
        let user = self.repo
            .find_user_by_tenant_email(input.tenant_id, &email)
            .await?
            .ok_or(AuthError::Unauthorized)?;
        if !user.active {
            debug!(user_id = %user.id, "login_rejected_inactive");
            return Err(AuthError::Unauthorized);
        }

        let cred = self.repo
            .get_credentials(user.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let parsed = PasswordHash::new(&cred.password_hash).map_err(|e| AuthError::HashError(e.to_string()))?;
        if Argon2::default().verify_password(input.password.as_bytes(), &parsed).is_err() {
            return Err(AuthError::Unauthorized);
        }

        let token = match &self.cfg.jwt_secret {
            Some(secret) => Some(self.issue_token(secret, &user)?),
            None => None,
        };
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, token })
    }

    /// Current user behind a decoded token; disabled or deleted accounts are rejected.
    pub async fn me(&self, user_id: Uuid) -> Result<AuthUser, AuthError> {
        let user = self.repo.find_user_by_id(user_id).await?.ok_or(AuthError::NotFound)?;
        if !user.active { return Err(AuthError::Unauthorized); }
        Ok(user)
    }

    fn issue_token(&self, secret: &str, user: &AuthUser) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(self.cfg.token_ttl_hours)).timestamp() as usize;
        let claims = Claims { sub: user.email.clone(), uid: user.id.to_string(), tid: user.tenant_id.to_string(), role: user.role, exp };
        encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }
}

/// Verify an HS256 token and return its claims. Expired tokens are rejected.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AuthError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::new(Algorithm::HS256))
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::user::Role;
    use crate::auth::repository::mock::MockAuthRepository;

    fn svc(repo: Arc<MockAuthRepository>) -> AuthService<MockAuthRepository> {
        AuthService::new(repo, AuthConfig { jwt_secret: Some("test-secret".into()), ..AuthConfig::default() })
    }

    fn reg(tid: Uuid, email: &str) -> RegisterInput {
        RegisterInput { tenant_id: tid, tenant_name: Some("Acme".into()), email: email.into(), name: "N".into(), password: "Passw0rd!".into() }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let s = svc(Arc::new(MockAuthRepository::default()));
        let tid = Uuid::new_v4();
        s.register(reg(tid, "a@b.io")).await.unwrap();
        let err = s.register(reg(tid, "A@B.io")).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict));
    }

    #[tokio::test]
    async fn short_password_and_bad_email_are_rejected() {
        let s = svc(Arc::new(MockAuthRepository::default()));
        let mut input = reg(Uuid::new_v4(), "a@b.io");
        input.password = "short".into();
        assert!(matches!(s.register(input).await, Err(AuthError::Validation(_))));
        assert!(matches!(s.register(reg(Uuid::new_v4(), "nope")).await, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn token_carries_role_and_tenant() {
        let s = svc(Arc::new(MockAuthRepository::default()));
        let tid = Uuid::new_v4();
        s.register(reg(tid, "a@b.io")).await.unwrap();
        let session = s.login(LoginInput { tenant_id: tid, email: "a@b.io".into(), password: "Passw0rd!".into() }).await.unwrap();
        let claims = decode_token("test-secret", session.token.as_deref().unwrap()).unwrap();
        assert_eq!(claims.role, Role::Admin);
        let actor = claims.actor().unwrap();
        assert_eq!(actor.user_id, session.user.id);
        assert_eq!(actor.tenant_id, tid);
    }

    #[tokio::test]
    async fn wrong_password_and_disabled_user_are_unauthorized() {
        let repo = Arc::new(MockAuthRepository::default());
        let s = svc(repo.clone());
        let tid = Uuid::new_v4();
        let user = s.register(reg(tid, "a@b.io")).await.unwrap();
        let bad = s.login(LoginInput { tenant_id: tid, email: "a@b.io".into(), password: "wrong-pass".into() }).await;
        assert!(matches!(bad, Err(AuthError::Unauthorized)));

        repo.set_active(user.id, false);
        let disabled = s.login(LoginInput { tenant_id: tid, email: "a@b.io".into(), password: "Passw0rd!".into() }).await;
        assert!(matches!(disabled, Err(AuthError::Unauthorized)));
        assert!(matches!(s.me(user.id).await, Err(AuthError::Unauthorized)));
    }

    #[test]
    fn tampered_or_foreign_tokens_fail_to_decode() {
        assert!(matches!(decode_token("k", "not.a.jwt"), Err(AuthError::InvalidToken(_))));
        let claims = Claims { sub: "a@b".into(), uid: Uuid::new_v4().to_string(), tid: Uuid::new_v4().to_string(), role: Role::User, exp: (chrono::Utc::now().timestamp() + 60) as usize };
        let token = encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(b"one")).unwrap();
        assert!(decode_token("two", &token).is_err());
        assert!(decode_token("one", &token).is_ok());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let claims = Claims { sub: "a@b".into(), uid: Uuid::new_v4().to_string(), tid: Uuid::new_v4().to_string(), role: Role::User, exp: (chrono::Utc::now().timestamp() - 3600) as usize };
        let token = encode(&JwtHeader::default(), &claims, &EncodingKey::from_secret(b"k")).unwrap();
        assert!(matches!(decode_token("k", &token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn blank_secret_disables_tokens() {
        let cfg = AuthConfig::from_config(&configs::AuthConfig { jwt_secret: "  ".into(), token_ttl_hours: 2, cookie_secure: false });
        assert!(cfg.jwt_secret.is_none());
        assert_eq!(cfg.token_ttl_hours, 2);
    }
}
