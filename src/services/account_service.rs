use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::auth::{generate_jwt, validate_jwt_for_refresh, AuthError, Claims};
use crate::database::models::{Account, Partner, Session, Vendor};
use crate::database::{DatabaseError, DatabaseManager};
use crate::error::ApiError;
use crate::services::validation;
use crate::types::AccountRole;

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub expires_in: i64,
    pub account: Account,
}

/// Session state handed to clients: the account plus its marketplace profile.
#[derive(Debug, Clone, Serialize)]
pub struct WhoAmI {
    pub account: Account,
    pub session_id: Uuid,
    pub vendor: Option<Vendor>,
    pub partner: Option<Partner>,
}

pub struct AccountService {
    pool: PgPool,
}

impl AccountService {
    pub async fn new() -> Result<Self, DatabaseError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn signup(&self, request: SignupRequest) -> Result<TokenResponse, ApiError> {
        let email = validation::email("email", &request.email)?;
        let full_name = validation::required("full_name", &request.full_name)?;
        validate_password(&request.password)?;
        let role: AccountRole = request.role.parse()?;
        if !role.is_self_service() {
            return Err(ApiError::invalid_field("role", "Sign-up is only open to vendors and partners"));
        }

        let password_hash = hash_password(&request.password)?;
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, email, password_hash, full_name, role)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .bind(&full_name)
        .bind(role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DatabaseError::from_write(e, "An account with this email already exists"))?;

        let claims = Claims::new(account.id, Uuid::new_v4(), account.role, account.email.clone());
        insert_session(&mut *tx, &claims).await?;
        let token = generate_jwt(&claims)?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!("Account {} signed up as {}", account.id, account.role);
        Ok(TokenResponse {
            token,
            expires_in: claims.expires_in(),
            account,
        })
    }

    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse, ApiError> {
        let email = request.email.trim().to_lowercase();
        let account = self.find_by_email(&email).await?;

        // Same failure for unknown email and wrong password
        let Some(account) = account else {
            warn!("Login failed for unknown email");
            return Err(AuthError::InvalidCredentials.into());
        };
        if !verify_password(&request.password, &account.password_hash)? {
            warn!("Login failed for account {}", account.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        let claims = Claims::new(account.id, Uuid::new_v4(), account.role, account.email.clone());
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        insert_session(&mut *tx, &claims).await?;
        tx.commit().await.map_err(DatabaseError::from)?;

        info!("Account {} logged in (session {})", account.id, claims.sid);
        Ok(TokenResponse {
            token: generate_jwt(&claims)?,
            expires_in: claims.expires_in(),
            account,
        })
    }

    /// Reissue a token for the same session, extending the session's expiry.
    pub async fn refresh(&self, token: &str) -> Result<TokenResponse, ApiError> {
        let claims = validate_jwt_for_refresh(token)?;
        let renewed = claims.renewed();

        let updated = sqlx::query(
            "UPDATE sessions SET expires_at = $1
             WHERE id = $2 AND account_id = $3 AND revoked_at IS NULL",
        )
        .bind(renewed.expires_at())
        .bind(claims.sid)
        .bind(claims.sub)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if updated.rows_affected() == 0 {
            return Err(AuthError::SessionRevoked.into());
        }

        let account = self.get(claims.sub).await?;
        Ok(TokenResponse {
            token: generate_jwt(&renewed)?,
            expires_in: renewed.expires_in(),
            account,
        })
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE sessions SET revoked_at = now() WHERE id = $1 AND revoked_at IS NULL")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        info!("Session {} revoked", session_id);
        Ok(())
    }

    pub async fn whoami(&self, account_id: Uuid, session_id: Uuid) -> Result<WhoAmI, ApiError> {
        let account = self.get(account_id).await?;

        let vendor = match account.role {
            AccountRole::Vendor => {
                sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE account_id = $1")
                    .bind(account_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(DatabaseError::from)?
            }
            _ => None,
        };
        let partner = match account.role {
            AccountRole::Partner => {
                sqlx::query_as::<_, Partner>("SELECT * FROM partners WHERE account_id = $1")
                    .bind(account_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(DatabaseError::from)?
            }
            _ => None,
        };

        Ok(WhoAmI {
            account,
            session_id,
            vendor,
            partner,
        })
    }

    /// True when the session exists for this account and is neither revoked nor expired.
    pub async fn session_is_active(&self, session_id: Uuid, account_id: Uuid) -> Result<bool, DatabaseError> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1 AND account_id = $2")
            .bind(session_id)
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session.is_some_and(|s| s.is_active(Utc::now())))
    }

    /// Create the bootstrap admin if no account holds this email yet.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), ApiError> {
        let email = validation::email("email", email)?;
        if let Some(existing) = self.find_by_email(&email).await? {
            if existing.role != AccountRole::Admin {
                warn!("Bootstrap admin email {} belongs to a {} account", email, existing.role);
            }
            return Ok(());
        }

        validate_password(password)?;
        let password_hash = hash_password(password)?;
        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, full_name, role)
             VALUES ($1, $2, $3, 'Administrator', 'admin')
             ON CONFLICT (email) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(&password_hash)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        info!("Created bootstrap admin account {}", email);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DatabaseError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn get(&self, account_id: Uuid) -> Result<Account, DatabaseError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("Account not found".to_string()))
    }
}

async fn insert_session(tx: &mut sqlx::PgConnection, claims: &Claims) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO sessions (id, account_id, expires_at) VALUES ($1, $2, $3)")
        .bind(claims.sid)
        .bind(claims.sub)
        .bind(claims.expires_at())
        .execute(tx)
        .await?;
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::invalid_field(
            "password",
            format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validate_jwt;
    use crate::config;
    use crate::testing::{self, PASSWORD};
    use axum::http::StatusCode;

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    /// A token for an existing session whose expiry lies `ago` in the past.
    fn expired_token(issued: &TokenResponse, ago: chrono::Duration) -> String {
        let claims = validate_jwt(&issued.token).unwrap();
        let stale = Claims::with_lifetime(claims.sub, claims.sid, claims.role, claims.email, -ago);
        generate_jwt(&stale).unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn duplicate_email_conflicts(pool: PgPool) {
        testing::signup(&pool, "jo@example.com", "vendor").await;

        let err = AccountService::with_pool(pool)
            .signup(SignupRequest {
                email: " JO@example.com ".into(),
                password: PASSWORD.into(),
                full_name: "Jo Again".into(),
                role: "partner".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn admin_role_is_not_self_service(pool: PgPool) {
        let err = AccountService::with_pool(pool)
            .signup(SignupRequest {
                email: "root@example.com".into(),
                password: PASSWORD.into(),
                full_name: "Root".into(),
                role: "admin".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn login_failures_are_indistinguishable(pool: PgPool) {
        testing::signup(&pool, "jo@example.com", "partner").await;
        let service = AccountService::with_pool(pool);

        let unknown = service
            .login(LoginRequest {
                email: "nobody@example.com".into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap_err();
        let wrong = service
            .login(LoginRequest {
                email: "jo@example.com".into(),
                password: "not the password".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(unknown.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.message(), wrong.message());
        assert_eq!(unknown.error_code(), wrong.error_code());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn login_opens_a_new_session(pool: PgPool) {
        let signed_up = testing::signup(&pool, "jo@example.com", "vendor").await;
        let service = AccountService::with_pool(pool);

        let logged_in = service
            .login(LoginRequest {
                email: "Jo@Example.com".into(),
                password: PASSWORD.into(),
            })
            .await
            .unwrap();
        let first = validate_jwt(&signed_up.token).unwrap();
        let second = validate_jwt(&logged_in.token).unwrap();

        assert_eq!(first.sub, second.sub);
        assert_ne!(first.sid, second.sid);
        assert!(service.session_is_active(first.sid, first.sub).await.unwrap());
        assert!(service.session_is_active(second.sid, second.sub).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn refresh_inside_window_keeps_the_session(pool: PgPool) {
        let issued = testing::signup(&pool, "jo@example.com", "vendor").await;
        let stale = expired_token(&issued, chrono::Duration::days(1));
        let service = AccountService::with_pool(pool);

        let refreshed = service.refresh(&stale).await.unwrap();
        let before = validate_jwt(&issued.token).unwrap();
        let after = validate_jwt(&refreshed.token).unwrap();

        assert_eq!(after.sid, before.sid);
        assert_eq!(refreshed.account.id, issued.account.id);
        assert!(refreshed.expires_in > 0);
        assert!(service.session_is_active(after.sid, after.sub).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn refresh_outside_window_fails(pool: PgPool) {
        let issued = testing::signup(&pool, "jo@example.com", "vendor").await;
        let window = config::config().security.refresh_window_days;
        let stale = expired_token(&issued, chrono::Duration::days(window + 1));

        let err = AccountService::with_pool(pool).refresh(&stale).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn refresh_after_logout_fails(pool: PgPool) {
        let issued = testing::signup(&pool, "jo@example.com", "partner").await;
        let claims = validate_jwt(&issued.token).unwrap();
        let service = AccountService::with_pool(pool);

        service.logout(claims.sid).await.unwrap();

        assert!(!service.session_is_active(claims.sid, claims.sub).await.unwrap());
        let err = service.refresh(&issued.token).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn whoami_includes_own_profile_only(pool: PgPool) {
        let (account_id, vendor) = testing::vendor(&pool, "acme@example.com").await;
        let service = AccountService::with_pool(pool);

        let me = service.whoami(account_id, Uuid::new_v4()).await.unwrap();
        assert_eq!(me.vendor.map(|v| v.id), Some(vendor.id));
        assert!(me.partner.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn ensure_admin_is_idempotent(pool: PgPool) {
        let first = testing::admin(&pool).await;
        let second = testing::admin(&pool).await;
        assert_eq!(first, second);

        let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = 'admin'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(admins, 1);
    }
}
