use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use log::info;
use rand::rngs::OsRng;
use std::sync::Arc;
use thiserror::Error;

use crate::{
    util::{numeric_code, random_string},
    Database, DatabaseError, NewBlob, NewOneTimeCode, NewSession, NewUser, PrimaryKey,
    SessionData, UpdatedUser, UserData, UserRole,
};

pub struct Auth<Db> {
    db: Arc<Db>,
    argon: Argon2<'static>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The reset code is wrong, expired, or was never requested
    #[error("Invalid or expired reset code")]
    InvalidResetCode,
    /// Admin accounts cannot be deleted through the exposed operations
    #[error("Admin accounts cannot be deleted")]
    AdminImmutable,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl<Db> Auth<Db>
where
    Db: Database,
{
    const SESSION_DURATION_IN_DAYS: usize = 7;
    const RESET_CODE_DURATION_IN_MINUTES: usize = 10;
    const RESET_CODE_LENGTH: usize = 6;

    pub fn new(db: &Arc<Db>) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await;

        let user = self
            .db
            .user_by_username(&credentials.username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS as i64);

        let new_session = NewSession {
            token: random_string(32),
            user_id: user.id,
            expires_at,
        };

        let new_session = self
            .db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)?;

        Ok(new_session)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Creates a user with the given role
    pub async fn register(
        &self,
        new_user: NewPlainUser,
        role: UserRole,
    ) -> Result<UserData, AuthError> {
        let password = self.hash_password(&new_user.password)?;

        self.db
            .create_user(NewUser {
                username: new_user.username,
                password,
                role,
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Generates a one-time passcode for the account and delivers it
    /// out-of-band, by logging it
    pub async fn begin_password_reset(&self, username: &str) -> Result<(), AuthError> {
        let user = self
            .db
            .user_by_username(username)
            .await
            .map_err(AuthError::Db)?;

        let code = numeric_code(Self::RESET_CODE_LENGTH);
        let expires_at =
            Utc::now() + Duration::minutes(Self::RESET_CODE_DURATION_IN_MINUTES as i64);

        self.db
            .set_one_time_code(user.id, NewOneTimeCode { code: code.clone(), expires_at })
            .await
            .map_err(AuthError::Db)?;

        info!("password reset code for {}: {}", user.username, code);

        Ok(())
    }

    /// Sets a new password if the supplied one-time passcode is valid
    pub async fn reset_password(
        &self,
        username: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .db
            .user_by_username(username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => AuthError::InvalidResetCode,
                err => AuthError::Db(err),
            })?;

        let valid = user.one_time_code.as_deref() == Some(code)
            && user
                .one_time_code_expires_at
                .is_some_and(|expiry| expiry > Utc::now());

        if !valid {
            return Err(AuthError::InvalidResetCode);
        }

        let password = self.hash_password(new_password)?;

        self.db
            .update_user(UpdatedUser {
                id: user.id,
                username: None,
                password: Some(password),
            })
            .await
            .map_err(AuthError::Db)?;

        self.db
            .clear_one_time_code(user.id)
            .await
            .map_err(AuthError::Db)
    }

    /// Self-service update of username and password
    pub async fn update_profile(
        &self,
        user_id: PrimaryKey,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<UserData, AuthError> {
        let password = password
            .map(|plain| self.hash_password(&plain))
            .transpose()?;

        self.db
            .update_user(UpdatedUser {
                id: user_id,
                username,
                password,
            })
            .await
            .map_err(AuthError::Db)
    }

    /// Deletes a user account. Admin accounts are refused.
    pub async fn delete_user(&self, user_id: PrimaryKey) -> Result<(), AuthError> {
        let user = self.db.user_by_id(user_id).await.map_err(AuthError::Db)?;

        if user.role.is_admin() {
            return Err(AuthError::AdminImmutable);
        }

        self.db.delete_user(user_id).await.map_err(AuthError::Db)
    }

    pub async fn list_users(&self) -> Result<Vec<UserData>, DatabaseError> {
        self.db.list_users().await
    }

    pub async fn set_avatar(
        &self,
        user_id: PrimaryKey,
        avatar: NewBlob,
    ) -> Result<(), DatabaseError> {
        self.db.set_user_avatar(user_id, avatar).await
    }

    pub async fn avatar_by_username(
        &self,
        username: &str,
    ) -> Result<Option<crate::BlobData>, DatabaseError> {
        self.db.avatar_by_username(username).await
    }

    /// Returns a session if it exists
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        self.db.session_by_token(token).await
    }

    fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        Ok(self
            .argon
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string())
    }

    async fn clear_expired(&self) {
        self.db
            .clear_expired_sessions()
            .await
            .expect("sessions are cleared")
    }
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewPlainUser {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::SqliteDatabase;

    async fn auth() -> Auth<SqliteDatabase> {
        let db = Arc::new(
            SqliteDatabase::new("sqlite::memory:")
                .await
                .expect("in-memory database opens"),
        );

        Auth::new(&db)
    }

    fn plain(username: &str) -> NewPlainUser {
        NewPlainUser {
            username: username.to_string(),
            password: "hunter2hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn register_login_session_round_trip() {
        let auth = auth().await;

        let user = auth.register(plain("john"), UserRole::User).await.unwrap();
        assert_eq!(user.role, UserRole::User);
        // Passwords are stored hashed
        assert_ne!(user.password, "hunter2hunter2");

        let session = auth
            .login(Credentials {
                username: "john".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await
            .unwrap();

        let found = auth.session(&session.token).await.unwrap();
        assert_eq!(found.user.username, "john");
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = auth().await;
        auth.register(plain("john"), UserRole::User).await.unwrap();

        let result = auth
            .login(Credentials {
                username: "john".to_string(),
                password: "wrong".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn unknown_user_is_rejected_like_a_wrong_password() {
        let auth = auth().await;

        let result = auth
            .login(Credentials {
                username: "nobody".to_string(),
                password: "whatever".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn password_reset_with_valid_code() {
        let auth = auth().await;
        let user = auth.register(plain("mary"), UserRole::User).await.unwrap();

        auth.begin_password_reset("mary").await.unwrap();

        let stored = auth.db.user_by_id(user.id).await.unwrap();
        let code = stored.one_time_code.expect("code was stored");

        auth.reset_password("mary", &code, "newpassword123")
            .await
            .unwrap();

        // Old password no longer works, new one does
        assert!(matches!(
            auth.login(Credentials {
                username: "mary".to_string(),
                password: "hunter2hunter2".to_string(),
            })
            .await,
            Err(AuthError::InvalidCredentials)
        ));

        auth.login(Credentials {
            username: "mary".to_string(),
            password: "newpassword123".to_string(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn stale_reset_codes_are_rejected() {
        let auth = auth().await;
        let user = auth.register(plain("mary"), UserRole::User).await.unwrap();

        auth.db
            .set_one_time_code(
                user.id,
                NewOneTimeCode {
                    code: "123456".to_string(),
                    expires_at: Utc::now() - Duration::minutes(1),
                },
            )
            .await
            .unwrap();

        let result = auth.reset_password("mary", "123456", "newpassword123").await;
        assert!(matches!(result, Err(AuthError::InvalidResetCode)));
    }

    #[tokio::test]
    async fn admin_accounts_cannot_be_deleted() {
        let auth = auth().await;

        let admin = auth.register(plain("root"), UserRole::Admin).await.unwrap();
        let user = auth.register(plain("john"), UserRole::User).await.unwrap();

        assert!(matches!(
            auth.delete_user(admin.id).await,
            Err(AuthError::AdminImmutable)
        ));

        auth.delete_user(user.id).await.unwrap();
    }
}
