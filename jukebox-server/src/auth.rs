use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts},
    routing::post,
    Json,
};
use chrono::Utc;
use jukebox_library::{Credentials, NewPlainUser, SessionData, UserData, UserRole};
use serde_json::json;

use crate::{
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{ForgotPasswordSchema, LoginSchema, RegisterSchema, ResetPasswordSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, User},
    Router,
};

/// Wraps [SessionData] so [FromRequestParts] can be implemented for it
pub struct Session(SessionData);

impl Session {
    /// Returns the user of the session
    pub fn user(&self) -> &UserData {
        &self.0.user
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Session {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        // The client sends the raw session token in the Authorization
        // header, with no scheme prefix
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or(ServerError::Unauthenticated)?;

        let session = state
            .library
            .auth
            .session(token.trim())
            .await
            .map_err(|_| ServerError::Unauthenticated)?;

        if session.expires_at < Utc::now() {
            return Err(ServerError::Unauthenticated);
        }

        Ok(Self(session))
    }
}

/// A [Session] that is only extracted for admin users, everyone else is
/// rejected before the handler runs
pub struct AdminSession(pub Session);

impl AdminSession {
    pub fn user(&self) -> &UserData {
        self.0.user()
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for AdminSession {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;

        if !session.user().role.is_admin() {
            return Err(ServerError::Forbidden("Admins only"));
        }

        Ok(Self(session))
    }
}

async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<Json<User>> {
    let role = if body.admin_key.as_deref() == Some(context.config.admin_key.as_str()) {
        UserRole::Admin
    } else {
        UserRole::User
    };

    let user = context
        .library
        .auth
        .register(
            NewPlainUser {
                username: body.username,
                password: body.password,
            },
            role,
        )
        .await?;

    Ok(Json(user.to_serialized()))
}

async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .library
        .auth
        .login(Credentials {
            username: body.username,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

async fn logout(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<serde_json::Value>> {
    context.library.auth.logout(session.token()).await?;

    Ok(Json(json!({ "msg": "Logged out" })))
}

async fn forgot_password(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ForgotPasswordSchema>,
) -> ServerResult<Json<serde_json::Value>> {
    // Unknown usernames get the same response as known ones
    match context.library.auth.begin_password_reset(&body.username).await {
        Ok(()) => {}
        Err(jukebox_library::AuthError::Db(jukebox_library::DatabaseError::NotFound {
            ..
        })) => {}
        Err(e) => return Err(e.into()),
    }

    Ok(Json(json!({ "msg": "If the account exists, a reset code has been issued" })))
}

async fn reset_password(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<ResetPasswordSchema>,
) -> ServerResult<Json<serde_json::Value>> {
    context
        .library
        .auth
        .reset_password(&body.username, &body.code, &body.new_password)
        .await?;

    Ok(Json(json!({ "msg": "Password updated" })))
}

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}
