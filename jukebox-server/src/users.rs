use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json,
};
use jukebox_library::{NewBlob, PrimaryKey};
use serde_json::json;

use crate::{
    auth::{AdminSession, Session},
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{UpdateProfileSchema, ValidatedJson},
    serialized::{ToSerialized, User},
    Router,
};

async fn list_users(
    _session: AdminSession,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<User>>> {
    let users = context.library.auth.list_users().await?;

    Ok(Json(users.to_serialized()))
}

async fn delete_user(
    _session: AdminSession,
    State(context): State<ServerContext>,
    Path(user_id): Path<PrimaryKey>,
) -> ServerResult<Json<serde_json::Value>> {
    context.library.auth.delete_user(user_id).await?;

    Ok(Json(json!({ "msg": "Deleted" })))
}

async fn profile(session: Session) -> Json<User> {
    Json(session.user().to_serialized())
}

async fn update_profile(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<UpdateProfileSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .library
        .auth
        .update_profile(session.user().id, body.username, body.password)
        .await?;

    Ok(Json(user.to_serialized()))
}

async fn upload_avatar(
    session: Session,
    State(context): State<ServerContext>,
    mut multipart: Multipart,
) -> ServerResult<Json<serde_json::Value>> {
    let avatar = read_image_field(&mut multipart).await?;

    context.library.auth.set_avatar(session.user().id, avatar).await?;

    Ok(Json(json!({ "msg": "Avatar updated" })))
}

// The path parameter is named :id to line up with the delete route, but it
// carries the username here
async fn avatar(
    State(context): State<ServerContext>,
    Path(username): Path<String>,
) -> ServerResult<Response> {
    let avatar = context
        .library
        .auth
        .avatar_by_username(&username)
        .await
        .ok()
        .flatten();

    // A missing user or avatar both fall back to a generated placeholder
    let Some(avatar) = avatar else {
        let placeholder = format!(
            "https://ui-avatars.com/api/?name={username}&background=1DB954&color=fff"
        );

        return Ok(Redirect::temporary(&placeholder).into_response());
    };

    Ok(([(header::CONTENT_TYPE, avatar.content_type)], avatar.data).into_response())
}

/// Pulls the `file` field of a multipart form as an image blob
async fn read_image_field(multipart: &mut Multipart) -> Result<NewBlob, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ServerError::BadRequest("Malformed multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                field
                    .file_name()
                    .map(|name| mime_guess::from_path(name).first_or_octet_stream().to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|_| ServerError::BadRequest("Malformed multipart body"))?
            .to_vec();

        return Ok(NewBlob { data, content_type });
    }

    Err(ServerError::BadRequest("No file"))
}

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id", delete(delete_user))
        .route("/users/profile", get(profile).put(update_profile))
        .route("/users/avatar", post(upload_avatar))
        .route("/users/:id/avatar", get(avatar))
}
