use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
    Json,
};
use jukebox_library::{NewUpload, PrimaryKey, UpdatedSong};
use serde_json::json;

use crate::{
    auth::{AdminSession, Session},
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{UpdateSongSchema, ValidatedJson},
    serialized::{LikeResult, Song, SongWithLike, ToSerialized},
    Router,
};

const COVER_PLACEHOLDER: &str = "https://via.placeholder.com/300x300.png?text=No+Cover";

async fn upload(
    session: AdminSession,
    State(context): State<ServerContext>,
    mut multipart: Multipart,
) -> ServerResult<Json<Song>> {
    let upload = read_file_field(&mut multipart).await?;

    let song = context.library.catalog.upload(session.user(), upload).await?;

    Ok(Json(song.to_serialized()))
}

async fn list_songs(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<SongWithLike>>> {
    let songs = context
        .library
        .catalog
        .list_with_likes(session.user().id)
        .await?;

    Ok(Json(songs.to_serialized()))
}

async fn update_song(
    _session: AdminSession,
    State(context): State<ServerContext>,
    Path(song_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<UpdateSongSchema>,
) -> ServerResult<Json<Song>> {
    let song = context
        .library
        .catalog
        .update_song(UpdatedSong {
            id: song_id,
            title: body.title,
            artist: body.artist,
        })
        .await?;

    Ok(Json(song.to_serialized()))
}

async fn delete_song(
    _session: AdminSession,
    State(context): State<ServerContext>,
    Path(song_id): Path<PrimaryKey>,
) -> ServerResult<Json<serde_json::Value>> {
    context.library.catalog.delete_song(song_id).await?;

    Ok(Json(json!({ "msg": "Deleted" })))
}

async fn cover(
    State(context): State<ServerContext>,
    Path(song_id): Path<PrimaryKey>,
) -> ServerResult<Response> {
    let cover = context.library.catalog.cover(song_id).await.ok().flatten();

    // Songs without embedded art fall back to a placeholder image
    let Some(cover) = cover else {
        return Ok(Redirect::temporary(COVER_PLACEHOLDER).into_response());
    };

    Ok(([(header::CONTENT_TYPE, cover.content_type)], cover.data).into_response())
}

async fn toggle_like(
    session: Session,
    State(context): State<ServerContext>,
    Path(song_id): Path<PrimaryKey>,
) -> ServerResult<Json<LikeResult>> {
    let liked = context
        .library
        .catalog
        .toggle_like(session.user().id, song_id)
        .await?;

    Ok(Json(LikeResult { liked }))
}

/// Pulls the `file` field of a multipart form as an upload
async fn read_file_field(multipart: &mut Multipart) -> Result<NewUpload, ServerError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ServerError::BadRequest("Malformed multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.mp3".to_string());

        let bytes = field
            .bytes()
            .await
            .map_err(|_| ServerError::BadRequest("Malformed multipart body"))?
            .to_vec();

        return Ok(NewUpload {
            file_name,
            bytes,
        });
    }

    Err(ServerError::BadRequest("No file"))
}

pub fn router() -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/songs", get(list_songs))
        .route("/songs/:id", put(update_song).delete(delete_song))
        .route("/songs/:id/cover", get(cover))
        .route("/songs/like/:id", post(toggle_like))
}
