use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};
use jukebox_library::PrimaryKey;
use serde_json::json;

use crate::{
    auth::{AdminSession, Session},
    context::ServerContext,
    errors::ServerResult,
    schemas::{AddSongSchema, NewPlaylistSchema, ValidatedJson},
    serialized::{annotate_playlist, Playlist, PlaylistWithLikes, ToSerialized},
    Router,
};

async fn create_playlist(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewPlaylistSchema>,
) -> ServerResult<Json<Playlist>> {
    let playlist = context
        .library
        .playlists
        .create(body.name, session.user())
        .await?;

    Ok(Json(playlist.to_serialized()))
}

async fn own_playlists(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Playlist>>> {
    let playlists = context.library.playlists.for_user(session.user().id).await?;

    Ok(Json(playlists.to_serialized()))
}

async fn public_playlists(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Playlist>>> {
    let playlists = context.library.playlists.public().await?;

    Ok(Json(playlists.to_serialized()))
}

async fn playlist(
    session: Session,
    State(context): State<ServerContext>,
    Path(playlist_id): Path<PrimaryKey>,
) -> ServerResult<Json<PlaylistWithLikes>> {
    let playlist = context.library.playlists.by_id(playlist_id).await?;
    let liked = context
        .library
        .catalog
        .liked_song_ids(session.user().id)
        .await?;

    Ok(Json(annotate_playlist(&playlist, &liked)))
}

async fn add_song(
    session: Session,
    State(context): State<ServerContext>,
    Path(playlist_id): Path<PrimaryKey>,
    ValidatedJson(body): ValidatedJson<AddSongSchema>,
) -> ServerResult<Json<Playlist>> {
    let playlist = context
        .library
        .playlists
        .add_song(playlist_id, body.song_id, session.user())
        .await?;

    Ok(Json(playlist.to_serialized()))
}

async fn delete_playlist(
    _session: AdminSession,
    State(context): State<ServerContext>,
    Path(playlist_id): Path<PrimaryKey>,
) -> ServerResult<Json<serde_json::Value>> {
    context.library.playlists.delete(playlist_id).await?;

    Ok(Json(json!({ "msg": "Deleted" })))
}

pub fn router() -> Router {
    Router::new()
        .route("/playlists", post(create_playlist))
        .route("/playlists/user", get(own_playlists))
        .route("/playlists/public", get(public_playlists))
        .route("/playlists/:id", get(playlist).delete(delete_playlist))
        .route("/playlists/:id/add", post(add_song))
}
