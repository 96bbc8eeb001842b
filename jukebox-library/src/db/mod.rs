use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod sqlite;
pub use sqlite::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(e) => match e {
                DatabaseError::NotFound {
                    resource: _,
                    identifier: _,
                } => Ok(()),
                e => Err(e),
            },
        }
    }
}

/// Represents a type that can fetch and store jukebox catalog data
#[async_trait]
pub trait Database: Send + Sync + 'static {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn list_users(&self) -> Result<Vec<UserData>>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;
    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData>;
    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()>;
    async fn set_one_time_code(&self, user_id: PrimaryKey, code: NewOneTimeCode) -> Result<()>;
    async fn clear_one_time_code(&self, user_id: PrimaryKey) -> Result<()>;
    async fn set_user_avatar(&self, user_id: PrimaryKey, avatar: NewBlob) -> Result<()>;
    async fn avatar_by_username(&self, username: &str) -> Result<Option<BlobData>>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn song_by_id(&self, song_id: PrimaryKey) -> Result<SongData>;
    /// All songs, newest first. Cover bytes are never part of [SongData].
    async fn list_songs(&self) -> Result<Vec<SongData>>;
    async fn create_song(&self, new_song: NewSong) -> Result<SongData>;
    async fn update_song(&self, updated_song: UpdatedSong) -> Result<SongData>;
    /// Removes the song along with its playlist memberships and likes
    async fn delete_song(&self, song_id: PrimaryKey) -> Result<()>;
    async fn cover_by_song_id(&self, song_id: PrimaryKey) -> Result<Option<BlobData>>;

    async fn liked_song_ids(&self, user_id: PrimaryKey) -> Result<Vec<PrimaryKey>>;
    async fn is_song_liked(&self, user_id: PrimaryKey, song_id: PrimaryKey) -> Result<bool>;
    async fn add_liked_song(&self, user_id: PrimaryKey, song_id: PrimaryKey) -> Result<()>;
    async fn remove_liked_song(&self, user_id: PrimaryKey, song_id: PrimaryKey) -> Result<()>;

    async fn playlist_by_id(&self, playlist_id: PrimaryKey) -> Result<PlaylistData>;
    async fn playlists_by_creator(&self, user_id: PrimaryKey) -> Result<Vec<PlaylistData>>;
    async fn list_public_playlists(&self) -> Result<Vec<PlaylistData>>;
    async fn create_playlist(&self, new_playlist: NewPlaylist) -> Result<PlaylistData>;
    /// Appends a song to a playlist. Adding a song that is already a member
    /// is a no-op, membership has set semantics.
    async fn add_playlist_song(
        &self,
        playlist_id: PrimaryKey,
        song_id: PrimaryKey,
    ) -> Result<()>;
    async fn delete_playlist(&self, playlist_id: PrimaryKey) -> Result<()>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Default)]
pub struct UpdatedUser {
    pub id: PrimaryKey,
    pub username: Option<String>,
    /// Already hashed by the caller
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct NewOneTimeCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

/// A small binary payload stored inline on a record, such as an avatar or
/// an embedded cover image
#[derive(Debug)]
pub struct NewBlob {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: i64,
    pub filename: String,
    pub picture: Option<NewBlob>,
    pub uploaded_by: Option<PrimaryKey>,
}

#[derive(Debug)]
pub struct UpdatedSong {
    pub id: PrimaryKey,
    pub title: Option<String>,
    pub artist: Option<String>,
}

#[derive(Debug)]
pub struct NewPlaylist {
    pub name: String,
    /// The creator of the new playlist
    pub user_id: PrimaryKey,
    pub is_public: bool,
}
