use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The type used for primary keys in the database.
pub type PrimaryKey = i64;

/// The two access levels a jukebox account can have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_str(value: &str) -> Self {
        match value {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// A jukebox account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub password: String,
    pub role: UserRole,
    /// A pending password reset code, if one was requested
    pub one_time_code: Option<String>,
    pub one_time_code_expires_at: Option<DateTime<Utc>>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A catalog entry for one uploaded audio asset.
///
/// Cover image bytes are deliberately not part of this struct, they are
/// fetched separately so listings stay small.
#[derive(Debug, Clone)]
pub struct SongData {
    pub id: PrimaryKey,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Best-effort duration in seconds, 0 when unknown
    pub duration: i64,
    /// The key of the audio blob in the blob store
    pub filename: String,
    /// Content type of the embedded cover image, if any
    pub picture_type: Option<String>,
    pub uploaded_by: Option<PrimaryKey>,
    pub created_at: DateTime<Utc>,
}

/// A named ordered collection of songs
#[derive(Debug, Clone)]
pub struct PlaylistData {
    pub id: PrimaryKey,
    pub name: String,
    pub created_by: PrimaryKey,
    /// Public playlists are featured to every user
    pub is_public: bool,
    /// Members in insertion order. Songs deleted from the catalog are
    /// filtered out here.
    pub songs: Vec<SongData>,
}

/// Avatar or cover image bytes along with their content type
#[derive(Debug, Clone)]
pub struct BlobData {
    pub data: Vec<u8>,
    pub content_type: String,
}
