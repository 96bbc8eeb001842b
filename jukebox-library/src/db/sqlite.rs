use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError, SqlitePool,
};

use crate::{
    BlobData, Database, DatabaseError, DatabaseResult, IntoDatabaseError, NewBlob,
    NewOneTimeCode, NewPlaylist, NewSession, NewSong, NewUser, PlaylistData, PrimaryKey, Result,
    SessionData, SongData, UpdatedSong, UpdatedUser, UserData, UserRole,
};

/// A SQLite database implementation for jukebox
pub struct SqliteDatabase {
    pool: SqlitePool,
}

/// Avatar bytes live in the same table but are only fetched by
/// [Database::avatar_by_username], so every user query selects these
/// columns explicitly.
const USER_COLUMNS: &str = "id, username, password, role, otp, otp_expires_at";

const SONG_COLUMNS: &str =
    "id, title, artist, album, duration, filename, picture_type, uploaded_by, created_at";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        avatar BLOB,
        avatar_type TEXT,
        otp TEXT,
        otp_expires_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token TEXT NOT NULL UNIQUE,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        expires_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS songs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        artist TEXT NOT NULL DEFAULT 'Unknown Artist',
        album TEXT NOT NULL DEFAULT 'Unknown Album',
        duration INTEGER NOT NULL DEFAULT 0,
        filename TEXT NOT NULL,
        picture BLOB,
        picture_type TEXT,
        uploaded_by INTEGER,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS playlists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        created_by INTEGER NOT NULL,
        is_public INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS playlist_songs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        playlist_id INTEGER NOT NULL,
        song_id INTEGER NOT NULL,
        UNIQUE (playlist_id, song_id)
    )",
    "CREATE TABLE IF NOT EXISTS liked_songs (
        user_id INTEGER NOT NULL,
        song_id INTEGER NOT NULL,
        PRIMARY KEY (user_id, song_id)
    )",
];

#[derive(sqlx::FromRow)]
struct UserRow {
    id: PrimaryKey,
    username: String,
    password: String,
    role: String,
    otp: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        UserData {
            id: row.id,
            username: row.username,
            password: row.password,
            role: UserRole::from_str(&row.role),
            one_time_code: row.otp,
            one_time_code_expires_at: row.otp_expires_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    expires_at: DateTime<Utc>,
    user_id: PrimaryKey,
    username: String,
    password: String,
    role: String,
    otp: Option<String>,
    otp_expires_at: Option<DateTime<Utc>>,
}

impl From<SessionRow> for SessionData {
    fn from(row: SessionRow) -> Self {
        SessionData {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user: UserData {
                id: row.user_id,
                username: row.username,
                password: row.password,
                role: UserRole::from_str(&row.role),
                one_time_code: row.otp,
                one_time_code_expires_at: row.otp_expires_at,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct SongRow {
    id: PrimaryKey,
    title: String,
    artist: String,
    album: String,
    duration: i64,
    filename: String,
    picture_type: Option<String>,
    uploaded_by: Option<PrimaryKey>,
    created_at: DateTime<Utc>,
}

impl From<SongRow> for SongData {
    fn from(row: SongRow) -> Self {
        SongData {
            id: row.id,
            title: row.title,
            artist: row.artist,
            album: row.album,
            duration: row.duration,
            filename: row.filename,
            picture_type: row.picture_type,
            uploaded_by: row.uploaded_by,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PlaylistRow {
    id: PrimaryKey,
    name: String,
    created_by: PrimaryKey,
    is_public: bool,
}

#[derive(sqlx::FromRow)]
struct InlineBlobRow {
    data: Option<Vec<u8>>,
    content_type: Option<String>,
}

impl InlineBlobRow {
    fn into_blob(self) -> Option<BlobData> {
        match (self.data, self.content_type) {
            (Some(data), Some(content_type)) => Some(BlobData { data, content_type }),
            _ => None,
        }
    }
}

impl SqliteDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| e.any())?
            .create_if_missing(true);

        // A :memory: database exists per connection, so the pool must not
        // open a second one.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| e.any())?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| e.any())?;
        }

        Ok(Self { pool })
    }

    /// Songs of a playlist in insertion order. Deleted songs simply don't
    /// join, so dangling references disappear here.
    async fn playlist_songs(&self, playlist_id: PrimaryKey) -> Result<Vec<SongData>> {
        let rows: Vec<SongRow> = sqlx::query_as(
            "SELECT
                songs.id, songs.title, songs.artist, songs.album, songs.duration,
                songs.filename, songs.picture_type, songs.uploaded_by, songs.created_at
            FROM playlist_songs
                INNER JOIN songs ON playlist_songs.song_id = songs.id
            WHERE playlist_songs.playlist_id = ?
            ORDER BY playlist_songs.id",
        )
        .bind(playlist_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn playlist_from_row(&self, row: PlaylistRow) -> Result<PlaylistData> {
        let songs = self.playlist_songs(row.id).await?;

        Ok(PlaylistData {
            id: row.id,
            name: row.name,
            created_by: row.created_by,
            is_public: row.is_public,
            songs,
        })
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("user", "id"))
    }

    async fn user_by_username(&self, username: &str) -> Result<UserData> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("user", "username"))
    }

    async fn list_users(&self) -> Result<Vec<UserData>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserData> {
        self.user_by_username(&new_user.username)
            .await
            .conflict_or_ok("user", "username", &new_user.username)?;

        sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, password, role) VALUES (?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(new_user.username)
        .bind(new_user.password)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_user(&self, updated_user: UpdatedUser) -> Result<UserData> {
        let user = self.user_by_id(updated_user.id).await?;

        if let Some(new_username) = updated_user
            .username
            .as_deref()
            .filter(|u| *u != user.username)
        {
            self.user_by_username(new_username)
                .await
                .conflict_or_ok("user", "username", new_username)?;
        }

        sqlx::query("UPDATE users SET username = ?, password = ? WHERE id = ?")
            .bind(updated_user.username.unwrap_or(user.username))
            .bind(updated_user.password.unwrap_or(user.password))
            .bind(updated_user.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.user_by_id(updated_user.id).await
    }

    async fn delete_user(&self, user_id: PrimaryKey) -> Result<()> {
        // Ensure user exists
        let _ = self.user_by_id(user_id).await?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn set_one_time_code(&self, user_id: PrimaryKey, code: NewOneTimeCode) -> Result<()> {
        let _ = self.user_by_id(user_id).await?;

        sqlx::query("UPDATE users SET otp = ?, otp_expires_at = ? WHERE id = ?")
            .bind(code.code)
            .bind(code.expires_at)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_one_time_code(&self, user_id: PrimaryKey) -> Result<()> {
        sqlx::query("UPDATE users SET otp = NULL, otp_expires_at = NULL WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn set_user_avatar(&self, user_id: PrimaryKey, avatar: NewBlob) -> Result<()> {
        let _ = self.user_by_id(user_id).await?;

        sqlx::query("UPDATE users SET avatar = ?, avatar_type = ? WHERE id = ?")
            .bind(avatar.data)
            .bind(avatar.content_type)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn avatar_by_username(&self, username: &str) -> Result<Option<BlobData>> {
        let row: InlineBlobRow = sqlx::query_as(
            "SELECT avatar AS data, avatar_type AS content_type FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("user", "username"))?;

        Ok(row.into_blob())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT
                sessions.id, sessions.token, sessions.expires_at,
                users.id AS user_id,
                users.username,
                users.password,
                users.role,
                users.otp,
                users.otp_expires_at
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("session", "token"))
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        self.session_by_token(&new_session.token)
            .await
            .conflict_or_ok("session", "token", &new_session.token)?;

        sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&new_session.token)
            .bind(new_session.user_id)
            .bind(new_session.expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.session_by_token(&new_session.token).await
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<()> {
        // Ensure session exists
        let _ = self.session_by_token(token).await?;

        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn clear_expired_sessions(&self) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn song_by_id(&self, song_id: PrimaryKey) -> Result<SongData> {
        sqlx::query_as::<_, SongRow>(&format!(
            "SELECT {SONG_COLUMNS} FROM songs WHERE id = ?"
        ))
        .bind(song_id)
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.not_found_or("song", "id"))
    }

    async fn list_songs(&self) -> Result<Vec<SongData>> {
        let rows: Vec<SongRow> = sqlx::query_as(&format!(
            "SELECT {SONG_COLUMNS} FROM songs ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_song(&self, new_song: NewSong) -> Result<SongData> {
        let (picture, picture_type) = match new_song.picture {
            Some(blob) => (Some(blob.data), Some(blob.content_type)),
            None => (None, None),
        };

        sqlx::query_as::<_, SongRow>(&format!(
            "INSERT INTO songs
                (title, artist, album, duration, filename, picture, picture_type, uploaded_by, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {SONG_COLUMNS}"
        ))
        .bind(new_song.title)
        .bind(new_song.artist)
        .bind(new_song.album)
        .bind(new_song.duration)
        .bind(new_song.filename)
        .bind(picture)
        .bind(picture_type)
        .bind(new_song.uploaded_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map(Into::into)
        .map_err(|e| e.any())
    }

    async fn update_song(&self, updated_song: UpdatedSong) -> Result<SongData> {
        let song = self.song_by_id(updated_song.id).await?;

        sqlx::query("UPDATE songs SET title = ?, artist = ? WHERE id = ?")
            .bind(updated_song.title.unwrap_or(song.title))
            .bind(updated_song.artist.unwrap_or(song.artist))
            .bind(updated_song.id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.song_by_id(updated_song.id).await
    }

    async fn delete_song(&self, song_id: PrimaryKey) -> Result<()> {
        // Ensure song exists
        let _ = self.song_by_id(song_id).await?;

        sqlx::query("DELETE FROM playlist_songs WHERE song_id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        sqlx::query("DELETE FROM liked_songs WHERE song_id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(song_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn cover_by_song_id(&self, song_id: PrimaryKey) -> Result<Option<BlobData>> {
        let row: InlineBlobRow = sqlx::query_as(
            "SELECT picture AS data, picture_type AS content_type FROM songs WHERE id = ?",
        )
        .bind(song_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("song", "id"))?;

        Ok(row.into_blob())
    }

    async fn liked_song_ids(&self, user_id: PrimaryKey) -> Result<Vec<PrimaryKey>> {
        sqlx::query_scalar("SELECT song_id FROM liked_songs WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn is_song_liked(&self, user_id: PrimaryKey, song_id: PrimaryKey) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM liked_songs WHERE user_id = ? AND song_id = ?",
        )
        .bind(user_id)
        .bind(song_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(count > 0)
    }

    async fn add_liked_song(&self, user_id: PrimaryKey, song_id: PrimaryKey) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO liked_songs (user_id, song_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(song_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn remove_liked_song(&self, user_id: PrimaryKey, song_id: PrimaryKey) -> Result<()> {
        sqlx::query("DELETE FROM liked_songs WHERE user_id = ? AND song_id = ?")
            .bind(user_id)
            .bind(song_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn playlist_by_id(&self, playlist_id: PrimaryKey) -> Result<PlaylistData> {
        let row: PlaylistRow = sqlx::query_as(
            "SELECT id, name, created_by, is_public FROM playlists WHERE id = ?",
        )
        .bind(playlist_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("playlist", "id"))?;

        self.playlist_from_row(row).await
    }

    async fn playlists_by_creator(&self, user_id: PrimaryKey) -> Result<Vec<PlaylistData>> {
        let rows: Vec<PlaylistRow> = sqlx::query_as(
            "SELECT id, name, created_by, is_public FROM playlists WHERE created_by = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut playlists = Vec::with_capacity(rows.len());

        for row in rows {
            playlists.push(self.playlist_from_row(row).await?);
        }

        Ok(playlists)
    }

    async fn list_public_playlists(&self) -> Result<Vec<PlaylistData>> {
        let rows: Vec<PlaylistRow> = sqlx::query_as(
            "SELECT id, name, created_by, is_public FROM playlists WHERE is_public = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        let mut playlists = Vec::with_capacity(rows.len());

        for row in rows {
            playlists.push(self.playlist_from_row(row).await?);
        }

        Ok(playlists)
    }

    async fn create_playlist(&self, new_playlist: NewPlaylist) -> Result<PlaylistData> {
        let row: PlaylistRow = sqlx::query_as(
            "INSERT INTO playlists (name, created_by, is_public) VALUES (?, ?, ?)
             RETURNING id, name, created_by, is_public",
        )
        .bind(new_playlist.name)
        .bind(new_playlist.user_id)
        .bind(new_playlist.is_public)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.playlist_from_row(row).await
    }

    async fn add_playlist_song(
        &self,
        playlist_id: PrimaryKey,
        song_id: PrimaryKey,
    ) -> Result<()> {
        // Ensure both ends of the membership exist
        sqlx::query_scalar::<_, PrimaryKey>("SELECT id FROM playlists WHERE id = ?")
            .bind(playlist_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("playlist", "id"))?;

        let _ = self.song_by_id(song_id).await?;

        sqlx::query("INSERT OR IGNORE INTO playlist_songs (playlist_id, song_id) VALUES (?, ?)")
            .bind(playlist_id)
            .bind(song_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn delete_playlist(&self, playlist_id: PrimaryKey) -> Result<()> {
        // Ensure playlist exists
        let _ = self.playlist_by_id(playlist_id).await?;

        sqlx::query("DELETE FROM playlist_songs WHERE playlist_id = ?")
            .bind(playlist_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        sqlx::query("DELETE FROM playlists WHERE id = ?")
            .bind(playlist_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    async fn database() -> SqliteDatabase {
        SqliteDatabase::new("sqlite::memory:")
            .await
            .expect("in-memory database opens")
    }

    async fn user(db: &SqliteDatabase, username: &str, role: UserRole) -> UserData {
        db.create_user(NewUser {
            username: username.to_string(),
            password: "hash".to_string(),
            role,
        })
        .await
        .expect("user is created")
    }

    async fn song(db: &SqliteDatabase, title: &str) -> SongData {
        db.create_song(NewSong {
            title: title.to_string(),
            artist: "Unknown Artist".to_string(),
            album: "Unknown Album".to_string(),
            duration: 0,
            filename: format!("{title}.mp3"),
            picture: None,
            uploaded_by: None,
        })
        .await
        .expect("song is created")
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let db = database().await;

        user(&db, "john", UserRole::User).await;
        let result = db
            .create_user(NewUser {
                username: "john".to_string(),
                password: "other".to_string(),
                role: UserRole::User,
            })
            .await;

        assert!(matches!(result, Err(DatabaseError::Conflict { .. })));
    }

    #[tokio::test]
    async fn sessions_resolve_their_user() {
        let db = database().await;
        let mary = user(&db, "mary", UserRole::Admin).await;

        let session = db
            .create_session(NewSession {
                token: "sessiontoken".to_string(),
                user_id: mary.id,
                expires_at: Utc::now() + Duration::days(7),
            })
            .await
            .expect("session is created");

        let found = db
            .session_by_token("sessiontoken")
            .await
            .expect("session resolves");

        assert_eq!(found.id, session.id);
        assert_eq!(found.user.username, "mary");
        assert_eq!(found.user.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn expired_sessions_are_cleared() {
        let db = database().await;
        let john = user(&db, "john", UserRole::User).await;

        db.create_session(NewSession {
            token: "stale".to_string(),
            user_id: john.id,
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .expect("session is created");

        db.clear_expired_sessions().await.expect("cleanup runs");

        let result = db.session_by_token("stale").await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn adding_a_playlist_song_twice_keeps_one_entry() {
        let db = database().await;
        let john = user(&db, "john", UserRole::User).await;
        let track = song(&db, "strawberries").await;

        let playlist = db
            .create_playlist(NewPlaylist {
                name: "favorites".to_string(),
                user_id: john.id,
                is_public: false,
            })
            .await
            .expect("playlist is created");

        db.add_playlist_song(playlist.id, track.id)
            .await
            .expect("first add works");
        db.add_playlist_song(playlist.id, track.id)
            .await
            .expect("second add is a no-op");

        let found = db.playlist_by_id(playlist.id).await.expect("playlist resolves");
        assert_eq!(found.songs.len(), 1);
    }

    #[tokio::test]
    async fn playlist_order_is_insertion_order() {
        let db = database().await;
        let john = user(&db, "john", UserRole::User).await;
        let bananas = song(&db, "bananas").await;
        let apples = song(&db, "apples").await;

        let playlist = db
            .create_playlist(NewPlaylist {
                name: "fruit".to_string(),
                user_id: john.id,
                is_public: false,
            })
            .await
            .expect("playlist is created");

        db.add_playlist_song(playlist.id, bananas.id).await.unwrap();
        db.add_playlist_song(playlist.id, apples.id).await.unwrap();

        let found = db.playlist_by_id(playlist.id).await.unwrap();
        let titles: Vec<_> = found.songs.iter().map(|s| s.title.as_str()).collect();

        assert_eq!(titles, vec!["bananas", "apples"]);
    }

    #[tokio::test]
    async fn deleting_a_song_removes_memberships_and_likes() {
        let db = database().await;
        let john = user(&db, "john", UserRole::User).await;
        let track = song(&db, "windows").await;

        let playlist = db
            .create_playlist(NewPlaylist {
                name: "mixed".to_string(),
                user_id: john.id,
                is_public: false,
            })
            .await
            .unwrap();

        db.add_playlist_song(playlist.id, track.id).await.unwrap();
        db.add_liked_song(john.id, track.id).await.unwrap();

        db.delete_song(track.id).await.expect("song is deleted");

        let found = db.playlist_by_id(playlist.id).await.unwrap();
        assert!(found.songs.is_empty());
        assert!(!db.is_song_liked(john.id, track.id).await.unwrap());
    }

    #[tokio::test]
    async fn public_playlists_are_listed_separately() {
        let db = database().await;
        let admin = user(&db, "admin", UserRole::Admin).await;
        let john = user(&db, "john", UserRole::User).await;

        db.create_playlist(NewPlaylist {
            name: "featured".to_string(),
            user_id: admin.id,
            is_public: true,
        })
        .await
        .unwrap();

        db.create_playlist(NewPlaylist {
            name: "private".to_string(),
            user_id: john.id,
            is_public: false,
        })
        .await
        .unwrap();

        let public = db.list_public_playlists().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].name, "featured");

        let johns = db.playlists_by_creator(john.id).await.unwrap();
        assert_eq!(johns.len(), 1);
        assert_eq!(johns[0].name, "private");
    }

    #[tokio::test]
    async fn avatar_round_trip() {
        let db = database().await;
        let mary = user(&db, "mary", UserRole::User).await;

        assert!(db.avatar_by_username("mary").await.unwrap().is_none());

        db.set_user_avatar(
            mary.id,
            NewBlob {
                data: vec![1, 2, 3],
                content_type: "image/png".to_string(),
            },
        )
        .await
        .unwrap();

        let avatar = db.avatar_by_username("mary").await.unwrap().unwrap();
        assert_eq!(avatar.data, vec![1, 2, 3]);
        assert_eq!(avatar.content_type, "image/png");
    }
}
