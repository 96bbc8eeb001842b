//! All schemas that are exposed from endpoints are defined here
//! along with the conversions from library data

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jukebox_library::{PlaylistData, PrimaryKey, SessionData, SongData, UserData, UserRole};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: PrimaryKey,
    username: String,
    role: UserRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
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

#[derive(Debug, Serialize)]
pub struct SongWithLike {
    #[serde(flatten)]
    song: Song,
    #[serde(rename = "isLiked")]
    is_liked: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    id: PrimaryKey,
    name: String,
    created_by: PrimaryKey,
    is_public: bool,
    songs: Vec<Song>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistWithLikes {
    id: PrimaryKey,
    name: String,
    created_by: PrimaryKey,
    is_public: bool,
    songs: Vec<SongWithLike>,
}

#[derive(Debug, Serialize)]
pub struct LikeResult {
    pub liked: bool,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Song> for SongData {
    fn to_serialized(&self) -> Song {
        Song {
            id: self.id,
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            duration: self.duration,
            filename: self.filename.clone(),
            picture_type: self.picture_type.clone(),
            uploaded_by: self.uploaded_by,
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<SongWithLike> for (SongData, bool) {
    fn to_serialized(&self) -> SongWithLike {
        SongWithLike {
            song: self.0.to_serialized(),
            is_liked: self.1,
        }
    }
}

impl ToSerialized<Playlist> for PlaylistData {
    fn to_serialized(&self) -> Playlist {
        Playlist {
            id: self.id,
            name: self.name.clone(),
            created_by: self.created_by,
            is_public: self.is_public,
            songs: self.songs.to_serialized(),
        }
    }
}

/// Serializes a playlist with each song annotated against the requester's
/// liked set
pub fn annotate_playlist(
    playlist: &PlaylistData,
    liked: &HashSet<PrimaryKey>,
) -> PlaylistWithLikes {
    PlaylistWithLikes {
        id: playlist.id,
        name: playlist.name.clone(),
        created_by: playlist.created_by,
        is_public: playlist.is_public,
        songs: playlist
            .songs
            .iter()
            .map(|song| SongWithLike {
                song: song.to_serialized(),
                is_liked: liked.contains(&song.id),
            })
            .collect(),
    }
}
