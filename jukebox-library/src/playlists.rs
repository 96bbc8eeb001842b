use std::sync::Arc;

use thiserror::Error;

use crate::{Database, DatabaseError, NewPlaylist, PlaylistData, PrimaryKey, UserData};

/// Manages playlists and their memberships
pub struct PlaylistManager<Db> {
    db: Arc<Db>,
}

#[derive(Debug, Error)]
pub enum PlaylistError {
    /// Only the creator of a playlist may add songs to it
    #[error("Only the playlist creator can add songs")]
    NotOwner,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

impl<Db> PlaylistManager<Db>
where
    Db: Database,
{
    pub fn new(db: &Arc<Db>) -> Self {
        Self { db: db.clone() }
    }

    /// Creates a playlist. Playlists created by admins are public, or
    /// "featured", everyone else's are private to their creator.
    pub async fn create(
        &self,
        name: String,
        creator: &UserData,
    ) -> Result<PlaylistData, PlaylistError> {
        let playlist = self
            .db
            .create_playlist(NewPlaylist {
                name,
                user_id: creator.id,
                is_public: creator.role.is_admin(),
            })
            .await?;

        Ok(playlist)
    }

    pub async fn by_id(&self, playlist_id: PrimaryKey) -> Result<PlaylistData, PlaylistError> {
        Ok(self.db.playlist_by_id(playlist_id).await?)
    }

    /// All playlists created by the user
    pub async fn for_user(&self, user_id: PrimaryKey) -> Result<Vec<PlaylistData>, PlaylistError> {
        Ok(self.db.playlists_by_creator(user_id).await?)
    }

    /// All featured playlists
    pub async fn public(&self) -> Result<Vec<PlaylistData>, PlaylistError> {
        Ok(self.db.list_public_playlists().await?)
    }

    /// Appends a song, keeping set semantics on membership. Only the
    /// playlist's creator may do this.
    pub async fn add_song(
        &self,
        playlist_id: PrimaryKey,
        song_id: PrimaryKey,
        requester: &UserData,
    ) -> Result<PlaylistData, PlaylistError> {
        let playlist = self.db.playlist_by_id(playlist_id).await?;

        if playlist.created_by != requester.id {
            return Err(PlaylistError::NotOwner);
        }

        self.db.add_playlist_song(playlist_id, song_id).await?;

        Ok(self.db.playlist_by_id(playlist_id).await?)
    }

    pub async fn delete(&self, playlist_id: PrimaryKey) -> Result<(), PlaylistError> {
        Ok(self.db.delete_playlist(playlist_id).await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{NewSong, NewUser, SqliteDatabase, UserRole};

    async fn setup() -> (Arc<SqliteDatabase>, PlaylistManager<SqliteDatabase>) {
        let db = Arc::new(
            SqliteDatabase::new("sqlite::memory:")
                .await
                .expect("in-memory database opens"),
        );

        let manager = PlaylistManager::new(&db);

        (db, manager)
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

    async fn song(db: &SqliteDatabase, title: &str) -> crate::SongData {
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
    async fn admin_playlists_are_public_and_user_playlists_are_not() {
        let (db, manager) = setup().await;

        let admin = user(&db, "admin", UserRole::Admin).await;
        let john = user(&db, "john", UserRole::User).await;

        let featured = manager
            .create("Staff Picks".to_string(), &admin)
            .await
            .unwrap();
        let private = manager.create("Mine".to_string(), &john).await.unwrap();

        assert!(featured.is_public);
        assert!(!private.is_public);

        let public = manager.public().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].name, "Staff Picks");
    }

    #[tokio::test]
    async fn only_the_creator_can_add_songs() {
        let (db, manager) = setup().await;

        let john = user(&db, "john", UserRole::User).await;
        let mary = user(&db, "mary", UserRole::User).await;
        let track = song(&db, "windows").await;

        let playlist = manager.create("Johns".to_string(), &john).await.unwrap();

        let result = manager.add_song(playlist.id, track.id, &mary).await;
        assert!(matches!(result, Err(PlaylistError::NotOwner)));

        // The playlist is unmodified by the refused add
        let unchanged = manager.by_id(playlist.id).await.unwrap();
        assert!(unchanged.songs.is_empty());

        let updated = manager.add_song(playlist.id, track.id, &john).await.unwrap();
        assert_eq!(updated.songs.len(), 1);
    }

    #[tokio::test]
    async fn adding_twice_keeps_a_single_membership() {
        let (db, manager) = setup().await;

        let john = user(&db, "john", UserRole::User).await;
        let track = song(&db, "strawberries").await;
        let playlist = manager.create("Loop".to_string(), &john).await.unwrap();

        manager.add_song(playlist.id, track.id, &john).await.unwrap();
        let after_second = manager.add_song(playlist.id, track.id, &john).await.unwrap();

        assert_eq!(after_second.songs.len(), 1);
    }
}
