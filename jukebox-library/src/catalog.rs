use log::warn;
use std::collections::HashSet;
use thiserror::Error;

use crate::{
    metadata, util::random_string, BlobData, BlobStore, Database, DatabaseError, LibraryContext,
    NewSong, PrimaryKey, SongData, StorageError, UpdatedSong, UserData,
};

/// Manages the song catalog and the per-user liked set
pub struct Catalog<S, Db> {
    context: LibraryContext<S, Db>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Db(#[from] DatabaseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One file received from an upload form
#[derive(Debug)]
pub struct NewUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl<S, Db> Catalog<S, Db>
where
    S: BlobStore,
    Db: Database,
{
    pub fn new(context: &LibraryContext<S, Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Persists the uploaded bytes in the blob store, extracts whatever tag
    /// data the file carries, and creates the catalog record. Extraction
    /// failure never fails the upload.
    pub async fn upload(
        &self,
        uploader: &UserData,
        upload: NewUpload,
    ) -> Result<SongData, CatalogError> {
        let file_name = base_name(&upload.file_name);
        let blob_name = self.free_blob_name(file_name).await?;

        self.context.storage.put(&blob_name, &upload.bytes).await?;

        let extracted = metadata::extract(&upload.bytes);

        if let Err(e) = &extracted {
            warn!("{file_name}: {e}, using defaults");
        }

        let resolved = metadata::resolve(file_name, extracted);

        let song = self
            .context
            .database
            .create_song(NewSong {
                title: resolved.title,
                artist: resolved.artist,
                album: resolved.album,
                duration: resolved.duration,
                filename: blob_name,
                picture: resolved.picture,
                uploaded_by: Some(uploader.id),
            })
            .await?;

        Ok(song)
    }

    pub async fn song_by_id(&self, song_id: PrimaryKey) -> Result<SongData, CatalogError> {
        Ok(self.context.database.song_by_id(song_id).await?)
    }

    /// Every catalog song, each annotated with whether the user likes it
    pub async fn list_with_likes(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Vec<(SongData, bool)>, CatalogError> {
        let songs = self.context.database.list_songs().await?;
        let liked = self.liked_song_ids(user_id).await?;

        Ok(songs
            .into_iter()
            .map(|song| {
                let is_liked = liked.contains(&song.id);
                (song, is_liked)
            })
            .collect())
    }

    pub async fn liked_song_ids(
        &self,
        user_id: PrimaryKey,
    ) -> Result<HashSet<PrimaryKey>, CatalogError> {
        let ids = self.context.database.liked_song_ids(user_id).await?;

        Ok(ids.into_iter().collect())
    }

    /// Likes the song if it isn't liked, unlikes it if it is. Returns the
    /// resulting liked state.
    ///
    /// This is a read-then-write on the liked set, two concurrent toggles
    /// from the same user resolve as last-write-wins.
    pub async fn toggle_like(
        &self,
        user_id: PrimaryKey,
        song_id: PrimaryKey,
    ) -> Result<bool, CatalogError> {
        // Ensure song exists
        let _ = self.context.database.song_by_id(song_id).await?;

        let liked = self.context.database.is_song_liked(user_id, song_id).await?;

        if liked {
            self.context
                .database
                .remove_liked_song(user_id, song_id)
                .await?;
        } else {
            self.context
                .database
                .add_liked_song(user_id, song_id)
                .await?;
        }

        Ok(!liked)
    }

    pub async fn update_song(&self, updated_song: UpdatedSong) -> Result<SongData, CatalogError> {
        Ok(self.context.database.update_song(updated_song).await?)
    }

    /// Removes the song record and its audio blob. A blob that already
    /// disappeared from the store is tolerated.
    pub async fn delete_song(&self, song_id: PrimaryKey) -> Result<(), CatalogError> {
        let song = self.context.database.song_by_id(song_id).await?;

        match self.context.storage.delete(&song.filename).await {
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        Ok(self.context.database.delete_song(song_id).await?)
    }

    pub async fn cover(&self, song_id: PrimaryKey) -> Result<Option<BlobData>, CatalogError> {
        Ok(self.context.database.cover_by_song_id(song_id).await?)
    }

    /// Keeps the original file name where possible, prefixing a short random
    /// string only when the name is already taken in the store
    async fn free_blob_name(&self, file_name: &str) -> Result<String, CatalogError> {
        if !self.context.storage.exists(file_name).await.unwrap_or(true) {
            return Ok(file_name.to_string());
        }

        Ok(format!("{}-{}", random_string(8), file_name))
    }
}

/// Strips any client-supplied directory components from an upload name
fn base_name(file_name: &str) -> &str {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or("upload")
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::{util::random_string, FsBlobStore, NewPlainUser, SqliteDatabase, UserRole};

    async fn library() -> crate::Library<FsBlobStore, SqliteDatabase> {
        let root = std::env::temp_dir().join(format!("jukebox-catalog-test-{}", random_string(8)));

        let storage = FsBlobStore::new(root).await.expect("store directory opens");
        let database = SqliteDatabase::new("sqlite::memory:")
            .await
            .expect("in-memory database opens");

        crate::Library::new(storage, database)
    }

    async fn admin(library: &crate::Library<FsBlobStore, SqliteDatabase>) -> UserData {
        library
            .auth
            .register(
                NewPlainUser {
                    username: "admin".to_string(),
                    password: "correct-horse".to_string(),
                },
                UserRole::Admin,
            )
            .await
            .expect("admin is created")
    }

    fn untagged_upload(name: &str) -> NewUpload {
        NewUpload {
            file_name: name.to_string(),
            bytes: vec![0u8; 256],
        }
    }

    #[tokio::test]
    async fn upload_without_tags_falls_back_to_the_file_name() {
        let library = library().await;
        let uploader = admin(&library).await;

        let song = library
            .catalog
            .upload(&uploader, untagged_upload("Evening News.mp3"))
            .await
            .unwrap();

        assert_eq!(song.title, "Evening News");
        assert_eq!(song.artist, "Unknown Artist");
        assert_eq!(song.album, "Unknown Album");
        assert_eq!(song.duration, 0);
        assert_eq!(song.uploaded_by, Some(uploader.id));
        assert!(library.storage.exists(&song.filename).await.unwrap());
    }

    #[tokio::test]
    async fn uploads_with_the_same_name_get_distinct_blobs() {
        let library = library().await;
        let uploader = admin(&library).await;

        let first = library
            .catalog
            .upload(&uploader, untagged_upload("track.mp3"))
            .await
            .unwrap();
        let second = library
            .catalog
            .upload(&uploader, untagged_upload("track.mp3"))
            .await
            .unwrap();

        assert_ne!(first.filename, second.filename);
        assert!(library.storage.exists(&first.filename).await.unwrap());
        assert!(library.storage.exists(&second.filename).await.unwrap());
    }

    #[tokio::test]
    async fn toggling_a_like_twice_restores_the_original_state() {
        let library = library().await;
        let uploader = admin(&library).await;

        let song = library
            .catalog
            .upload(&uploader, untagged_upload("toggle.mp3"))
            .await
            .unwrap();

        assert!(library.catalog.toggle_like(uploader.id, song.id).await.unwrap());
        assert!(!library.catalog.toggle_like(uploader.id, song.id).await.unwrap());

        let listed = library.catalog.list_with_likes(uploader.id).await.unwrap();
        assert!(listed.iter().all(|(_, liked)| !liked));
    }

    #[tokio::test]
    async fn deleting_a_song_removes_its_blob() {
        let library = library().await;
        let uploader = admin(&library).await;

        let song = library
            .catalog
            .upload(&uploader, untagged_upload("doomed.mp3"))
            .await
            .unwrap();

        library.catalog.delete_song(song.id).await.unwrap();

        assert!(!library.storage.exists(&song.filename).await.unwrap());
        assert!(matches!(
            library.catalog.song_by_id(song.id).await,
            Err(CatalogError::Db(DatabaseError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn listing_annotates_likes_per_user() {
        let library = library().await;
        let uploader = admin(&library).await;

        let liked = library
            .catalog
            .upload(&uploader, untagged_upload("liked.mp3"))
            .await
            .unwrap();
        library
            .catalog
            .upload(&uploader, untagged_upload("other.mp3"))
            .await
            .unwrap();

        library.catalog.toggle_like(uploader.id, liked.id).await.unwrap();

        let listed = library.catalog.list_with_likes(uploader.id).await.unwrap();
        let liked_titles: Vec<_> = listed
            .iter()
            .filter(|(_, is_liked)| *is_liked)
            .map(|(song, _)| song.title.as_str())
            .collect();

        assert_eq!(liked_titles, vec!["liked"]);
    }
}
