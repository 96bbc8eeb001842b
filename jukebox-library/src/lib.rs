mod auth;
mod catalog;
mod db;
mod metadata;
mod playlists;
mod storage;
mod util;

use std::sync::Arc;

pub use auth::*;
pub use catalog::*;
pub use db::*;
pub use metadata::{MetadataError, ResolvedMetadata, TrackMetadata, DEFAULT_ALBUM, DEFAULT_ARTIST};
pub use playlists::*;
pub use storage::*;

/// The jukebox library system, facilitating the song catalog, playlists,
/// authentication, and blob storage.
pub struct Library<S, Db> {
    pub storage: Arc<S>,
    pub database: Arc<Db>,

    pub auth: Auth<Db>,
    pub catalog: Catalog<S, Db>,
    pub playlists: PlaylistManager<Db>,
}

/// A type passed to the managers of the library, to access storage and
/// catalog state.
pub struct LibraryContext<S, Db> {
    pub storage: Arc<S>,
    pub database: Arc<Db>,
}

impl<S, Db> Library<S, Db>
where
    S: BlobStore,
    Db: Database,
{
    pub fn new(storage: S, database: Db) -> Self {
        let storage = Arc::new(storage);
        let database = Arc::new(database);

        let context = LibraryContext {
            storage: storage.clone(),
            database: database.clone(),
        };

        let auth = Auth::new(&database);
        let catalog = Catalog::new(&context);
        let playlists = PlaylistManager::new(&database);

        Self {
            storage,
            database,
            auth,
            catalog,
            playlists,
        }
    }
}

impl<S, Db> Clone for LibraryContext<S, Db>
where
    S: BlobStore,
    Db: Database,
{
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            database: self.database.clone(),
        }
    }
}
