use std::sync::Arc;

use axum::extract::FromRef;
use jukebox_library::{FsBlobStore, Library, SqliteDatabase};

use crate::ServerConfig;

/// The concrete library the server runs against
pub type AppLibrary = Library<FsBlobStore, SqliteDatabase>;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub library: Arc<AppLibrary>,
    pub config: Arc<ServerConfig>,
}
