use std::{
    env,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::extract::DefaultBodyLimit;
use jukebox_library::{FsBlobStore, Library, SqliteDatabase};
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod context;
mod errors;
mod logging;
mod playlists;
mod schemas;
mod serialized;
mod songs;
mod streaming;
mod users;

pub use context::ServerContext;
pub use logging::init_logger;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 5000;

/// Uploads carry whole audio files in memory, so the body limit is well
/// above the axum default.
const BODY_LIMIT_IN_BYTES: usize = 50 * 1024 * 1024;

pub type Router = axum::Router<ServerContext>;

/// Runtime settings, read once from the environment at startup
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub storage_dir: String,
    /// Presenting this key at registration grants the admin role
    pub admin_key: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = env::var("JUKEBOX_SERVER_PORT")
            .map(|x| x.parse::<u16>().expect("Port must be a number"))
            .unwrap_or(DEFAULT_PORT);

        let database_url =
            env::var("JUKEBOX_DATABASE_URL").unwrap_or_else(|_| "sqlite://jukebox.db".to_string());

        let storage_dir = env::var("JUKEBOX_STORAGE_DIR").unwrap_or_else(|_| "blobs".to_string());

        let admin_key = env::var("JUKEBOX_ADMIN_KEY").unwrap_or_else(|_| "admin123".to_string());

        Self {
            port,
            database_url,
            storage_dir,
            admin_key,
        }
    }
}

/// Starts the jukebox server
pub async fn run_server() {
    let config = ServerConfig::from_env();

    let database = SqliteDatabase::new(&config.database_url)
        .await
        .expect("database opens");

    let storage = FsBlobStore::new(&config.storage_dir)
        .await
        .expect("blob store directory opens");

    let library = Library::new(storage, database);

    let context = ServerContext {
        library: Arc::new(library),
        config: Arc::new(config),
    };

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, context.config.port).into();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let root_router = axum::Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(songs::router())
        .merge(playlists::router())
        .merge(streaming::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_IN_BYTES))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    info!("jukebox is listening on port {}", addr.port());

    axum::serve(listener, root_router.into_make_service())
        .await
        .unwrap();
}
