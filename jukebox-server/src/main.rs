use jukebox_server::{init_logger, run_server};

#[tokio::main]
async fn main() {
    init_logger();
    run_server().await;
}
