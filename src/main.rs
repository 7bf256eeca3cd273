use std::path::PathBuf;

use book_search_mcp::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdoutはMCPプロトコル用なのでログはstderrへ
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut config = Config::load();
    if let Some(dir) = std::env::args().nth(1).map(PathBuf::from) {
        config.cache_dir = dir;
    }

    book_search_mcp::interface::mcp::run(config).await
}
