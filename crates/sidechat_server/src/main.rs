use std::net::SocketAddr;

use log::LevelFilter;
use sidechat_server::{router, ServerConfig};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    let config = ServerConfig::from_env();
    let port = config.port;
    log::info!("serving files from {:?}", config.dist_dir);
    let keys: Vec<&str> = config.app_config.keys().map(String::as_str).collect();
    log::info!("injecting config keys: {}", keys.join(", "));

    let app = router(config);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("server running at http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
