use log::{error, info, warn};

use rotaria_bridge::config::BridgeConfig;
use rotaria_bridge::core::{create_bridge, create_hub};
use rotaria_bridge::handlers::routes;

#[tokio::main]
async fn main() {
    // Initialize env
    let dotenv_result = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv_result {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Load config from env
    let config = match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, observers=/{}, game server=/{}, command timeout={:?}",
        config.host, config.port, config.observer_path, config.peer_path, config.command_timeout
    );

    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let hub = create_hub();
    let bridge = create_bridge(&config);

    // The command layer installs its own handler; until then events are logged
    if let Err(e) = bridge.set_handler(|topic, body| info!("Game event [{}]: {}", topic, body)) {
        error!("Failed to install event handler: {}", e);
    }

    let routes = match routes(hub, bridge, &config) {
        Ok(routes) => routes,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Rotaria bridge on {}", addr);

    let server = match warp::serve(routes).try_bind_with_graceful_shutdown(addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    }) {
        Ok((bound, server)) => {
            info!("Listening on {}", bound);
            server
        }
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    server.await;
    info!("Shutdown.");
}
