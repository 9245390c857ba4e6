//! Request handlers for the listener endpoints

pub mod observer;
pub mod peer;
pub mod status;

use std::convert::Infallible;

use log::info;
use warp::Filter;

use crate::config::BridgeConfig;
use crate::core::{SharedBridge, SharedHub};
use crate::error::Result;

// Re-export the websocket handlers
pub use observer::{handle_observer, relay_observer};
pub use peer::handle_peer;

/// Build every route served by the listener: the observer and peer upgrade
/// endpoints plus `health` and `status`.
///
/// The configured endpoint paths are validated first, so an empty or
/// multi-segment path is a `ConfigError` rather than a panic inside warp.
pub fn routes(
    hub: SharedHub,
    bridge: SharedBridge,
    config: &BridgeConfig,
) -> Result<impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone> {
    config.validate()?;

    let observer_route = warp::path(config.observer_path.clone())
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_hub(hub.clone()))
        .map(|ws: warp::ws::Ws, hub: SharedHub| {
            info!("New observer websocket connection");
            ws.on_upgrade(move |socket| handle_observer(socket, hub))
        });

    let peer_route = warp::path(config.peer_path.clone())
        .and(warp::path::end())
        .and(warp::ws())
        .and(with_bridge(bridge.clone()))
        .map(|ws: warp::ws::Ws, bridge: SharedBridge| {
            info!("New game server websocket connection");
            ws.on_upgrade(move |socket| handle_peer(socket, bridge))
        });

    let health_route = warp::path("health").and(warp::path::end()).map(|| "OK");

    let status_route = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_hub(hub))
        .and(with_bridge(bridge))
        .map(status::status_reply);

    Ok(observer_route
        .or(peer_route)
        .or(health_route)
        .or(status_route))
}

// Helper functions to include shared state in requests
fn with_hub(hub: SharedHub) -> impl Filter<Extract = (SharedHub,), Error = Infallible> + Clone {
    warp::any().map(move || hub.clone())
}

fn with_bridge(
    bridge: SharedBridge,
) -> impl Filter<Extract = (SharedBridge,), Error = Infallible> + Clone {
    warp::any().map(move || bridge.clone())
}
