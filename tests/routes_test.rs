// Route-level tests driving the warp filter without binding a port

use std::sync::Arc;
use std::time::Duration;

use rotaria_bridge::config::BridgeConfig;
use rotaria_bridge::core::{create_hub, Bridge, SharedBridge, SharedHub};
use rotaria_bridge::handlers::routes;
use rotaria_bridge::BridgeError;
use serde_json::{json, Value};

fn test_config() -> BridgeConfig {
    BridgeConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        command_timeout: Duration::from_secs(5),
        observer_path: "ws".to_string(),
        peer_path: "mc".to_string(),
    }
}

fn setup() -> (SharedHub, SharedBridge, BridgeConfig) {
    let config = test_config();
    let bridge = Arc::new(Bridge::from_config(&config));
    (create_hub(), bridge, config)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_health_endpoint() {
    let (hub, bridge, config) = setup();
    let filter = routes(hub, bridge, &config).unwrap();

    let response = warp::test::request().path("/health").reply(&filter).await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.body(), "OK");
}

#[tokio::test]
async fn test_status_endpoint_when_disconnected() {
    let (hub, bridge, config) = setup();
    let filter = routes(hub, bridge, &config).unwrap();

    let response = warp::test::request().path("/status").reply(&filter).await;
    assert_eq!(response.status(), 200);

    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["bridge"]["connected"], json!(false));
    assert_eq!(body["bridge"]["pending"], json!(0));
    assert_eq!(body["observers"], json!(0));
}

#[tokio::test]
async fn test_invalid_endpoint_paths_are_config_errors() {
    let (hub, bridge, mut config) = setup();

    config.peer_path = String::new();
    assert!(matches!(
        routes(Arc::clone(&hub), Arc::clone(&bridge), &config),
        Err(BridgeError::ConfigError(_))
    ));

    config.peer_path = "game/mc".to_string();
    assert!(matches!(
        routes(Arc::clone(&hub), Arc::clone(&bridge), &config),
        Err(BridgeError::ConfigError(_))
    ));

    config.peer_path = "ws".to_string();
    assert!(matches!(
        routes(hub, bridge, &config),
        Err(BridgeError::ConfigError(_))
    ));
}

#[tokio::test]
async fn test_unknown_path_is_rejected() {
    let (hub, bridge, config) = setup();
    let filter = routes(hub, bridge, &config).unwrap();

    let response = warp::test::request().path("/admin").reply(&filter).await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_peer_endpoint_attaches_bridge() {
    let (hub, bridge, config) = setup();
    let filter = routes(hub, Arc::clone(&bridge), &config).unwrap();

    let mut game = warp::test::ws()
        .path("/mc")
        .handshake(filter.clone())
        .await
        .expect("peer handshake");

    let watched = Arc::clone(&bridge);
    wait_until(move || watched.is_connected()).await;

    let call = {
        let bridge = Arc::clone(&bridge);
        tokio::spawn(async move { bridge.send_command("list").await })
    };

    let msg = game.recv().await.expect("command frame");
    let cmd: Value = serde_json::from_str(msg.to_str().unwrap()).unwrap();
    assert_eq!(cmd["type"], "CMD");
    assert_eq!(cmd["body"], "list");

    let reply = json!({"type": "RES", "id": cmd["id"], "body": "Alice, Bob"});
    game.send_text(reply.to_string()).await;

    assert_eq!(call.await.unwrap(), Ok("Alice, Bob".to_string()));

    let response = warp::test::request().path("/status").reply(&filter).await;
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["bridge"]["connected"], json!(true));
    assert_eq!(body["bridge"]["generation"], json!(1));
}

#[tokio::test]
async fn test_second_peer_replaces_first() {
    let (hub, bridge, config) = setup();
    let filter = routes(hub, Arc::clone(&bridge), &config).unwrap();

    let _first = warp::test::ws()
        .path("/mc")
        .handshake(filter.clone())
        .await
        .expect("first handshake");
    let watched = Arc::clone(&bridge);
    wait_until(move || watched.generation() == 1).await;

    let mut second = warp::test::ws()
        .path("/mc")
        .handshake(filter.clone())
        .await
        .expect("second handshake");
    let watched = Arc::clone(&bridge);
    wait_until(move || watched.generation() == 2).await;

    let call = {
        let bridge = Arc::clone(&bridge);
        tokio::spawn(async move { bridge.send_command("time query daytime").await })
    };

    let msg = second.recv().await.expect("command on the new peer");
    let cmd: Value = serde_json::from_str(msg.to_str().unwrap()).unwrap();
    let reply = json!({"type": "RES", "id": cmd["id"], "body": "6000"});
    second.send_text(reply.to_string()).await;

    assert_eq!(call.await.unwrap(), Ok("6000".to_string()));
    assert!(bridge.is_connected());
}

#[tokio::test]
async fn test_observer_endpoint_joins_hub() {
    let (hub, bridge, config) = setup();
    let filter = routes(Arc::clone(&hub), bridge, &config).unwrap();

    let mut first = warp::test::ws()
        .path("/ws")
        .handshake(filter.clone())
        .await
        .expect("first observer handshake");
    let mut second = warp::test::ws()
        .path("/ws")
        .handshake(filter.clone())
        .await
        .expect("second observer handshake");

    let watched = Arc::clone(&hub);
    wait_until(move || watched.observer_count() == 2).await;

    first.send_text("hello observers").await;

    let got_first = first.recv().await.unwrap();
    let got_second = second.recv().await.unwrap();
    assert_eq!(got_first.as_bytes(), b"hello observers");
    assert_eq!(got_second.as_bytes(), b"hello observers");

    drop(first);
    let watched = Arc::clone(&hub);
    wait_until(move || watched.observer_count() == 1).await;
}
