use log::error;
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

use crate::core::{BridgeStatus, SharedBridge, SharedHub};

/// Body of the `status` endpoint
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub bridge: BridgeStatus,
    pub observers: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn status_reply(hub: SharedHub, bridge: SharedBridge) -> WithStatus<Json> {
    match bridge.status() {
        Ok(status) => {
            let report = StatusReport {
                bridge: status,
                observers: hub.observer_count(),
            };
            warp::reply::with_status(warp::reply::json(&report), StatusCode::OK)
        }
        Err(e) => {
            error!("Failed to read bridge status: {}", e);
            warp::reply::with_status(
                warp::reply::json(&ErrorBody {
                    error: e.to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}
