//! Correlated command channel to the game server
//!
//! The bridge owns at most one peer connection at a time. Commands get a fresh
//! correlation id and a single-use waiter; the read loop resolves waiters as
//! `RES`/`ERR` frames arrive and hands `EVT` frames to the installed handler.
//!
//! Every attached connection is tagged with a generation number. A read loop
//! only touches shared state while its generation is still the current one, so
//! the late failure of a replaced socket never disturbs its successor.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::time::Instant;
use uuid::Uuid;
use warp::ws::Message;

use crate::config::BridgeConfig;
use crate::constants::DEFAULT_COMMAND_TIMEOUT;
use crate::core::frame::{self, Frame, FrameKind};
use crate::core::transport::{Connection, MessageReader, MessageWriter};
use crate::error::{BridgeError, Result};

/// Callback for pushed events: `(topic, body)`
pub type EventHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

type SharedWriter = Arc<AsyncMutex<Box<dyn MessageWriter>>>;

struct ActiveConnection {
    generation: u64,
    id: String,
    writer: SharedWriter,
    // Dropping or firing this ends the connection's read loop
    stop: oneshot::Sender<()>,
    attached_at: DateTime<Utc>,
}

struct Waiter {
    generation: u64,
    tx: oneshot::Sender<Result<String>>,
}

#[derive(Default)]
struct BridgeState {
    generation: u64,
    active: Option<ActiveConnection>,
    pending: HashMap<String, Waiter>,
    handler: Option<EventHandler>,
}

/// Point-in-time view of the bridge, served by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct BridgeStatus {
    pub connected: bool,
    pub generation: u64,
    pub pending: usize,
    pub connection_id: Option<String>,
    pub attached_at: Option<DateTime<Utc>>,
}

pub struct Bridge {
    state: Arc<Mutex<BridgeState>>,
    command_timeout: Duration,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn with_timeout(command_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(BridgeState::default())),
            command_timeout,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::with_timeout(config.command_timeout)
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Install `connection` as the only active peer connection.
    ///
    /// The previous connection, if any, is closed and its pending commands fail
    /// with `BridgeClosed`. Returns the generation assigned to the new connection.
    pub async fn attach(&self, connection: Connection) -> Result<u64> {
        let (connection_id, reader, writer) = connection.into_parts();
        let (stop_tx, stop_rx) = oneshot::channel();
        let writer: SharedWriter = Arc::new(AsyncMutex::new(writer));

        let (generation, previous, abandoned) = {
            let mut state = self.state.lock()?;
            state.generation += 1;
            let generation = state.generation;

            let previous = state.active.replace(ActiveConnection {
                generation,
                id: connection_id.clone(),
                writer,
                stop: stop_tx,
                attached_at: Utc::now(),
            });

            // Waiters are registered against the generation current at the time,
            // so everything still pending belongs to the connection being replaced
            let abandoned: Vec<(String, Waiter)> = state.pending.drain().collect();
            (generation, previous, abandoned)
        };

        info!(
            "Game server attached: connection {} (generation {})",
            connection_id, generation
        );

        tokio::spawn(read_loop(
            Arc::clone(&self.state),
            generation,
            connection_id,
            reader,
            stop_rx,
        ));

        if let Some(previous) = previous {
            warn!(
                "Replacing connection {} (generation {}); failing {} pending commands",
                previous.id,
                previous.generation,
                abandoned.len()
            );
            let _ = previous.stop.send(());
            close_writer(previous.id, previous.writer);
        }

        fail_waiters(abandoned);
        Ok(generation)
    }

    /// Send a command and wait for its reply, bounded by the command timeout
    pub async fn send_command(&self, text: &str) -> Result<String> {
        self.send_command_until(text, std::future::pending::<()>())
            .await
    }

    /// Like [`Bridge::send_command`], but gives up with `Cancelled` as soon as
    /// `cancel` completes. Dropping the returned future also releases the waiter.
    ///
    /// The timeout covers the whole command, including waiting for the write
    /// lock and a socket write that never completes.
    pub async fn send_command_until<F>(&self, text: &str, cancel: F) -> Result<String>
    where
        F: Future<Output = ()>,
    {
        let deadline = Instant::now() + self.command_timeout;
        let (id, generation, writer, rx) = self.register_command()?;
        let _guard = WaiterGuard {
            state: &self.state,
            id: &id,
        };
        tokio::pin!(cancel);

        let encoded = frame::encode(&Frame::command(id.as_str(), text))?;
        let write = async {
            let mut writer = writer.lock().await;
            writer.send(Message::text(encoded)).await
        };

        tokio::select! {
            written = tokio::time::timeout_at(deadline, write) => match written {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Bridge failed to write command {}: {}", id, e);
                    return Err(match e {
                        BridgeError::TransportWrite(msg) => BridgeError::TransportWrite(msg),
                        other => BridgeError::TransportWrite(other.to_string()),
                    });
                }
                Err(_) => {
                    warn!(
                        "Bridge command {} timed out after {:?} while writing",
                        id, self.command_timeout
                    );
                    return Err(BridgeError::Timeout);
                }
            },
            _ = &mut cancel => {
                warn!("Bridge command {} cancelled by caller before it was written", id);
                return Err(BridgeError::Cancelled);
            }
        }

        info!(
            "Bridge sent command {} (generation {}): {}",
            id, generation, text
        );

        tokio::select! {
            outcome = tokio::time::timeout_at(deadline, rx) => match outcome {
                Ok(Ok(Ok(body))) => {
                    info!("Bridge command {} result: {}", id, body);
                    Ok(body)
                }
                Ok(Ok(Err(e))) => {
                    error!("Bridge command {} failed: {}", id, e);
                    Err(e)
                }
                // Waiter dropped without a resolution
                Ok(Err(_)) => Err(BridgeError::BridgeClosed),
                Err(_) => {
                    warn!("Bridge command {} timed out after {:?}", id, self.command_timeout);
                    Err(BridgeError::Timeout)
                }
            },
            _ = &mut cancel => {
                warn!("Bridge command {} cancelled by caller", id);
                Err(BridgeError::Cancelled)
            }
        }
    }

    fn register_command(
        &self,
    ) -> Result<(String, u64, SharedWriter, oneshot::Receiver<Result<String>>)> {
        let mut state = self.state.lock()?;

        let (generation, writer) = match state.active.as_ref() {
            Some(active) => (active.generation, Arc::clone(&active.writer)),
            None => return Err(BridgeError::NotConnected),
        };

        let mut id = Uuid::new_v4().to_string();
        while state.pending.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }

        let (tx, rx) = oneshot::channel();
        state.pending.insert(id.clone(), Waiter { generation, tx });
        Ok((id, generation, writer, rx))
    }

    /// Whether a peer connection is installed right now. Advisory only.
    pub fn is_connected(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.active.is_some())
            .unwrap_or(false)
    }

    /// Install the callback for pushed events, replacing any previous one
    pub fn set_handler<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(&str, &str) + Send + Sync + 'static,
    {
        self.state.lock()?.handler = Some(Arc::new(handler));
        Ok(())
    }

    /// Number of commands waiting for a reply
    pub fn pending_commands(&self) -> usize {
        self.state
            .lock()
            .map(|state| state.pending.len())
            .unwrap_or(0)
    }

    /// Generation of the most recently attached connection (0 if none ever was)
    pub fn generation(&self) -> u64 {
        self.state.lock().map(|state| state.generation).unwrap_or(0)
    }

    pub fn status(&self) -> Result<BridgeStatus> {
        let state = self.state.lock()?;
        Ok(BridgeStatus {
            connected: state.active.is_some(),
            generation: state.generation,
            pending: state.pending.len(),
            connection_id: state.active.as_ref().map(|a| a.id.clone()),
            attached_at: state.active.as_ref().map(|a| a.attached_at),
        })
    }
}

// Removes the waiter on every exit path of a command, including drop
struct WaiterGuard<'a> {
    state: &'a Mutex<BridgeState>,
    id: &'a str,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        match self.state.lock() {
            Ok(mut state) => {
                state.pending.remove(self.id);
            }
            Err(e) => error!("Failed to release waiter {}: {}", self.id, e),
        }
    }
}

fn fail_waiters(waiters: Vec<(String, Waiter)>) {
    for (id, waiter) in waiters {
        if waiter.tx.send(Err(BridgeError::BridgeClosed)).is_err() {
            debug!("Waiter {} already gone", id);
        }
    }
}

fn close_writer(connection_id: String, writer: SharedWriter) {
    // Read loops also exit while the runtime is being torn down
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        debug!("No runtime left to close {}", connection_id);
        return;
    };
    runtime.spawn(async move {
        if let Err(e) = writer.lock().await.close().await {
            debug!("Ignoring close error on {}: {}", connection_id, e);
        }
    });
}

async fn read_loop(
    state: Arc<Mutex<BridgeState>>,
    generation: u64,
    connection_id: String,
    mut reader: Box<dyn MessageReader>,
    mut stop: oneshot::Receiver<()>,
) {
    let _exit = ReadLoopExit {
        state: Arc::clone(&state),
        generation,
        connection_id: connection_id.clone(),
    };

    loop {
        let data = tokio::select! {
            _ = &mut stop => {
                debug!("Bridge read loop for {} stopped", connection_id);
                break;
            }
            result = reader.read_message() => match result {
                Ok(Some(data)) => data,
                Ok(None) => {
                    info!("Game server connection {} closed", connection_id);
                    break;
                }
                Err(e) => {
                    warn!("Game server connection {} failed: {}", connection_id, e);
                    break;
                }
            }
        };

        match frame::decode(&data) {
            Ok(frame) => dispatch_frame(&state, generation, frame),
            Err(e) => warn!("Bridge dropped bad frame on {}: {}", connection_id, e),
        }
    }
}

// Runs the exit bookkeeping of a read loop, also when an event handler panics
struct ReadLoopExit {
    state: Arc<Mutex<BridgeState>>,
    generation: u64,
    connection_id: String,
}

impl Drop for ReadLoopExit {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!(
                "Bridge read loop for {} panicked, closing the connection",
                self.connection_id
            );
        }
        finish_read_loop(&self.state, self.generation, &self.connection_id);
    }
}

fn dispatch_frame(state: &Mutex<BridgeState>, generation: u64, frame: Frame) {
    debug!(
        "Bridge recv type={:?} id={:?} topic={:?}",
        frame.kind, frame.id, frame.topic
    );

    match frame.kind {
        FrameKind::Response | FrameKind::Error => {
            let Some(id) = frame.correlation_id() else {
                warn!("Bridge {:?} frame without id ignored", frame.kind);
                return;
            };

            let (waiter, pending) = match state.lock() {
                Ok(mut state) => {
                    let owned = state
                        .pending
                        .get(id)
                        .is_some_and(|w| w.generation == generation);
                    let waiter = if owned { state.pending.remove(id) } else { None };
                    (waiter, state.pending.len())
                }
                Err(e) => {
                    error!("Bridge state unavailable: {}", e);
                    return;
                }
            };

            let Some(waiter) = waiter else {
                debug!(
                    "Bridge {:?} for unknown id {} ({} pending)",
                    frame.kind, id, pending
                );
                return;
            };

            let result = match frame.kind {
                FrameKind::Response => Ok(frame.body_text().to_string()),
                _ => Err(BridgeError::RemoteError(
                    frame.msg.clone().unwrap_or_default(),
                )),
            };
            if waiter.tx.send(result).is_err() {
                debug!("Bridge caller for {} left before its reply", id);
            }
        }
        FrameKind::Event => {
            let handler = match state.lock() {
                Ok(state) => state.handler.clone(),
                Err(e) => {
                    error!("Bridge state unavailable: {}", e);
                    return;
                }
            };

            match handler {
                Some(handler) => {
                    handler(frame.topic.as_deref().unwrap_or_default(), frame.body_text())
                }
                None => debug!("Bridge event dropped, no handler installed"),
            }
        }
        FrameKind::Command | FrameKind::Unknown => {
            debug!("Bridge ignored frame of type {:?}", frame.kind);
        }
    }
}

fn finish_read_loop(state: &Mutex<BridgeState>, generation: u64, connection_id: &str) {
    let (closed, abandoned) = {
        let mut state = match state.lock() {
            Ok(state) => state,
            Err(e) => {
                error!("Bridge state unavailable on read loop exit: {}", e);
                return;
            }
        };

        let still_active = state
            .active
            .as_ref()
            .is_some_and(|active| active.generation == generation);
        if !still_active {
            warn!(
                "Bridge read loop exit for stale connection {} (generation {})",
                connection_id, generation
            );
            return;
        }

        let closed = state.active.take();
        let abandoned: Vec<(String, Waiter)> = state.pending.drain().collect();
        (closed, abandoned)
    };

    warn!(
        "Bridge read loop closing active connection {}; failing {} pending commands",
        connection_id,
        abandoned.len()
    );

    if let Some(closed) = closed {
        close_writer(closed.id, closed.writer);
    }
    fail_waiters(abandoned);
}

// Thread-safe bridge wrapper
pub type SharedBridge = Arc<Bridge>;

pub fn create_bridge(config: &BridgeConfig) -> SharedBridge {
    Arc::new(Bridge::from_config(config))
}
