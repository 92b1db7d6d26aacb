//! Connection sequencer task.
//!
//! Runs TCP connection attempts strictly one at a time. Requested targets
//! land in a single newest-wins slot: targets submitted while an attempt is
//! in flight overwrite each other, and only the most recent one is tried
//! once the current attempt ends.
//!
//! Each attempt produces an ordered event stream for the reducer
//! (`Connecting`, then `Connected` and server lines on success, then a
//! terminal `Disconnected`) and keeps the latest-connection cell current for
//! the write worker.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::discovery::ServiceTarget;
use crate::state::{ClientState, Mutation, Status};
use crate::transport::{LineSink, LineSocket};

// ============================================================================
// Types
// ============================================================================

/// Events produced by the sequencer for the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionEvent {
    /// A connection lifecycle transition.
    Connection(ConnectionEvent),
    /// A raw line received from the server.
    Response(String),
}

/// Connection lifecycle transitions within one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConnectionEvent {
    /// An attempt is starting.
    Connecting {
        /// Human-readable name of the target service.
        service_name: String,
    },
    /// The socket is established.
    Connected {
        /// Human-readable name of the target service.
        service_name: String,
    },
    /// The attempt ended, whether it ever connected or not.
    Disconnected,
}

impl ConnectionEvent {
    /// Connection status this event maps to.
    pub(crate) const fn status(&self) -> Status {
        match self {
            Self::Connecting { .. } => Status::Connecting,
            Self::Connected { .. } => Status::Connected,
            Self::Disconnected => Status::Disconnected,
        }
    }

    /// State mutation applying this transition.
    ///
    /// Status and service name always move together: an attempt carries its
    /// target's name through `Connecting` and `Connected`, and
    /// `Disconnected` clears it.
    pub(crate) fn mutation(self) -> Mutation {
        let status = self.status();

        let service_name = match self {
            Self::Connecting { service_name } | Self::Connected { service_name } => {
                Some(service_name)
            }
            Self::Disconnected => None,
        };

        Box::new(move |state| ClientState {
            status,
            service_name,
            ..state
        })
    }
}

/// Most recent connection observed by the sequencer.
///
/// This is the write worker's view of the session: it snapshots the cell at
/// send time and only dispatches through a `Connected` sink.
#[derive(Debug, Clone)]
pub(crate) enum LatestConnection {
    /// No attempt is in flight.
    Disconnected,
    /// An attempt is in flight but not yet established.
    Connecting,
    /// A session is established; writes go through this sink.
    Connected(LineSink),
}

// ============================================================================
// Sequencer task
// ============================================================================

/// Runs the sequencer until shutdown or until the session handle goes away.
pub(crate) async fn run(
    mut connect_rx: watch::Receiver<Option<ServiceTarget>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    latest_tx: watch::Sender<LatestConnection>,
    mut shutdown_rx: watch::Receiver<bool>,
    connect_timeout: Duration,
) {
    loop {
        tokio::select! {
            changed = connect_rx.changed() => {
                if changed.is_err() {
                    debug!("Connect channel closed");
                    break;
                }

                let Some(target) = connect_rx.borrow_and_update().clone() else {
                    continue;
                };

                run_attempt(
                    target,
                    &events_tx,
                    &latest_tx,
                    &mut shutdown_rx,
                    connect_timeout,
                )
                .await;
            }

            // The wait_for guard must not escape the future: the connect arm
            // needs the receiver again for run_attempt.
            stopped = async { shutdown_rx.wait_for(|stop| *stop).await.is_ok() } => {
                if stopped {
                    debug!("Shutdown requested");
                }
                break;
            }
        }
    }

    debug!("Sequencer terminated");
}

/// Runs a single connection attempt from `Connecting` to `Disconnected`.
async fn run_attempt(
    target: ServiceTarget,
    events_tx: &mpsc::UnboundedSender<SessionEvent>,
    latest_tx: &watch::Sender<LatestConnection>,
    shutdown_rx: &mut watch::Receiver<bool>,
    connect_timeout: Duration,
) {
    debug!(target = %target, "Connection attempt starting");

    latest_tx.send_replace(LatestConnection::Connecting);
    let _ = events_tx.send(SessionEvent::Connection(ConnectionEvent::Connecting {
        service_name: target.service_name.clone(),
    }));

    let opened = tokio::select! {
        result = LineSocket::open_with_timeout(target.host, target.port, connect_timeout) => {
            Some(result)
        }
        _ = shutdown_rx.wait_for(|stop| *stop) => None,
    };

    match opened {
        Some(Ok(mut socket)) => {
            info!(target = %target, "Connected");

            latest_tx.send_replace(LatestConnection::Connected(socket.sink()));
            let _ = events_tx.send(SessionEvent::Connection(ConnectionEvent::Connected {
                service_name: target.service_name.clone(),
            }));

            read_lines(&mut socket, events_tx, shutdown_rx).await;
            socket.close();
        }

        Some(Err(e)) => {
            debug!(target = %target, error = %e, "Connection attempt failed");
        }

        None => {
            debug!(target = %target, "Shutdown during connect");
        }
    }

    // Every attempt ends Disconnected, whatever path it took.
    latest_tx.send_replace(LatestConnection::Disconnected);
    let _ = events_tx.send(SessionEvent::Connection(ConnectionEvent::Disconnected));

    debug!(target = %target, "Connection attempt finished");
}

/// Pumps server lines into the event channel until the session ends.
async fn read_lines(
    socket: &mut LineSocket,
    events_tx: &mpsc::UnboundedSender<SessionEvent>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            line = socket.read_line() => {
                match line {
                    Ok(Some(line)) => {
                        let _ = events_tx.send(SessionEvent::Response(line));

                        // The goodbye line closes the socket from inside
                        // read_line; it has already been forwarded above.
                        if socket.is_closed() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(error = %e, "Read failed");
                        break;
                    }
                }
            }

            _ = shutdown_rx.wait_for(|stop| *stop) => {
                debug!("Shutdown during session");
                break;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
