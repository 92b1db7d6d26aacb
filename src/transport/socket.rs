//! Line-framed TCP socket with a detached writer task.
//!
//! This module owns the raw byte-level conversation with the hub. Reads and
//! writes are decoupled: the caller reads lines directly off the read half,
//! while writes go through a [`LineSink`] handle that feeds a spawned writer
//! task owning the write half.
//!
//! # Write Failure Model
//!
//! Writes never surface errors to the caller. The first failed write sets a
//! sticky failed flag on the sink; later writes on a failed sink are dropped
//! silently. Callers that care check [`LineSink::has_failed`] before writing.
//!
//! # Goodbye Handling
//!
//! The hub terminates a session by sending the [`SERVER_GOODBYE`] line and
//! closing. [`LineSocket::read_line`] recognizes it, closes the socket, and
//! still hands the line to the caller so it reaches the response channel.

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Line the server sends immediately before closing the session.
pub const SERVER_GOODBYE: &str = "Bye.";

/// Default deadline for TCP connection establishment.
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// SinkCommand
// ============================================================================

/// Internal commands for the writer task.
enum SinkCommand {
    /// Write one line (terminator appended by the writer task).
    Line(String),
    /// Shut down the write half.
    Close,
}

// ============================================================================
// LineSink
// ============================================================================

/// Write handle for a [`LineSocket`].
///
/// Cheap to clone; all clones feed the same writer task. Writes are
/// fire-and-forget and never block.
#[derive(Debug, Clone)]
pub struct LineSink {
    /// Channel into the writer task.
    command_tx: mpsc::UnboundedSender<SinkCommand>,
    /// Sticky write-failure flag (shared with the writer task).
    failed: Arc<AtomicBool>,
}

impl LineSink {
    /// Queues one line for writing.
    ///
    /// Returns immediately. If the writer task has already terminated the
    /// line is dropped and the sink is marked failed.
    pub fn write_line(&self, line: impl Into<String>) {
        if self.command_tx.send(SinkCommand::Line(line.into())).is_err() {
            self.failed.store(true, Ordering::Relaxed);
        }
    }

    /// Returns `true` once any write has failed.
    ///
    /// The flag is sticky: a failed sink never recovers.
    #[inline]
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }
}

// ============================================================================
// LineSocket
// ============================================================================

/// A connected, line-oriented TCP session with the hub.
///
/// Reading happens on the caller's task via [`read_line`](Self::read_line);
/// writing happens on an internal task fed through [`sink`](Self::sink)
/// handles. Dropping the socket closes it.
pub struct LineSocket {
    /// Buffered line reader over the read half.
    lines: Lines<BufReader<OwnedReadHalf>>,
    /// Write handle (cloned out to callers).
    sink: LineSink,
    /// Set once the socket is closed; reads return `None` afterwards.
    closed: bool,
}

impl LineSocket {
    /// Connects to `host:port` with the default deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectTimeout`] if the connection is not established in time
    /// - [`Error::Io`] if the connection attempt fails outright
    pub async fn open(host: IpAddr, port: u16) -> Result<Self> {
        Self::open_with_timeout(host, port, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connects to `host:port` with a caller-supplied deadline.
    ///
    /// # Arguments
    ///
    /// * `host` - IP address of the hub
    /// * `port` - TCP port the hub listens on
    /// * `connect_timeout` - Maximum time to wait for establishment
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectTimeout`] if the connection is not established in time
    /// - [`Error::Io`] if the connection attempt fails outright
    pub async fn open_with_timeout(
        host: IpAddr,
        port: u16,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| Error::connect_timeout(connect_timeout.as_millis() as u64))??;

        debug!(%host, port, "TCP connection established");

        let (read_half, write_half) = stream.into_split();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let failed = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_writer(write_half, command_rx, Arc::clone(&failed)));

        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            sink: LineSink { command_tx, failed },
            closed: false,
        })
    }

    /// Reads the next line from the server.
    ///
    /// Returns `Ok(None)` at end of stream or once the socket is closed.
    /// The goodbye line itself is still returned; the socket closes first so
    /// the next read observes the closed state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the underlying read fails.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }

        match self.lines.next_line().await? {
            Some(line) => {
                trace!(line = %line, "Line received");

                if line == SERVER_GOODBYE {
                    debug!("Server said goodbye");
                    self.close();
                }

                Ok(Some(line))
            }
            None => {
                debug!("Stream ended by remote");
                self.close();
                Ok(None)
            }
        }
    }

    /// Returns a clonable write handle for this socket.
    #[inline]
    #[must_use]
    pub fn sink(&self) -> LineSink {
        self.sink.clone()
    }

    /// Returns `true` once the socket has been closed.
    #[inline]
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the socket.
    ///
    /// Idempotent. Stops further reads and asks the writer task to shut
    /// down the write half.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }

        self.closed = true;
        let _ = self.sink.command_tx.send(SinkCommand::Close);

        debug!("Socket closed");
    }
}

impl Drop for LineSocket {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Writer task
// ============================================================================

/// Owns the write half and serializes all outbound lines.
async fn run_writer(
    mut write_half: OwnedWriteHalf,
    mut command_rx: mpsc::UnboundedReceiver<SinkCommand>,
    failed: Arc<AtomicBool>,
) {
    while let Some(command) = command_rx.recv().await {
        match command {
            SinkCommand::Line(line) => {
                if failed.load(Ordering::Relaxed) {
                    trace!(line = %line, "Dropping write on failed sink");
                    continue;
                }

                let mut bytes = line.into_bytes();
                bytes.push(b'\n');

                if let Err(e) = write_half.write_all(&bytes).await {
                    warn!(error = %e, "Write failed, marking sink failed");
                    failed.store(true, Ordering::Relaxed);
                }
            }
            SinkCommand::Close => break,
        }
    }

    let _ = write_half.shutdown().await;

    trace!("Writer task terminated");
}

// ============================================================================
// Tests
// ============================================================================
