//! Session handle, inputs, builder.
//!
//! [`ClientSession`] is the public face of the crate. It accepts inputs
//! without blocking, exposes session state through a watch cell, and tears
//! everything down on [`stop`](ClientSession::stop).
//!
//! # Example
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! use rcswitch_client::{ClientSession, Input, Payload, ServiceTarget};
//!
//! # async fn example() {
//! let session = ClientSession::builder().build();
//!
//! session.submit(Input::Connect(ServiceTarget::new(
//!     "Kitchen",
//!     IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
//!     4999,
//! )));
//! session.submit(Input::Send(
//!     Payload::new("SwitchProtocol").with_action("toggle"),
//! ));
//!
//! session.stop().await;
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::broadcast::{BroadcastSink, NoBroadcast};
use crate::discovery::ServiceTarget;
use crate::protocol::Payload;
use crate::state::{ClientState, Mutation};
use crate::transport::socket::DEFAULT_CONNECT_TIMEOUT;

use super::reducer;
use super::sequencer::{self, LatestConnection};
use super::write;

// ============================================================================
// Input
// ============================================================================

/// Inputs accepted by a running session.
#[derive(Debug)]
pub enum Input {
    /// Begin a connection attempt to a discovered hub.
    ///
    /// Targets submitted while an attempt is in flight overwrite each
    /// other; only the most recent one is tried next.
    Connect(ServiceTarget),

    /// Queue a command for the current session.
    ///
    /// Dropped if no session is established when the worker picks it up.
    Send(Payload),

    /// Record whether the embedding UI is in the background.
    ContextChanged {
        /// `true` when the UI is not visible.
        in_background: bool,
    },
}

// ============================================================================
// SessionInner
// ============================================================================

/// Shared state behind [`ClientSession`] handles.
struct SessionInner {
    /// Newest-wins slot of requested targets (read by the sequencer).
    connect_tx: watch::Sender<Option<ServiceTarget>>,
    /// Outbound payload queue (read by the write worker).
    send_tx: mpsc::UnboundedSender<Payload>,
    /// Direct mutation queue; taken on stop so the stop marker is final.
    mutations_tx: Mutex<Option<mpsc::UnboundedSender<Mutation>>>,
    /// Observable state cell.
    state_rx: watch::Receiver<ClientState>,
    /// Stop signal watched by all workers.
    shutdown_tx: watch::Sender<bool>,
    /// Worker tasks, joined on stop.
    handles: Mutex<Vec<JoinHandle<()>>>,
}

// ============================================================================
// ClientSession
// ============================================================================

/// Handle to a running client session.
///
/// The handle is cheap to clone; all clones drive the same session. Workers
/// run on background tasks, so every method except [`stop`](Self::stop)
/// returns immediately.
///
/// # Thread Safety
///
/// `ClientSession` is `Send + Sync` and can be shared across tasks.
#[derive(Clone)]
pub struct ClientSession {
    /// Shared inner state.
    inner: Arc<SessionInner>,
}

impl fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSession")
            .field("state", &self.current_state())
            .finish_non_exhaustive()
    }
}

impl ClientSession {
    /// Creates a configuration builder for a session.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Submits an input without blocking.
    ///
    /// Submission never fails; inputs submitted after
    /// [`stop`](Self::stop) are ignored.
    pub fn submit(&self, input: Input) {
        match input {
            Input::Connect(target) => {
                debug!(target = %target, "Connect requested");
                self.inner.connect_tx.send_replace(Some(target));
            }

            Input::Send(payload) => {
                trace!(key = %payload.key, "Send requested");
                if self.inner.send_tx.send(payload).is_err() {
                    trace!("Send after stop ignored");
                }
            }

            Input::ContextChanged { in_background } => {
                debug!(in_background, "Context changed");
                self.send_mutation(Box::new(move |state| ClientState {
                    in_background,
                    ..state
                }));
            }
        }
    }

    /// Returns a watch handle on the observable session state.
    ///
    /// The handle always holds the latest state. A slow observer may skip
    /// intermediate states but never misses the latest one.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ClientState> {
        self.inner.state_rx.clone()
    }

    /// Returns a snapshot of the current session state.
    #[must_use]
    pub fn current_state(&self) -> ClientState {
        self.inner.state_rx.borrow().clone()
    }

    /// Stops the session and waits for its workers to terminate.
    ///
    /// The state cell ends with `is_stopped` set and any live session torn
    /// down. Safe to call more than once; later calls return immediately.
    pub async fn stop(&self) {
        let taken = {
            let mut guard = self.inner.mutations_tx.lock();

            if let Some(tx) = guard.as_ref() {
                // The stop marker is the final direct mutation.
                let _ = tx.send(Box::new(|state| ClientState {
                    is_stopped: true,
                    ..state
                }));
            }

            guard.take()
        };
        drop(taken);

        self.inner.shutdown_tx.send_replace(true);

        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.inner.handles.lock();
            guard.drain(..).collect()
        };

        if handles.is_empty() {
            return;
        }

        info!("Session stopping");

        for result in future::join_all(handles).await {
            if let Err(e) = result {
                debug!(error = %e, "Worker ended abnormally");
            }
        }

        info!("Session stopped");
    }

    fn send_mutation(&self, mutation: Mutation) {
        let guard = self.inner.mutations_tx.lock();

        match guard.as_ref() {
            Some(tx) => {
                let _ = tx.send(mutation);
            }
            None => trace!("Mutation after stop ignored"),
        }
    }
}

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`ClientSession`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
///
/// use rcswitch_client::ClientSession;
///
/// # async fn example() {
/// let session = ClientSession::builder()
///     .connect_timeout(Duration::from_secs(5))
///     .build();
/// # }
/// ```
pub struct SessionBuilder {
    /// Notification sink handed to the reducer.
    broadcaster: Arc<dyn BroadcastSink>,
    /// Deadline for TCP connection establishment.
    connect_timeout: Duration,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            broadcaster: Arc::new(NoBroadcast),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl SessionBuilder {
    /// Creates a builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sink receiving status and response notifications.
    ///
    /// Defaults to [`NoBroadcast`].
    #[must_use]
    pub fn broadcaster(mut self, broadcaster: impl BroadcastSink + 'static) -> Self {
        self.broadcaster = Arc::new(broadcaster);
        self
    }

    /// Sets the deadline for TCP connection establishment.
    ///
    /// Defaults to 10 seconds.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Builds the session and spawns its worker tasks.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn build(self) -> ClientSession {
        let (connect_tx, connect_rx) = watch::channel(None);
        let (send_tx, send_rx) = mpsc::unbounded_channel();
        let (mutations_tx, mutations_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ClientState::default());
        let (latest_tx, latest_rx) = watch::channel(LatestConnection::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = vec![
            tokio::spawn(sequencer::run(
                connect_rx,
                events_tx,
                latest_tx,
                shutdown_rx.clone(),
                self.connect_timeout,
            )),
            tokio::spawn(reducer::run(
                events_rx,
                mutations_rx,
                state_tx,
                self.broadcaster,
            )),
            tokio::spawn(write::run(send_rx, latest_rx, shutdown_rx)),
        ];

        debug!("Session workers spawned");

        ClientSession {
            inner: Arc::new(SessionInner {
                connect_tx,
                send_tx,
                mutations_tx: Mutex::new(Some(mutations_tx)),
                state_rx,
                shutdown_tx,
                handles: Mutex::new(handles),
            }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    use crate::state::Status;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
    const WAIT: Duration = Duration::from_secs(5);

    /// Records every broadcast for later inspection.
    #[derive(Clone, Default)]
    struct Recorder {
        statuses: Arc<Mutex<Vec<Status>>>,
        responses: Arc<Mutex<Vec<String>>>,
    }

    impl BroadcastSink for Recorder {
        fn connection_status(&self, status: Status) {
            self.statuses.lock().push(status);
        }

        fn server_response(&self, line: &str) {
            self.responses.lock().push(line.to_owned());
        }
    }

    /// Polls a recorded list until it reaches the wanted length.
    async fn await_recorded<T: Clone>(list: &Arc<Mutex<Vec<T>>>, count: usize) -> Vec<T> {
        timeout(WAIT, async {
            loop {
                {
                    let guard = list.lock();
                    if guard.len() >= count {
                        return guard.clone();
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("recorded wait timed out")
    }

    /// Waits until the state cell reaches the given status.
    async fn await_status(
        state_rx: &mut watch::Receiver<ClientState>,
        status: Status,
    ) -> ClientState {
        timeout(WAIT, state_rx.wait_for(|state| state.status == status))
            .await
            .expect("status wait timed out")
            .expect("state watch closed")
            .clone()
    }

    async fn local_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind((LOCALHOST, 0)).await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        (listener, port)
    }

    #[tokio::test]
    async fn test_connect_send_and_goodbye_round_trip() {
        let (listener, port) = local_listener().await;

        // Scripted hub: greet, read one command, say goodbye.
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            write_half.write_all(b"Welcome\n").await.expect("greet");
            let command = lines.next_line().await.expect("read command");
            write_half.write_all(b"Bye.\n").await.expect("goodbye");

            command
        });

        let recorder = Recorder::default();
        let session = ClientSession::builder()
            .broadcaster(recorder.clone())
            .build();
        let mut state_rx = session.state();

        session.submit(Input::Connect(ServiceTarget::new(
            "Kitchen", LOCALHOST, port,
        )));

        let state = await_status(&mut state_rx, Status::Connected).await;
        assert_eq!(state.service_name.as_deref(), Some("Kitchen"));

        session.submit(Input::Send(
            Payload::new("SwitchProtocol").with_action("toggle"),
        ));

        let command = timeout(WAIT, server)
            .await
            .expect("server wait timed out")
            .expect("server task");
        assert_eq!(
            command.as_deref(),
            Some(r#"{"key":"SwitchProtocol","action":"toggle"}"#)
        );

        let state = await_status(&mut state_rx, Status::Disconnected).await;
        assert_eq!(state.service_name, None);

        let statuses = await_recorded(&recorder.statuses, 4).await;
        assert_eq!(
            statuses,
            vec![
                Status::Disconnected,
                Status::Connecting,
                Status::Connected,
                Status::Disconnected,
            ]
        );

        let responses = await_recorded(&recorder.responses, 2).await;
        assert_eq!(responses, vec!["Welcome".to_owned(), "Bye.".to_owned()]);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_refused_connection_cycles_back_to_disconnected() {
        // Bind then drop to get a port with nothing listening.
        let (listener, port) = local_listener().await;
        drop(listener);

        let recorder = Recorder::default();
        let session = ClientSession::builder()
            .broadcaster(recorder.clone())
            .build();

        session.submit(Input::Connect(ServiceTarget::new(
            "Kitchen", LOCALHOST, port,
        )));

        let statuses = await_recorded(&recorder.statuses, 3).await;
        assert_eq!(
            statuses,
            vec![
                Status::Disconnected,
                Status::Connecting,
                Status::Disconnected,
            ]
        );

        // The failed attempt leaves no trace in the state cell.
        let state = session.current_state();
        assert_eq!(state.status, Status::Disconnected);
        assert_eq!(state.service_name, None);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_newest_target_wins_while_attempt_runs() {
        // Target A holds its session open until told to say goodbye.
        let (listener_a, port_a) = local_listener().await;
        let (goodbye_tx, goodbye_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let (mut stream, _) = listener_a.accept().await.expect("accept");
            let _ = goodbye_rx.await;
            stream.write_all(b"Bye.\n").await.expect("goodbye");
        });

        // Intermediate targets count the connections they never receive.
        let mut skipped = Vec::new();
        for _ in 0..3 {
            let (listener, port) = local_listener().await;
            let accepted = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&accepted);

            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    counter.fetch_add(1, Ordering::SeqCst);
                    drop(stream);
                }
            });

            skipped.push((port, accepted));
        }

        // The final target accepts and holds.
        let (listener_e, port_e) = local_listener().await;
        tokio::spawn(async move {
            let (stream, _) = listener_e.accept().await.expect("accept");
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(_)) = lines.next_line().await {}
        });

        let session = ClientSession::builder().build();
        let mut state_rx = session.state();

        session.submit(Input::Connect(ServiceTarget::new("A", LOCALHOST, port_a)));
        let state = await_status(&mut state_rx, Status::Connected).await;
        assert_eq!(state.service_name.as_deref(), Some("A"));

        // Submitted mid-session: each overwrites the last.
        for (i, (port, _)) in skipped.iter().enumerate() {
            let name = format!("skipped {i}");
            session.submit(Input::Connect(ServiceTarget::new(name, LOCALHOST, *port)));
        }
        session.submit(Input::Connect(ServiceTarget::new("E", LOCALHOST, port_e)));

        // End session A; the sequencer moves straight to the newest target.
        goodbye_tx.send(()).expect("signal goodbye");

        timeout(
            WAIT,
            state_rx.wait_for(|s| {
                s.status == Status::Connected && s.service_name.as_deref() == Some("E")
            }),
        )
        .await
        .expect("wait for final target timed out")
        .expect("state watch closed");

        for (_, accepted) in &skipped {
            assert_eq!(accepted.load(Ordering::SeqCst), 0);
        }

        session.stop().await;
    }

    #[tokio::test]
    async fn test_stop_finalizes_state_and_ignores_later_inputs() {
        let (listener, port) = local_listener().await;

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(_)) = lines.next_line().await {}
        });

        let session = ClientSession::builder().build();
        let mut state_rx = session.state();

        session.submit(Input::Connect(ServiceTarget::new(
            "Kitchen", LOCALHOST, port,
        )));
        await_status(&mut state_rx, Status::Connected).await;

        session.stop().await;

        let state = session.current_state();
        assert!(state.is_stopped);
        assert_eq!(state.status, Status::Disconnected);

        // Everything after stop is ignored without panicking.
        session.submit(Input::ContextChanged {
            in_background: false,
        });
        session.submit(Input::Send(Payload::new("SwitchProtocol")));
        session.stop().await;

        assert!(session.current_state().in_background);
    }

    #[tokio::test]
    async fn test_send_without_session_is_dropped() {
        let (listener, port) = local_listener().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut lines = BufReader::new(stream).lines();
            lines.next_line().await.expect("read first line")
        });

        let session = ClientSession::builder().build();
        let mut state_rx = session.state();

        // No session yet: the worker drops this payload.
        session.submit(Input::Send(
            Payload::new("SwitchProtocol").with_data("early"),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;

        session.submit(Input::Connect(ServiceTarget::new(
            "Kitchen", LOCALHOST, port,
        )));
        await_status(&mut state_rx, Status::Connected).await;

        session.submit(Input::Send(
            Payload::new("SwitchProtocol").with_data("late"),
        ));

        // The first line the hub sees is the post-connect payload.
        let first = timeout(WAIT, server)
            .await
            .expect("server wait timed out")
            .expect("server task");
        assert_eq!(
            first.as_deref(),
            Some(r#"{"key":"SwitchProtocol","data":"late"}"#)
        );

        session.stop().await;
    }

    #[tokio::test]
    async fn test_context_changes_flow_into_state() {
        let session = ClientSession::builder().build();
        let mut state_rx = session.state();

        assert!(session.current_state().in_background);

        session.submit(Input::ContextChanged {
            in_background: false,
        });

        let state = timeout(WAIT, state_rx.wait_for(|s| !s.in_background))
            .await
            .expect("context wait timed out")
            .expect("state watch closed")
            .clone();
        assert_eq!(state.status, Status::Disconnected);

        session.stop().await;
    }

    #[tokio::test]
    async fn test_equal_state_is_not_republished() {
        let session = ClientSession::builder().build();
        let mut state_rx = session.state();
        state_rx.borrow_and_update();

        // Matches the default state exactly.
        session.submit(Input::ContextChanged {
            in_background: true,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!state_rx.has_changed().expect("state watch open"));

        session.stop().await;
    }

    #[tokio::test]
    async fn test_clones_share_the_session() {
        let session = ClientSession::builder().build();
        let clone = session.clone();

        session.submit(Input::ContextChanged {
            in_background: false,
        });

        let mut state_rx = clone.state();
        timeout(WAIT, state_rx.wait_for(|s| !s.in_background))
            .await
            .expect("context wait timed out")
            .expect("state watch closed");

        clone.stop().await;
        assert!(session.current_state().is_stopped);
    }

    #[tokio::test]
    async fn test_builder_defaults() {
        let builder = SessionBuilder::new();
        assert_eq!(builder.connect_timeout, Duration::from_secs(10));

        let session = builder.build();
        assert_eq!(session.current_state(), ClientState::default());

        session.stop().await;
    }

    #[test]
    fn test_builder_connect_timeout() {
        let builder = SessionBuilder::new().connect_timeout(Duration::from_secs(3));
        assert_eq!(builder.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_session_is_clone_and_debug() {
        fn assert_clone<T: Clone>() {}
        fn assert_debug<T: fmt::Debug>() {}
        assert_clone::<ClientSession>();
        assert_debug::<ClientSession>();
    }
}
