//! End-to-end session walkthrough against a scripted local hub.
//!
//! Demonstrates:
//! - Building a session with a broadcast sink
//! - Connecting to a discovered target
//! - Sending commands and watching responses
//! - Context changes and the goodbye handshake
//!
//! Usage:
//!   cargo run --example connect
//!   cargo run --example connect -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use rcswitch_client::{
    BroadcastSink, ClientSession, ClientState, Input, Payload, Result, ServiceTarget, Status,
};

// ============================================================================
// Constants
// ============================================================================

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

// ============================================================================
// Broadcast Sink
// ============================================================================

/// Prints every notification the session broadcasts.
struct PrintSink;

impl BroadcastSink for PrintSink {
    fn connection_status(&self, status: Status) {
        println!("    [broadcast] status: {status:?}");
    }

    fn server_response(&self, line: &str) {
        println!("    [broadcast] server: {line}");
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    println!("=== RC Switch Control client walkthrough ===\n");

    // ========================================================================
    // Scripted Hub
    // ========================================================================

    println!("[1] Starting scripted hub...");
    let (port, hub) = spawn_hub().await?;
    println!("    ✓ Hub listening on 127.0.0.1:{port}\n");

    // ========================================================================
    // Session
    // ========================================================================

    println!("[2] Building session...");
    let session = ClientSession::builder()
        .broadcaster(PrintSink)
        .connect_timeout(Duration::from_secs(5))
        .build();
    let mut state = session.state();
    println!("    ✓ Session ready: {:?}\n", session.current_state());

    // ========================================================================
    // Connect
    // ========================================================================

    println!("[3] Connecting to \"Kitchen\"...");
    session.submit(Input::Connect(ServiceTarget::new(
        "Kitchen", LOCALHOST, port,
    )));
    await_status(&mut state, Status::Connected).await;
    println!("    ✓ Connected: {:?}\n", session.current_state());

    // ========================================================================
    // Commands
    // ========================================================================

    println!("[4] Sending commands...");
    session.submit(Input::Send(
        Payload::new("SwitchProtocol")
            .with_action("toggle")
            .with_data("living room lamp"),
    ));
    session.submit(Input::Send(
        Payload::new("ZigBeeProtocol").with_action("rediscover"),
    ));
    println!("    ✓ Two commands queued\n");

    // ========================================================================
    // Context Change
    // ========================================================================

    println!("[5] Marking the UI as foregrounded...");
    session.submit(Input::ContextChanged {
        in_background: false,
    });
    println!("    ✓ Context updated\n");

    // ========================================================================
    // Goodbye
    // ========================================================================

    println!("[6] Waiting for the hub to say goodbye...");
    await_status(&mut state, Status::Disconnected).await;
    let _ = hub.await;
    println!("    ✓ Session ended: {:?}\n", session.current_state());

    // ========================================================================
    // Shutdown
    // ========================================================================

    println!("[7] Stopping...");
    session.stop().await;
    println!("    ✓ Stopped: {:?}\n", session.current_state());

    println!("=== Walkthrough complete ===");

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Spawns a hub that greets, acks two commands, then says goodbye.
async fn spawn_hub() -> Result<(u16, JoinHandle<()>)> {
    let listener = TcpListener::bind((LOCALHOST, 0)).await?;
    let port = listener.local_addr()?.port();

    let task = tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let _ = write_half
            .write_all(b"Welcome to RC Switch Control\n")
            .await;

        for _ in 0..2 {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let reply = format!("ack: {line}\n");
                    let _ = write_half.write_all(reply.as_bytes()).await;
                }
                _ => return,
            }
        }

        let _ = write_half.write_all(b"Bye.\n").await;
    });

    Ok((port, task))
}

/// Waits until the session reaches the given status.
async fn await_status(state: &mut watch::Receiver<ClientState>, status: Status) {
    if state.wait_for(|s| s.status == status).await.is_err() {
        eprintln!("[WARN] state channel closed while waiting for {status:?}");
    }
}

fn init_logging() {
    let debug = std::env::args().any(|a| a == "--debug");
    let filter = if debug {
        "rcswitch_client=debug"
    } else {
        "rcswitch_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
