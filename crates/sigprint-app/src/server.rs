//! WebSocket broadcast of encoded frames
//!
//! Runs the pipeline in a background task and fans the 383-byte frames
//! out to every connected WebSocket client. Clients receive a JSON
//! welcome message, then a binary message per packet. Lagging clients
//! drop frames rather than stalling the pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use sigprint_core::protocol::PACKET_SIZE;
use sigprint_core::types::{CHANNEL_COUNT, SAMPLE_RATE_HZ};

use crate::pipeline::Pipeline;
use crate::source::{SampleSource, SyntheticSource};
use crate::stage::StageClock;

/// Samples per packet tick (250 Hz / 25 Hz).
const SAMPLES_PER_PACKET: u32 = 10;

type Frame = [u8; PACKET_SIZE];

struct AppState {
    tx: broadcast::Sender<Frame>,
}

/// Build a runtime and serve until interrupted.
pub fn run(bind: String, port: u16) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(serve(bind, port))
}

async fn serve(bind: String, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;

    let (tx, _) = broadcast::channel::<Frame>(256);
    tokio::spawn(stream_packets(tx.clone()));

    let state = Arc::new(AppState { tx });
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/sigprint", get(ws_handler)) // Alias
        .route(
            "/health",
            get(|| async { axum::Json(serde_json::json!({"status": "ok"})) }),
        )
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state);

    info!("Server listening on http://{addr}");
    info!("WebSocket endpoint: ws://{addr}/sigprint");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Drive the pipeline at the sample rate and broadcast each packet tick.
async fn stream_packets(tx: broadcast::Sender<Frame>) {
    let mut source = SyntheticSource::new();
    let mut pipeline = Pipeline::new();

    let start = Instant::now();
    let mut stage = StageClock::new(start);
    let mut frame = [0i32; CHANNEL_COUNT];
    let mut sample_count: u32 = 0;

    let sample_period = Duration::from_micros(u64::from(1_000_000 / SAMPLE_RATE_HZ));

    loop {
        if source.available() && source.read_frame(&mut frame) {
            pipeline.ingest(&frame);
        }

        sample_count = sample_count.wrapping_add(1);
        if sample_count % SAMPLES_PER_PACKET == 0 {
            let now = Instant::now();
            stage.poll(now);
            let now_ms = now.duration_since(start).as_millis() as u32;
            let bytes = pipeline.tick(now_ms, stage.stage());
            // Ignore send errors (no subscribers)
            let _ = tx.send(*bytes);
        }

        tokio::time::sleep(sample_period).await;
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.tx.subscribe();

    info!("WebSocket client connected");

    let welcome = serde_json::json!({
        "type": "welcome",
        "version": env!("CARGO_PKG_VERSION"),
        "frame_bytes": PACKET_SIZE,
    });
    if socket
        .send(Message::Text(welcome.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(frame) => {
                        if socket.send(Message::Binary(frame.to_vec().into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Client lagged, dropped {n} frames");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
