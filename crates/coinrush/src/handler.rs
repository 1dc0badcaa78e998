//! Per-connection handler: handshake, registration and message routing.
//!
//! Each accepted socket gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive Handshake → validate version
//!   2. Register with the authority → Welcome + Snapshot are queued
//!   3. A writer task drains the connection's event channel to the socket
//!   4. Loop: receive envelopes → forward requests to the authority

use std::sync::Arc;
use std::time::{Duration, Instant};

use coinrush_protocol::{
    Codec, Envelope, Payload, PlayerId, ProtocolError, ServerEvent, PROTOCOL_VERSION,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::CoinrushError;
use crate::authority::AuthorityHandle;
use crate::server::ServerContext;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Drop guard that unregisters the connection when the handler exits.
///
/// Runs even if the handler errors out. `Drop` is synchronous, so the
/// disconnect is sent from a fire-and-forget task.
struct ConnectionGuard {
    player_id: PlayerId,
    handle: AuthorityHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let _ = handle.disconnect(player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C>(
    stream: TcpStream,
    player_id: PlayerId,
    ctx: Arc<ServerContext<C>>,
) -> Result<(), CoinrushError>
where
    C: Codec + Clone,
{
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut source) = ws.split();
    let start = Instant::now();

    // --- Step 1: Handshake ---
    perform_handshake(&mut sink, &mut source, &ctx.codec, &start).await?;

    // --- Step 2: Register ---
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    ctx.handle.connect(player_id, event_tx).await?;
    let _guard = ConnectionGuard {
        player_id,
        handle: ctx.handle.clone(),
    };

    // --- Step 3: Writer ---
    let writer = tokio::spawn(write_events(sink, event_rx, ctx.codec.clone(), start));

    // --- Step 4: Message loop ---
    while let Some(msg) = source.next().await {
        let data = match msg {
            Ok(Message::Binary(data)) => data.to_vec(),
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let envelope: Envelope = match ctx.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                continue;
            }
        };

        match envelope.payload {
            Payload::Request(request) => {
                tracing::trace!(%player_id, ?request, "request received");
                ctx.handle.submit(player_id, request).await?;
            }
            other => {
                tracing::debug!(%player_id, ?other, "ignoring unexpected payload");
            }
        }
    }

    tracing::info!(%player_id, "connection closed");
    writer.abort();
    // _guard drops here → disconnect fires.
    Ok(())
}

/// Waits for the client's Handshake and checks its version.
async fn perform_handshake(
    sink: &mut WsSink,
    source: &mut WsSource,
    codec: &impl Codec,
    start: &Instant,
) -> Result<(), CoinrushError> {
    let data = match tokio::time::timeout(HANDSHAKE_TIMEOUT, next_data(source)).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let envelope: Envelope = match codec.decode(&data) {
        Ok(env) => env,
        Err(e) => {
            send_error(sink, codec, 400, &format!("invalid handshake: {e}"), start).await?;
            return Err(e.into());
        }
    };

    let version = match envelope.payload {
        Payload::Handshake { version } => version,
        _ => {
            send_error(sink, codec, 400, "expected Handshake", start).await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be Handshake".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            sink,
            codec,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
            start,
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    Ok(())
}

/// Forwards authority events to the socket until either side closes.
async fn write_events<C: Codec>(
    mut sink: WsSink,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
    codec: C,
    start: Instant,
) {
    let mut seq: u64 = 1;
    while let Some(event) = events.recv().await {
        let envelope = Envelope::new(next_seq(&mut seq), elapsed_ms(&start), Payload::Event(event));
        let bytes = match codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode event");
                continue;
            }
        };
        if sink.send(Message::Binary(bytes.into())).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Next binary or text frame, skipping control frames.
async fn next_data(
    source: &mut WsSource,
) -> Result<Option<Vec<u8>>, tokio_tungstenite::tungstenite::Error> {
    loop {
        match source.next().await {
            Some(Ok(Message::Binary(data))) => return Ok(Some(data.to_vec())),
            Some(Ok(Message::Text(text))) => return Ok(Some(text.as_bytes().to_vec())),
            Some(Ok(Message::Close(_))) | None => return Ok(None),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e),
        }
    }
}

/// Sends an Error event with sequence number 0.
async fn send_error(
    sink: &mut WsSink,
    codec: &impl Codec,
    code: u16,
    message: &str,
    start: &Instant,
) -> Result<(), CoinrushError> {
    let envelope = Envelope::new(
        0,
        elapsed_ms(start),
        Payload::Event(ServerEvent::Error {
            code,
            message: message.to_string(),
        }),
    );
    let bytes = codec.encode(&envelope)?;
    sink.send(Message::Binary(bytes.into())).await?;
    Ok(())
}

fn elapsed_ms(start: &Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
