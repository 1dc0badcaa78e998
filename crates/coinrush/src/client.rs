//! A WebSocket observer: connects, handshakes and keeps an
//! [`ObserverReplica`] in sync.

use std::time::Instant;

use coinrush_protocol::{
    ClientRequest, Codec, EntityId, Envelope, JsonCodec, PROTOCOL_VERSION, Payload, PlayerId,
    ServerEvent,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::CoinrushError;
use crate::replica::{ObserverReplica, PresentationSink};

type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected observer.
///
/// ```rust,no_run
/// use coinrush::prelude::*;
///
/// # async fn run() -> Result<(), CoinrushError> {
/// let mut client = CoinrushClient::connect("ws://127.0.0.1:8080", "alice", TracingSink).await?;
/// while let Some(event) = client.next_event().await? {
///     if let ServerEvent::CollectibleSpawned { entity_id, .. } = event {
///         client.request_pickup(entity_id).await?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct CoinrushClient<P: PresentationSink> {
    ws: ClientWs,
    codec: JsonCodec,
    seq: u64,
    start: Instant,
    replica: ObserverReplica<P>,
}

impl<P: PresentationSink> CoinrushClient<P> {
    /// Connects to `url` and sends the handshake. `name` is written as
    /// this player's display name once the server welcomes us.
    pub async fn connect(url: &str, name: &str, sink: P) -> Result<Self, CoinrushError> {
        let (ws, _) = tokio_tungstenite::connect_async(url).await?;
        let mut client = Self {
            ws,
            codec: JsonCodec,
            seq: 1,
            start: Instant::now(),
            replica: ObserverReplica::new(name, sink),
        };
        client
            .send_payload(Payload::Handshake {
                version: PROTOCOL_VERSION,
            })
            .await?;
        tracing::debug!(url, "handshake sent");
        Ok(client)
    }

    /// Sends a request to the authority.
    pub async fn send(&mut self, request: ClientRequest) -> Result<(), CoinrushError> {
        self.send_payload(Payload::Request(request)).await
    }

    /// Asks the authority to start the session. Ignored unless we are the
    /// host.
    pub async fn start_session(&mut self) -> Result<(), CoinrushError> {
        self.send(ClientRequest::StartSession).await
    }

    /// Reports that our player touched `entity_id`. Does nothing before
    /// the server has welcomed us.
    pub async fn request_pickup(&mut self, entity_id: EntityId) -> Result<(), CoinrushError> {
        let Some(player_id) = self.replica.player_id() else {
            return Ok(());
        };
        self.send(ClientRequest::RequestPickup {
            entity_id,
            player_id,
        })
        .await
    }

    /// Waits for the next event, applies it to the replica and sends any
    /// follow-up requests. Returns `None` once the server closes the
    /// connection.
    pub async fn next_event(&mut self) -> Result<Option<ServerEvent>, CoinrushError> {
        loop {
            let data = match self.ws.next().await {
                Some(Ok(Message::Binary(data))) => data.to_vec(),
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            };

            let envelope: Envelope = self.codec.decode(&data)?;
            let Payload::Event(event) = envelope.payload else {
                tracing::debug!("ignoring non-event payload from server");
                continue;
            };

            for request in self.replica.apply(&event) {
                self.send(request).await?;
            }
            return Ok(Some(event));
        }
    }

    pub fn replica(&self) -> &ObserverReplica<P> {
        &self.replica
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.replica.player_id()
    }

    /// Closes the connection.
    pub async fn close(mut self) -> Result<(), CoinrushError> {
        self.ws.close(None).await?;
        Ok(())
    }

    async fn send_payload(&mut self, payload: Payload) -> Result<(), CoinrushError> {
        let envelope = Envelope::new(
            next_seq(&mut self.seq),
            self.start.elapsed().as_millis() as u64,
            payload,
        );
        let bytes = self.codec.encode(&envelope)?;
        self.ws.send(Message::Binary(bytes.into())).await?;
        Ok(())
    }
}

/// Frames are numbered from 1, matching the server's writer. Sequence 0 is
/// reserved for out-of-band error frames.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
