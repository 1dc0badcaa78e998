//! # Coinrush
//!
//! An authoritative multiplayer coin-collection game.
//!
//! One server process holds the only writable copy of the game: the
//! session timer, the score ledger, the live collectibles and every
//! player's display name. Clients are observers. They submit requests,
//! receive the authority's events and render a local [`ObserverReplica`].
//!
//! ```text
//! client ──Request──▶ handler ──▶ AuthorityHandle ──mpsc──▶ authority actor
//!                                                              │
//! client ◀──Event─── writer task ◀──────────── per-player channel
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coinrush::prelude::*;
//!
//! # async fn run() -> Result<(), CoinrushError> {
//! coinrush::logging::init(coinrush::logging::DEFAULT_FILTER);
//!
//! let server = CoinrushServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .session(SessionConfig {
//!         duration_secs: 30.0,
//!         ..SessionConfig::default()
//!     })
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod authority;
pub mod client;
pub mod config;
mod error;
mod handler;
pub mod logging;
pub mod replica;
pub mod server;

pub use authority::{AuthorityHandle, EventSender, spawn_authority};
pub use client::CoinrushClient;
pub use config::ServerConfig;
pub use error::CoinrushError;
pub use replica::{ObserverReplica, PresentationSink, ScoreLine, TracingSink};
pub use server::{CoinrushServer, CoinrushServerBuilder};

/// Everything needed to run a server or write a client.
pub mod prelude {
    pub use crate::{
        AuthorityHandle, CoinrushClient, CoinrushError, CoinrushServer, CoinrushServerBuilder,
        ObserverReplica, PresentationSink, ScoreLine, ServerConfig, TracingSink,
    };

    pub use coinrush_protocol::{
        ClientRequest, Codec, Collectible, DisplayName, EntityId, Envelope, JsonCodec,
        PROTOCOL_VERSION, Payload, PlayerId, PlayerRecord, ProtocolError, Recipient, ServerEvent,
        SessionPhase, Vec2, WorldSnapshot,
    };
    pub use coinrush_replication::{NameLookup, ReplicationError, ScoreReplicator, Winner};
    pub use coinrush_session::{SessionConfig, SessionController, SessionError, SpawnArea};
}
