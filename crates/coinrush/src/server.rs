//! `CoinrushServer` builder and accept loop.
//!
//! This is the entry point for running a coin-rush authority. It ties
//! together the layers: WebSocket → protocol → authority → session.

use std::sync::Arc;

use coinrush_protocol::{Codec, JsonCodec, PlayerId};
use coinrush_session::SessionConfig;
use tokio::net::TcpListener;

use crate::authority::{AuthorityHandle, spawn_authority};
use crate::handler::handle_connection;
use crate::{CoinrushError, ServerConfig};

/// Shared state passed to each connection task.
pub(crate) struct ServerContext<C: Codec> {
    pub(crate) handle: AuthorityHandle,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use coinrush::prelude::*;
///
/// # async fn run() -> Result<(), CoinrushError> {
/// let server = CoinrushServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CoinrushServerBuilder {
    config: ServerConfig,
}

impl CoinrushServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    pub fn tick_rate(mut self, hz: u32) -> Self {
        self.config.tick_rate_hz = hz;
        self
    }

    /// Binds the listener and starts the authority.
    ///
    /// # Errors
    /// [`CoinrushError::Config`] for an unusable server config,
    /// [`CoinrushError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<CoinrushServer<JsonCodec>, CoinrushError> {
        self.config.validate()?;

        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "listening");

        let handle = spawn_authority(&self.config);
        Ok(CoinrushServer {
            listener,
            ctx: Arc::new(ServerContext {
                handle,
                codec: JsonCodec,
            }),
            next_player_id: 1,
        })
    }
}

impl Default for CoinrushServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server. Call [`run()`](Self::run) to start accepting
/// connections.
pub struct CoinrushServer<C: Codec> {
    listener: TcpListener,
    ctx: Arc<ServerContext<C>>,
    next_player_id: u64,
}

impl CoinrushServer<JsonCodec> {
    pub fn builder() -> CoinrushServerBuilder {
        CoinrushServerBuilder::new()
    }
}

impl<C> CoinrushServer<C>
where
    C: Codec + Clone,
{
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle to the authority, for operator commands such as ending the
    /// session early.
    pub fn handle(&self) -> AuthorityHandle {
        self.ctx.handle.clone()
    }

    /// Runs the accept loop.
    ///
    /// Every accepted socket is given the next [`PlayerId`] and its own
    /// handler task. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), CoinrushError> {
        tracing::info!("coinrush server running");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let player_id = PlayerId(self.next_player_id);
                    self.next_player_id += 1;
                    tracing::debug!(%player_id, %addr, "accepted connection");

                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, player_id, ctx).await {
                            tracing::debug!(%player_id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
