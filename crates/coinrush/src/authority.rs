//! The authority actor: the single ordering point for all mutations.
//!
//! One Tokio task owns the [`SessionController`]. Connection tasks, the
//! operator and the tick loop all reach it through one bounded `mpsc`
//! channel or the same task's `tokio::select!`, so every mutation runs to
//! completion before the next one starts. Two players racing for the same
//! collectible are simply two commands in a queue.

use std::collections::BTreeMap;

use coinrush_protocol::{ClientRequest, PlayerId, Recipient, ServerEvent, WorldSnapshot};
use coinrush_session::{Outbound, SessionController, SessionError};
use coinrush_tick::{TickConfig, TickScheduler};
use tokio::sync::{mpsc, oneshot};

use crate::{CoinrushError, ServerConfig};

/// Channel the authority uses to deliver events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to the authority actor.
pub(crate) enum AuthorityCommand {
    Connect {
        player_id: PlayerId,
        sender: EventSender,
        reply: oneshot::Sender<()>,
    },

    Disconnect {
        player_id: PlayerId,
    },

    /// An untrusted request from a connection.
    Request {
        from: PlayerId,
        request: ClientRequest,
    },

    /// Operator start, bypassing the host check.
    StartSession {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// Operator end.
    EndSession {
        reply: oneshot::Sender<()>,
    },

    Snapshot {
        reply: oneshot::Sender<WorldSnapshot>,
    },

    Shutdown,
}

/// Handle to the running authority. Cheap to clone.
#[derive(Clone)]
pub struct AuthorityHandle {
    sender: mpsc::Sender<AuthorityCommand>,
}

impl AuthorityHandle {
    /// Registers a connection. Returns once the connection has been sent
    /// its `Welcome` and `Snapshot`.
    pub async fn connect(
        &self,
        player_id: PlayerId,
        sender: EventSender,
    ) -> Result<(), CoinrushError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(AuthorityCommand::Connect {
            player_id,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| CoinrushError::Unavailable)
    }

    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), CoinrushError> {
        self.send(AuthorityCommand::Disconnect { player_id }).await
    }

    /// Queues a request from `from` (fire-and-forget). Whether it has any
    /// effect is decided by the authority.
    pub async fn submit(&self, from: PlayerId, request: ClientRequest) -> Result<(), CoinrushError> {
        self.send(AuthorityCommand::Request { from, request }).await
    }

    /// Starts the session on behalf of the operator.
    ///
    /// # Errors
    /// [`CoinrushError::Session`] if the session config is invalid.
    pub async fn start_session(&self) -> Result<(), CoinrushError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(AuthorityCommand::StartSession { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| CoinrushError::Unavailable)??;
        Ok(())
    }

    /// Ends the session early. A no-op unless the session is active.
    pub async fn end_session(&self) -> Result<(), CoinrushError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(AuthorityCommand::EndSession { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| CoinrushError::Unavailable)
    }

    pub async fn snapshot(&self) -> Result<WorldSnapshot, CoinrushError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(AuthorityCommand::Snapshot { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| CoinrushError::Unavailable)
    }

    pub async fn shutdown(&self) -> Result<(), CoinrushError> {
        self.send(AuthorityCommand::Shutdown).await
    }

    async fn send(&self, cmd: AuthorityCommand) -> Result<(), CoinrushError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| CoinrushError::Unavailable)
    }
}

/// Spawns the authority task and returns a handle to it.
pub fn spawn_authority(config: &ServerConfig) -> AuthorityHandle {
    let (sender, receiver) = mpsc::channel(config.channel_size.max(1));
    let actor = AuthorityActor {
        controller: SessionController::from_config(config.session.clone()),
        scheduler: TickScheduler::new(TickConfig {
            start_paused: true,
            ..TickConfig::with_rate(config.tick_rate_hz)
        }),
        senders: BTreeMap::new(),
        receiver,
    };
    tokio::spawn(actor.run());
    AuthorityHandle { sender }
}

struct AuthorityActor {
    controller: SessionController,
    scheduler: TickScheduler,
    /// Per-connection outbound channels, in connection order.
    senders: BTreeMap<PlayerId, EventSender>,
    receiver: mpsc::Receiver<AuthorityCommand>,
}

impl AuthorityActor {
    async fn run(mut self) {
        tracing::info!("authority started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(AuthorityCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                info = self.scheduler.wait_for_tick() => {
                    let out = self.controller.tick(info.dt);
                    self.dispatch(out);
                    self.sync_scheduler();
                    self.scheduler.record_tick_end();
                }
            }
        }

        tracing::info!(
            ticks = self.scheduler.metrics().total_ticks,
            overruns = self.scheduler.metrics().total_overruns,
            "authority stopped"
        );
    }

    fn handle_command(&mut self, cmd: AuthorityCommand) {
        match cmd {
            AuthorityCommand::Connect {
                player_id,
                sender,
                reply,
            } => {
                self.handle_connect(player_id, sender);
                let _ = reply.send(());
            }
            AuthorityCommand::Disconnect { player_id } => self.handle_disconnect(player_id),
            AuthorityCommand::Request { from, request } => self.handle_request(from, request),
            AuthorityCommand::StartSession { reply } => {
                let _ = reply.send(self.start_session());
            }
            AuthorityCommand::EndSession { reply } => {
                let out = self.controller.end_session();
                self.dispatch(out);
                self.sync_scheduler();
                let _ = reply.send(());
            }
            AuthorityCommand::Snapshot { reply } => {
                let _ = reply.send(self.controller.snapshot());
            }
            AuthorityCommand::Shutdown => {}
        }
    }

    fn handle_connect(&mut self, player_id: PlayerId, sender: EventSender) {
        self.senders.insert(player_id, sender);
        let out = self.controller.player_connected(player_id);
        let host = self.controller.identities().host() == Some(player_id);
        tracing::info!(%player_id, host, players = self.senders.len(), "player connected");

        self.send_to(player_id, ServerEvent::Welcome { player_id, host });
        self.send_to(player_id, ServerEvent::Snapshot(self.controller.snapshot()));
        self.dispatch(out);
    }

    fn handle_disconnect(&mut self, player_id: PlayerId) {
        if self.senders.remove(&player_id).is_none() {
            return;
        }
        let out = self.controller.player_disconnected(player_id);
        tracing::info!(%player_id, players = self.senders.len(), "player disconnected");
        self.dispatch(out);
    }

    /// Re-validates a request against authoritative state. Violations are
    /// logged and dropped without a reply.
    fn handle_request(&mut self, from: PlayerId, request: ClientRequest) {
        if !self.senders.contains_key(&from) {
            tracing::warn!(%from, "request from unknown connection, ignoring");
            return;
        }

        match request {
            ClientRequest::StartSession => {
                if self.controller.identities().host() != Some(from) {
                    tracing::debug!(%from, "start rejected: not the host");
                    return;
                }
                if let Err(e) = self.start_session() {
                    tracing::warn!(%from, error = %e, "session failed to start");
                }
            }
            ClientRequest::RequestPickup {
                entity_id,
                player_id,
            } => {
                if player_id != from {
                    tracing::debug!(%from, %player_id, "pickup rejected: foreign player id");
                    return;
                }
                let out = self.controller.request_pickup(entity_id, player_id);
                self.dispatch(out);
            }
            ClientRequest::RequestScoreIncrease { player_id, delta } => {
                if player_id != from {
                    tracing::debug!(%from, %player_id, "score increase rejected: foreign player id");
                    return;
                }
                if delta == 0 || !self.controller.phase().is_active() {
                    tracing::debug!(
                        %from,
                        delta,
                        phase = %self.controller.phase(),
                        "score increase rejected"
                    );
                    return;
                }
                let out = self.controller.increase_score(player_id, delta);
                self.dispatch(out);
            }
            ClientRequest::DisplayNameWrite { player_id, name } => {
                match self.controller.write_display_name(from, player_id, name) {
                    Ok(out) => self.dispatch(out),
                    Err(e) => tracing::debug!(%from, error = %e, "name write rejected"),
                }
            }
        }
    }

    fn start_session(&mut self) -> Result<(), SessionError> {
        let out = self.controller.start_session()?;
        self.dispatch(out);
        self.sync_scheduler();
        Ok(())
    }

    /// Ticks run only while the session is active.
    fn sync_scheduler(&mut self) {
        if self.controller.phase().is_active() {
            self.scheduler.resume();
        } else {
            self.scheduler.pause();
        }
    }

    fn dispatch(&self, out: Outbound) {
        for (recipient, event) in out {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(event.clone());
                    }
                }
                Recipient::Player(player_id) => self.send_to(player_id, event),
            }
        }
    }

    /// Silently drops the event if the connection is gone.
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }
}
