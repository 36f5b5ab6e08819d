//! Per-connection state machine: pick a role from the first message, then
//! play moves or spectate until the client goes away.
//!
//! The handler is transport-agnostic. It reads text messages from any
//! [`Inbound`] stream and writes through the connection's outbound queue,
//! so the WebSocket adapter and the unit tests drive it the same way. The
//! transport reports frames it cannot decode as text in-band, as errors.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use quattro_core::{
    ClientMessage, GameError, Intent, Player, ProtocolError, ServerEvent, PLAYER1, PLAYER2,
};
use tracing::{debug, info, instrument, warn};

use crate::connection::ClientConnection;
use crate::session::{Session, SessionRegistry};

const SPECTATOR_MOVE: &str = "Spectators cannot play.";

/// One inbound text message, or a frame the transport could not decode.
pub type Inbound = Result<String, ProtocolError>;

/// How a connection's handler finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOutcome {
    /// The peer went away or the connection was closed from our side.
    Closed,
    /// The peer broke the message contract. It was sent one `error` event.
    ProtocolViolation(ProtocolError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Host,
    Joiner,
    Watcher,
}

/// Ties a connection to a session for as long as it is held.
///
/// Dropping it undoes the admission on every exit path, including task
/// cancellation.
struct Membership {
    session: Arc<Session>,
    connection: Arc<ClientConnection>,
    registry: Arc<SessionRegistry>,
    role: Role,
}

impl Drop for Membership {
    fn drop(&mut self) {
        match self.role {
            Role::Host => self.registry.release_join(self.session.join_token()),
            Role::Joiner => self.session.release_second_seat(),
            Role::Watcher => {}
        }
        self.session.unsubscribe(&self.connection);

        // Nobody left and nobody can join: make the game unreachable.
        if self.session.group().is_empty() && !self.registry.contains_join(self.session.join_token()) {
            self.registry.release_watch(self.session.watch_token());
            info!(
                session_id = %self.session.id,
                age_secs = self.session.age().as_secs(),
                moves = self.session.snapshot().moves().len(),
                "session closed"
            );
        }
        debug!(conn_id = %self.connection.id, session_id = %self.session.id, role = ?self.role, "left session");
    }
}

/// Drive one connection from its first message to its last.
#[instrument(skip_all, fields(conn_id = %connection.id))]
pub async fn handle_connection<S>(
    mut incoming: S,
    connection: Arc<ClientConnection>,
    registry: Arc<SessionRegistry>,
) -> ConnectionOutcome
where
    S: Stream<Item = Inbound> + Unpin,
{
    match run(&mut incoming, &connection, &registry).await {
        Ok(()) => ConnectionOutcome::Closed,
        Err(err) => {
            warn!(error = %err, kind = err.error_kind(), "protocol violation, closing");
            let _ = connection.send_event(&ServerEvent::error(err.to_string()));
            ConnectionOutcome::ProtocolViolation(err)
        }
    }
}

async fn run<S>(
    incoming: &mut S,
    connection: &Arc<ClientConnection>,
    registry: &Arc<SessionRegistry>,
) -> Result<(), ProtocolError>
where
    S: Stream<Item = Inbound> + Unpin,
{
    let membership = loop {
        let Some(text) = next_message(incoming, connection).await else {
            return Ok(());
        };
        let intent = ClientMessage::parse(&text?)?.into_intent()?;
        match admit(intent, connection, registry) {
            Ok(membership) => break membership,
            Err(message) => {
                debug!(%message, "init rejected");
                let _ = connection.send_event(&ServerEvent::error(message));
            }
        }
    };

    match membership.role {
        Role::Host => play_moves(incoming, connection, &membership.session, PLAYER1).await,
        Role::Joiner => play_moves(incoming, connection, &membership.session, PLAYER2).await,
        Role::Watcher => spectate(incoming, connection).await,
    }
}

/// Resolve an intent to a session and attach the connection to it.
/// A rejected intent yields the message to send back.
fn admit(
    intent: Intent,
    connection: &Arc<ClientConnection>,
    registry: &Arc<SessionRegistry>,
) -> Result<Membership, String> {
    let (session, role) = match intent {
        Intent::Start => {
            let (session, join, watch) = registry.create_session();
            let _ = connection.send_event(&ServerEvent::Init {
                join: join.as_str().to_owned(),
                watch: watch.as_str().to_owned(),
            });
            session.subscribe(connection.clone());
            (session, Role::Host)
        }
        Intent::Join(token) => {
            let session = registry.find_by_join(&token).map_err(|e| e.to_string())?;
            session.claim_second_seat().map_err(|e| e.to_string())?;
            session.subscribe_with_replay(connection.clone());
            (session, Role::Joiner)
        }
        Intent::Watch(token) => {
            let session = registry.find_by_watch(&token).map_err(|e| e.to_string())?;
            session.subscribe_with_replay(connection.clone());
            (session, Role::Watcher)
        }
    };
    info!(session_id = %session.id, role = ?role, "joined session");
    Ok(Membership {
        session,
        connection: connection.clone(),
        registry: registry.clone(),
        role,
    })
}

async fn play_moves<S>(
    incoming: &mut S,
    connection: &ClientConnection,
    session: &Session,
    player: Player,
) -> Result<(), ProtocolError>
where
    S: Stream<Item = Inbound> + Unpin,
{
    while let Some(text) = next_message(incoming, connection).await {
        let column = match ClientMessage::parse(&text?)? {
            ClientMessage::Play { column } => column,
            other => {
                return Err(ProtocolError::Unexpected {
                    expected: "play",
                    got: other.event_type(),
                })
            }
        };

        let result = usize::try_from(column)
            .map_err(|_| GameError::InvalidColumn(column))
            .and_then(|column| session.play(player, column));
        match result {
            Ok(mv) => debug!(session_id = %session.id, %player, column = mv.column, row = mv.row, "move applied"),
            Err(err) => {
                debug!(session_id = %session.id, %player, column, kind = err.error_kind(), "move rejected");
                let _ = connection.send_event(&ServerEvent::error(err.to_string()));
            }
        }
    }
    Ok(())
}

/// Spectators only receive. Moves are refused, anything else ends the connection.
async fn spectate<S>(incoming: &mut S, connection: &ClientConnection) -> Result<(), ProtocolError>
where
    S: Stream<Item = Inbound> + Unpin,
{
    while let Some(text) = next_message(incoming, connection).await {
        match ClientMessage::parse(&text?)? {
            ClientMessage::Play { .. } => {
                let _ = connection.send_event(&ServerEvent::error(SPECTATOR_MOVE));
            }
            other => {
                return Err(ProtocolError::Unexpected {
                    expected: "play",
                    got: other.event_type(),
                })
            }
        }
    }
    Ok(())
}

/// Next inbound message, or `None` once the stream ends or the connection
/// has been closed from our side.
async fn next_message<S>(incoming: &mut S, connection: &ClientConnection) -> Option<Inbound>
where
    S: Stream<Item = Inbound> + Unpin,
{
    tokio::select! {
        biased;
        () = connection.closed() => None,
        msg = incoming.next() => msg,
    }
}
