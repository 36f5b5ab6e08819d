//! Live games and the registry that resolves tokens to them.

pub mod broadcast;
pub mod registry;
pub mod token;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use quattro_core::{Game, GameError, Move, Player, ServerEvent, SessionId};
use tracing::{debug, info};

use crate::connection::ClientConnection;
use crate::errors::SessionError;

pub use broadcast::BroadcastGroup;
pub use registry::SessionRegistry;
pub use token::Token;

/// One game plus the connections watching it.
pub struct Session {
    pub id: SessionId,
    game: Mutex<Game>,
    group: BroadcastGroup,
    join_token: Token,
    watch_token: Token,
    second_seat: AtomicBool,
    created_at: Instant,
}

impl Session {
    pub(crate) fn new(join_token: Token, watch_token: Token) -> Self {
        Self {
            id: SessionId::new(),
            game: Mutex::new(Game::new()),
            group: BroadcastGroup::new(),
            join_token,
            watch_token,
            second_seat: AtomicBool::new(false),
            created_at: Instant::now(),
        }
    }

    pub fn join_token(&self) -> &Token {
        &self.join_token
    }

    pub fn watch_token(&self) -> &Token {
        &self.watch_token
    }

    pub fn group(&self) -> &BroadcastGroup {
        &self.group
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Apply a move and fan out the result.
    ///
    /// `play` (and `win` when the move completes a line) are enqueued while
    /// the game lock is held, so every subscriber sees moves in the order
    /// the engine applied them.
    pub fn play(&self, player: Player, column: usize) -> Result<Move, GameError> {
        let mut game = self.game.lock();
        let row = game.play(player, column)?;
        let mv = Move { player, column, row };
        self.group.broadcast(&ServerEvent::from(mv));
        if let Some(winner) = game.winner() {
            info!(session_id = %self.id, player = %winner, moves = game.moves().len(), "game won");
            self.group.broadcast(&ServerEvent::Win { player: winner });
        } else if game.is_full() {
            info!(session_id = %self.id, "game drawn");
        }
        Ok(mv)
    }

    /// Subscribe a late arrival and send it the history so far.
    ///
    /// Holding the game lock across both steps means no live move can slip
    /// between the replay and the subscription.
    pub fn subscribe_with_replay(&self, connection: Arc<ClientConnection>) {
        let game = self.game.lock();
        self.group.replay(&connection, game.moves());
        if let Some(winner) = game.winner() {
            let _ = connection.send_event(&ServerEvent::Win { player: winner });
        }
        self.group.subscribe(connection);
    }

    pub fn subscribe(&self, connection: Arc<ClientConnection>) {
        self.group.subscribe(connection);
    }

    pub fn unsubscribe(&self, connection: &ClientConnection) {
        self.group.unsubscribe(&connection.id);
    }

    /// Claim the second player's seat. Only one connection may hold it.
    pub fn claim_second_seat(&self) -> Result<(), SessionError> {
        if self
            .second_seat
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!(session_id = %self.id, "second seat claimed");
            Ok(())
        } else {
            Err(SessionError::SeatTaken)
        }
    }

    pub fn release_second_seat(&self) {
        self.second_seat.store(false, Ordering::Release);
    }

    /// A copy of the current game state.
    pub fn snapshot(&self) -> Game {
        self.game.lock().clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("subscribers", &self.group.len())
            .finish_non_exhaustive()
    }
}
