//! The engine seam of the match loop.
//!
//! The loop never talks to a process directly. It asks an [`Engine`] for a
//! move and goes through [`select_move`], which turns every engine failure
//! into "no move" so that a misbehaving engine costs its side a fallback or a
//! resignation but never aborts the match.

use crate::board::Board;
use crate::uci_client::UciError;
use shakmaty::uci::UciMove;

/// Something that can propose a move for a position under a depth limit.
///
/// [`UciClient`](crate::uci_client::UciClient) is the production
/// implementation; tests substitute scripted engines.
pub trait Engine: Send {
    /// Display name used in log lines and as the default player name.
    fn name(&self) -> &str;

    /// Searches `board` to `depth` plies and returns the engine's choice.
    ///
    /// `Ok(None)` means the engine answered but had no move to offer.
    fn best_move(&mut self, board: &Board, depth: u32) -> Result<Option<UciMove>, UciError>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn best_move(&mut self, board: &Board, depth: u32) -> Result<Option<UciMove>, UciError> {
        (**self).best_move(board, depth)
    }
}

/// Asks `engine` for a move, absorbing any failure.
///
/// Engine errors are logged as warnings and reported as `None`, the same as
/// an engine that has nothing to play.
pub fn select_move<E: Engine + ?Sized>(
    engine: &mut E,
    board: &Board,
    depth: u32,
) -> Option<UciMove> {
    match engine.best_move(board, depth) {
        Ok(Some(candidate)) => {
            tracing::debug!(
                "{} proposes {} at depth {}",
                engine.name(),
                candidate,
                depth
            );
            Some(candidate)
        }
        Ok(None) => {
            tracing::debug!("{} has no move at depth {}", engine.name(), depth);
            None
        }
        Err(e) => {
            tracing::warn!(
                "{} failed to pick a move at depth {}: {}",
                engine.name(),
                depth,
                e
            );
            None
        }
    }
}
