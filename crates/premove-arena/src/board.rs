//! Live board state for a premove match.
//!
//! [`Board`] wraps a [`shakmaty::Chess`] position with the extra state the
//! match loop needs on top of the rules themselves: the moves applied so far
//! (in UCI and SAN form), the Zobrist hash of every position reached for
//! repetition detection, and the starting FEN engines must be told about.
//!
//! Legality, SAN generation and mate/stalemate detection all come from
//! `shakmaty`; this module only sequences them.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};
use std::fmt;
use thiserror::Error;

/// Half-move clock value at which a draw may be claimed.
const FIFTY_MOVE_PLIES: u32 = 100;
/// Half-move clock value at which the game is drawn automatically.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Errors that can occur when setting up a board.
#[derive(Error, Debug)]
pub enum BoardError {
    /// The starting position could not be parsed or is not a legal setup.
    #[error("Invalid FEN {fen:?}: {reason}")]
    InvalidFen {
        /// The FEN as supplied.
        fen: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// The result code of a game, as written to the PGN `Result` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    /// White won the game (checkmate or black resignation).
    WhiteWins,
    /// Black won the game (checkmate or white resignation).
    BlackWins,
    /// The game ended in a draw.
    Draw,
    /// The game stopped without a decision (move limit reached).
    Undecided,
}

impl GameResult {
    /// Returns the result crediting `winner` with the game.
    pub fn win_for(winner: Color) -> Self {
        match winner {
            Color::White => GameResult::WhiteWins,
            Color::Black => GameResult::BlackWins,
        }
    }

    /// Returns the PGN result code (`1-0`, `0-1`, `1/2-1/2` or `*`).
    pub fn as_pgn(self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Undecided => "*",
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_pgn())
    }
}

/// Returns "White" or "Black".
pub fn side_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// Why the rules ended the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    /// 150 plies without a capture or pawn move.
    SeventyFiveMoves,
    FivefoldRepetition,
    /// Claimed draw: 100 plies without a capture or pawn move, or 99 with a
    /// quiet move available.
    FiftyMoves,
    /// Claimed draw: a position occurs for the third time, now or after the
    /// next move.
    ThreefoldRepetition,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Termination::Checkmate => "checkmate",
            Termination::Stalemate => "stalemate",
            Termination::InsufficientMaterial => "insufficient material",
            Termination::SeventyFiveMoves => "seventy-five-move rule",
            Termination::FivefoldRepetition => "fivefold repetition",
            Termination::FiftyMoves => "fifty-move rule",
            Termination::ThreefoldRepetition => "threefold repetition",
        };
        f.write_str(text)
    }
}

/// A finished game as judged by the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub result: GameResult,
    pub termination: Termination,
}

/// A move that has been applied to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedMove {
    /// The move in UCI notation (e.g. "e2e4", "e1g1", "e7e8q").
    pub uci: String,
    /// The move in SAN including check/mate suffix (e.g. "Nf3+").
    pub san: String,
    /// The side that played the move.
    pub color: Color,
}

/// The single live position of a match.
///
/// A `Board` only ever moves forward: [`Board::try_apply`] is the one way to
/// change it and there is no undo.
#[derive(Debug, Clone)]
pub struct Board {
    position: Chess,
    start_fen: Option<String>,
    start_turn: Color,
    start_fullmove: u32,
    moves: Vec<PlayedMove>,
    /// Hash of every position reached, starting position included.
    history: Vec<Zobrist64>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Creates a board at the standard starting position.
    pub fn new() -> Self {
        Self::from_parts(Chess::default(), None)
    }

    /// Creates a board from a FEN string.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidFen`] if the FEN does not parse or does
    /// not describe a legal standard chess position.
    pub fn from_fen(fen: &str) -> Result<Self, BoardError> {
        let fen = fen.trim();
        let invalid = |reason: String| BoardError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };

        let parsed: Fen = fen.parse().map_err(|e| invalid(format!("{}", e)))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{}", e)))?;

        Ok(Self::from_parts(position, Some(fen.to_string())))
    }

    fn from_parts(position: Chess, start_fen: Option<String>) -> Self {
        let start_turn = position.turn();
        let start_fullmove = position.fullmoves().get();
        let hash = hash(&position);
        Self {
            position,
            start_fen,
            start_turn,
            start_fullmove,
            moves: Vec::new(),
            history: vec![hash],
        }
    }

    /// Returns the side to move.
    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    /// Returns the starting FEN, or `None` for the standard starting position.
    pub fn start_fen(&self) -> Option<&str> {
        self.start_fen.as_deref()
    }

    /// Returns the side to move in the starting position.
    pub fn start_turn(&self) -> Color {
        self.start_turn
    }

    /// Returns the full move number of the starting position.
    pub fn start_fullmove(&self) -> u32 {
        self.start_fullmove
    }

    /// Returns every move applied so far, oldest first.
    pub fn moves(&self) -> &[PlayedMove] {
        &self.moves
    }

    /// Returns the most recently applied move.
    pub fn last_move(&self) -> Option<&PlayedMove> {
        self.moves.last()
    }

    /// Returns the number of plies applied since the starting position.
    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    /// Returns all legal moves in UCI notation.
    pub fn legal_moves(&self) -> Vec<UciMove> {
        self.position
            .legal_moves()
            .iter()
            .map(|m| m.to_uci(CastlingMode::Standard))
            .collect()
    }

    /// Applies `candidate` if it is legal in the current position.
    ///
    /// Returns the applied move when the candidate is legal. Returns `None`
    /// and leaves the board untouched when the move is illegal or when there
    /// is no candidate at all.
    pub fn try_apply(&mut self, candidate: Option<&UciMove>) -> Option<&PlayedMove> {
        let m = candidate?.to_move(&self.position).ok()?;

        let color = self.position.turn();
        let uci = m.to_uci(CastlingMode::Standard).to_string();
        let san = SanPlus::from_move_and_play_unchecked(&mut self.position, &m).to_string();

        self.history.push(hash(&self.position));
        self.moves.push(PlayedMove { uci, san, color });
        self.moves.last()
    }

    /// Counts how many times the current position has occurred.
    pub fn repetitions(&self) -> usize {
        match self.history.last() {
            Some(current) => self.occurrences(*current),
            None => 0,
        }
    }

    fn occurrences(&self, position: Zobrist64) -> usize {
        self.history.iter().filter(|h| **h == position).count()
    }

    /// Returns true if a fifty-move draw can be claimed.
    ///
    /// The claim holds once 100 plies passed without a capture or pawn move,
    /// or at 99 when a legal move exists that does not reset the clock.
    fn can_claim_fifty_moves(&self) -> bool {
        let halfmoves = self.position.halfmoves();
        halfmoves >= FIFTY_MOVE_PLIES
            || (halfmoves + 1 == FIFTY_MOVE_PLIES
                && self
                    .position
                    .legal_moves()
                    .iter()
                    .any(|m| !m.is_zeroing()))
    }

    /// Returns true if a threefold repetition draw can be claimed.
    ///
    /// The claim holds when the current position occurred three times, or
    /// when some legal move reaches a position that already occurred twice.
    fn can_claim_threefold_repetition(&self) -> bool {
        if self.repetitions() >= 3 {
            return true;
        }
        self.position.legal_moves().iter().any(|m| {
            let mut next = self.position.clone();
            next.play_unchecked(m);
            self.occurrences(hash(&next)) >= 2
        })
    }

    /// Evaluates whether the game is over.
    ///
    /// Checkmate, stalemate, insufficient material, the seventy-five-move
    /// rule and fivefold repetition always end the game. With `claim_draw`
    /// a claimable fifty-move or threefold repetition draw ends it as well,
    /// including a claim the side to move could make with its next move.
    pub fn outcome(&self, claim_draw: bool) -> Option<Outcome> {
        let pos = &self.position;

        if pos.is_checkmate() {
            return Some(Outcome {
                result: GameResult::win_for(pos.turn().other()),
                termination: Termination::Checkmate,
            });
        }

        let termination = if pos.is_insufficient_material() {
            Termination::InsufficientMaterial
        } else if pos.is_stalemate() {
            Termination::Stalemate
        } else if pos.halfmoves() >= SEVENTY_FIVE_MOVE_PLIES {
            Termination::SeventyFiveMoves
        } else if self.repetitions() >= 5 {
            Termination::FivefoldRepetition
        } else if claim_draw && self.can_claim_fifty_moves() {
            Termination::FiftyMoves
        } else if claim_draw && self.can_claim_threefold_repetition() {
            Termination::ThreefoldRepetition
        } else {
            return None;
        };

        Some(Outcome {
            result: GameResult::Draw,
            termination,
        })
    }

    /// Returns true if the game is over, see [`Board::outcome`].
    pub fn is_game_over(&self, claim_draw: bool) -> bool {
        self.outcome(claim_draw).is_some()
    }

    /// Returns the result code for the current position.
    ///
    /// [`GameResult::Undecided`] when the game is still in progress.
    pub fn result(&self, claim_draw: bool) -> GameResult {
        self.outcome(claim_draw)
            .map(|o| o.result)
            .unwrap_or(GameResult::Undecided)
    }
}

fn hash(position: &Chess) -> Zobrist64 {
    position.zobrist_hash(EnPassantMode::Legal)
}
